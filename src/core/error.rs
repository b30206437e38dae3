//! Error types for AlleleResolver
//!
//! Defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Which end of the gene model a UTR error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtrEnd {
    Five,
    Three,
}

impl std::fmt::Display for UtrEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UtrEnd::Five => write!(f, "5'"),
            UtrEnd::Three => write!(f, "3'"),
        }
    }
}

/// Main error type for AlleleResolver operations
#[derive(Debug, Error)]
pub enum AlleleResolverError {
    /// Catalog file parsing errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while resolving a novel allele against a reference
///
/// Every variant is fatal to the current invocation except
/// [`ResolveError::IncompleteSequence`], which callers may suppress by
/// resolving with `tolerate_incomplete = true`. Retrying with unchanged
/// input never changes the outcome.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The projected UTR at one end of the gene model has no bases left
    #[error("no {end} UTR remains after projection (length {length})")]
    MissingUtr { end: UtrEnd, length: i64 },

    /// The sequence does not cover the full reference
    ///
    /// Recoverable only by explicit caller opt-in; otherwise blocking.
    #[error("incomplete sequence: {missing_bp} bp missing at the 5' end, {missing_bp_end} bp at the 3' end")]
    IncompleteSequence { missing_bp: i64, missing_bp_end: i64 },

    /// End-extension alignment could not reconcile unaligned bases
    #[error("alignment recovery failed: {unaligned} bases unaligned at the sequence start")]
    AlignmentRecovery { unaligned: i64 },

    /// A codon index was requested that the reference CDS table does not hold
    ///
    /// Signals a data inconsistency, never silently defaulted.
    #[error("codon {index} not present in reference CDS table ({table_len} codons)")]
    CodonLookup { index: i64, table_len: usize },

    /// The requested reference allele is not in the catalog
    #[error("unknown reference allele: {0}")]
    UnknownAllele(String),
}

/// Errors that can occur during catalog file parsing
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Unknown keyword at the start of a line
    #[error("Line {line}: unknown keyword '{keyword}'")]
    UnknownKeyword { line: usize, keyword: String },

    /// Invalid feature line format
    #[error("Line {line}: invalid feature line: {message}")]
    InvalidFeatureLine { line: usize, message: String },

    /// Failed to parse an integer field
    #[error("Line {line}: invalid {field} value '{value}': expected a positive integer")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// The same allele name appears twice
    #[error("Line {line}: duplicate allele '{name}'")]
    DuplicateAllele { line: usize, name: String },

    /// A sequence line contains a non-IUPAC character
    #[error("Line {line}: invalid sequence character '{chr}'")]
    InvalidSequenceChar { line: usize, chr: char },

    /// An allele record violates the gene-model invariants
    #[error("Allele '{name}': {message}")]
    InvalidModel { name: String, message: String },

    /// A record ended before its sequence block
    #[error("Line {line}: record for '{name}' has no sequence")]
    MissingSequence { line: usize, name: String },

    /// Catalog file not found
    #[error("Catalog file not found: {0}")]
    FileNotFound(PathBuf),

    /// FASTA input is malformed
    #[error("Line {line}: invalid FASTA input: {message}")]
    InvalidFasta { line: usize, message: String },

    /// I/O error during parsing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AlleleResolver operations
pub type Result<T> = std::result::Result<T, AlleleResolverError>;

/// Result type alias for resolution operations
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Result type alias for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
