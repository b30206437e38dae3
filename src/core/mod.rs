//! Core resolution pipeline
//!
//! This module contains the alignment acquirer, difference extractor,
//! feature coordinate projector, coverage normalizer, IMGT transformer and
//! codon annotator, plus the resolver that chains them.

mod alignment;
mod codon;
mod diff;
mod error;
mod feature;
mod imgt;
mod normalize;
mod projector;
mod resolver;

pub use alignment::{
    best_hit, recover_ends, AlignmentHit, MATCH_CHAR, MAX_UNALIGNED_START,
};
pub use codon::{annotate_mismatch, codon_table, CodonDiff};
pub use diff::{extract_differences, DiffKind, DifferenceSet, UNKNOWN_BASE};
pub use error::{
    AlleleResolverError, CatalogError, CatalogResult, ResolveError, ResolveResult, Result, UtrEnd,
};
pub use feature::{
    containing_feature, slice_1based, Feature, FeatureKind, ReferenceAllele, Span,
};
pub use imgt::{
    exon1_codons, gene_symbol, imgt_codon_number, raw_codon, to_imgt, CdsEntry, CdsMap,
    GeneClass, ImgtDifference, ImgtView,
};
pub use normalize::{normalize, Normalized};
pub use projector::{project, Projection};
pub use resolver::{resolve_against, Resolution, Resolver};
