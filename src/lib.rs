//! AlleleResolver - novel immunogene allele characterization
//!
//! Takes a novel sequence aligned against a curated reference-allele
//! catalog and determines the gene-model feature boundaries of the novel
//! sequence plus a position-accurate description of how it differs from its
//! closest known reference, in raw genomic coordinates and in the zero-UTR,
//! mature-protein-relative IMGT numbering, with codon-level mismatch
//! reporting.
//!
//! # Example
//!
//! ```ignore
//! use allele_resolver::{Catalog, Resolver};
//!
//! // Load the reference catalog
//! let catalog = Catalog::from_file("references.dat.gz")?;
//! let resolver = Resolver::new(catalog);
//!
//! // Resolve a novel sequence against its closest reference
//! let resolution = resolver.resolve_best(&query_sequence, false)?;
//! println!("{} differences vs {}", resolution.differences.total(),
//!          resolution.closest_allele);
//! ```

pub mod catalog;
pub mod core;

// Re-export commonly used types
pub use catalog::fasta::{read_fasta, FastaRecord};
pub use catalog::{Catalog, CompressionFormat};
pub use core::{
    best_hit, recover_ends, resolve_against, AlignmentHit, AlleleResolverError, CatalogError,
    CdsMap, CodonDiff, DiffKind, DifferenceSet, Feature, FeatureKind, GeneClass, ImgtDifference,
    ReferenceAllele, Resolution, ResolveError, Resolver, Span, UtrEnd,
};
