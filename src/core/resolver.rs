//! Resolution pipeline
//!
//! Orchestrates the stages end to end: recover alignment ends, extract
//! differences, project feature boundaries, normalize partial coverage,
//! re-express in IMGT numbering, annotate coding mismatches with codon
//! pairs. Each invocation builds every intermediate fresh and returns either
//! a complete [`Resolution`] or an error — never a partial result.

use crate::catalog::Catalog;
use crate::core::alignment::{best_hit, recover_ends, AlignmentHit};
use crate::core::codon::{annotate_mismatch, codon_table, CodonDiff};
use crate::core::diff::{extract_differences, DiffKind, DifferenceSet, UNKNOWN_BASE};
use crate::core::error::ResolveError;
use crate::core::feature::{slice_1based, FeatureKind, ReferenceAllele, Span};
use crate::core::imgt::{imgt_codon_number, raw_codon, to_imgt, CdsMap, ImgtDifference};
use crate::core::normalize::normalize;
use crate::core::projector::project;
use rayon::prelude::*;

/// The full description of a novel allele against its closest reference
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Name of the reference the query resolved against
    pub closest_allele: String,
    /// Feature kinds, in gene-model order
    pub features: Vec<FeatureKind>,
    /// Feature intervals on the novel sequence, parallel to `features`
    pub coordinates: Vec<Span>,
    /// The same intervals in IMGT numbering
    pub imgt_coordinates: Vec<Span>,
    /// Differences in the novel genomic frame
    pub differences: DifferenceSet,
    /// Differences in IMGT numbering, codon-annotated where coding
    pub imgt_differences: Vec<ImgtDifference>,
    pub cds_map: CdsMap,
    pub exact_match: bool,
    pub missing_bp: i64,
    pub missing_bp_end: i64,
}

/// Resolves novel sequences against a reference catalog
pub struct Resolver {
    catalog: Catalog,
}

impl Resolver {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve a query against a named reference allele
    ///
    /// `hit` is the single best alignment between `query` and that allele,
    /// from any alignment source. `tolerate_incomplete` downgrades partial
    /// coverage from a blocking condition to a logged warning.
    pub fn resolve(
        &self,
        hit: AlignmentHit,
        query: &str,
        allele_name: &str,
        tolerate_incomplete: bool,
    ) -> Result<Resolution, ResolveError> {
        let allele = self
            .catalog
            .get(allele_name)
            .ok_or_else(|| ResolveError::UnknownAllele(allele_name.to_string()))?;
        resolve_against(allele, hit, query, tolerate_incomplete)
    }

    /// Find the closest catalog allele for a query and resolve against it
    pub fn resolve_best(
        &self,
        query: &str,
        tolerate_incomplete: bool,
    ) -> Result<Resolution, ResolveError> {
        let (allele, hit) = best_hit(query, self.catalog.iter())
            .ok_or_else(|| ResolveError::UnknownAllele("empty catalog".to_string()))?;
        resolve_against(allele, hit, query, tolerate_incomplete)
    }

    /// Resolve many independent queries on the rayon pool
    ///
    /// Each query runs the same synchronous pipeline; nothing is shared or
    /// retried across invocations.
    pub fn resolve_batch(
        &self,
        queries: &[(String, String)],
        tolerate_incomplete: bool,
    ) -> Vec<(String, Result<Resolution, ResolveError>)> {
        queries
            .par_iter()
            .map(|(id, sequence)| {
                (
                    id.clone(),
                    self.resolve_best(sequence, tolerate_incomplete),
                )
            })
            .collect()
    }
}

/// Resolve a query against one reference allele
///
/// The allele-level entry point behind [`Resolver::resolve`]; exposed for
/// callers that manage their own reference records.
pub fn resolve_against(
    allele: &ReferenceAllele,
    hit: AlignmentHit,
    query: &str,
    tolerate_incomplete: bool,
) -> Result<Resolution, ResolveError> {
    let hit = recover_ends(hit, query, &allele.sequence)?;
    let diffs = extract_differences(&hit);
    log::debug!(
        "{}: {} differences against {}",
        if diffs.exact_match { "exact" } else { "novel" },
        diffs.total(),
        allele.name
    );

    let total_len = hit.ref_start + hit.query_length - hit.query_start;
    let projection = project(&allele.features, &diffs, total_len);
    let normalized = normalize(
        &allele.features,
        projection,
        &diffs,
        hit.ref_start,
        allele.sequence.len() as i64,
        tolerate_incomplete,
    )?;
    let mut view = to_imgt(allele, &normalized);

    let novel_cds = novel_cds(query, &view.cds_map, hit.start_overhang);
    let ref_cds = allele.cds();
    let novel_table = codon_table(&novel_cds);
    let ref_table = codon_table(&ref_cds);

    for difference in view.differences.iter_mut() {
        if difference.kind != DiffKind::Mismatch || difference.base == UNKNOWN_BASE {
            continue;
        }
        if let Some(cds_pos) = difference.cds_position {
            let (found, novel, reference) =
                annotate_mismatch(&novel_table, &ref_table, raw_codon(cds_pos))?;
            difference.mm_codon = Some(CodonDiff {
                codon: imgt_codon_number(found, view.gene_class, view.exon1_codons),
                novel,
                reference,
            });
        }
    }

    // The extractor's flag survives artifact discards in normalization.
    let exact_match =
        diffs.exact_match && normalized.missing_bp == 0 && normalized.missing_bp_end == 0;

    Ok(Resolution {
        closest_allele: allele.name.clone(),
        features: allele.features.iter().map(|f| f.kind).collect(),
        coordinates: normalized.spans,
        imgt_coordinates: view.spans,
        differences: normalized.differences,
        imgt_differences: view.differences,
        cds_map: view.cds_map,
        exact_match,
        missing_bp: normalized.missing_bp,
        missing_bp_end: normalized.missing_bp_end,
    })
}

/// The novel coding sequence: query substrings over the mapped exons
///
/// Leading query bases that precede reference base 1 are outside the novel
/// coordinate frame; the exon slices are offset past them.
fn novel_cds(query: &str, cds_map: &CdsMap, start_overhang: i64) -> String {
    let mut out = String::new();
    for entry in cds_map.entries() {
        out.push_str(slice_1based(query, entry.genomic.shifted(start_overhang)));
    }
    out
}
