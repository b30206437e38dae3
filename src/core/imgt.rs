//! IMGT coordinate transformation
//!
//! IMGT numbering drops the 5'UTR: position 1 is the first coding base, and
//! the UTR runs backward through negative coordinates ending at -1. Codons
//! are numbered from the start of the mature protein. Class-I-like genes
//! cleave a signal peptide encoded by exon 1, so their exon-1 codons number
//! negatively with a gap at 0; class-II-like genes (gene symbol starting
//! with `D`) translate the mature protein from exon 1 and use no offset.
//!
//! A few gene families carry an exon 1 whose length is not divisible by 3;
//! their signal-peptide codon count comes from a fixed table instead of the
//! exon length.

use crate::core::codon::CodonDiff;
use crate::core::diff::{DiffKind, DifferenceSet};
use crate::core::feature::{ReferenceAllele, Span};
use crate::core::normalize::Normalized;
use rust_lapper::{Interval, Lapper};

/// Signal-peptide codon counts that cannot be derived from exon-1 length
const EXON1_CODON_OVERRIDES: &[(&str, i64)] = &[("MICA", 23), ("MICB", 23)];

/// Broad gene class controlling the mature-protein codon offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneClass {
    /// Signal peptide in exon 1; mature protein starts at exon 2
    ClassI,
    /// Mature protein starts at exon 1; no codon offset
    ClassII,
}

/// The gene symbol of an allele name: the token before `*`
///
/// # Examples
/// ```
/// use allele_resolver::core::gene_symbol;
/// assert_eq!(gene_symbol("HLA-A*01:01:01:01"), "HLA-A");
/// assert_eq!(gene_symbol("MICA*008"), "MICA");
/// ```
pub fn gene_symbol(allele_name: &str) -> &str {
    allele_name.split('*').next().unwrap_or(allele_name)
}

impl GeneClass {
    /// Classify an allele by its gene symbol
    ///
    /// # Examples
    /// ```
    /// use allele_resolver::core::GeneClass;
    /// assert_eq!(GeneClass::from_allele_name("HLA-A*01:01"), GeneClass::ClassI);
    /// assert_eq!(GeneClass::from_allele_name("HLA-DRB1*04:01"), GeneClass::ClassII);
    /// ```
    pub fn from_allele_name(allele_name: &str) -> Self {
        let symbol = gene_symbol(allele_name);
        let symbol = symbol.strip_prefix("HLA-").unwrap_or(symbol);
        if symbol.starts_with('D') {
            GeneClass::ClassII
        } else {
            GeneClass::ClassI
        }
    }
}

/// Number of signal-peptide codons contributed by exon 1
///
/// Table-driven for gene families whose exon 1 is not a codon multiple;
/// otherwise derived from the reference exon-1 length.
pub fn exon1_codons(allele: &ReferenceAllele) -> i64 {
    let symbol = gene_symbol(&allele.name);
    let stripped = symbol.strip_prefix("HLA-").unwrap_or(symbol);
    for (gene, codons) in EXON1_CODON_OVERRIDES {
        if *gene == symbol || *gene == stripped {
            return *codons;
        }
    }
    allele.exon_len(1).unwrap_or(0) / 3
}

/// Overall codon label holding a CDS position
///
/// Integer division onto 0-based codon labels, as the nomenclature tooling
/// has always computed it; the codon annotator's boundary probing absorbs
/// the off-by-one this produces at a codon's third base.
#[inline]
pub fn raw_codon(cds_pos: i64) -> i64 {
    cds_pos / 3
}

/// Map an overall codon label to its IMGT codon number
///
/// Class I subtracts the signal-peptide codons; results at or below zero
/// slide one further down so that codon 0 never exists and signal-peptide
/// codons number negatively.
pub fn imgt_codon_number(raw: i64, class: GeneClass, exon1_codons: i64) -> i64 {
    match class {
        GeneClass::ClassII => raw,
        GeneClass::ClassI => {
            let codon = raw - exon1_codons;
            if codon <= 0 {
                codon - 1
            } else {
                codon
            }
        }
    }
}

/// One exon's slot in the CDS map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdsEntry {
    pub exon: u8,
    /// Exon interval on the novel sequence
    pub genomic: Span,
    /// The contiguous CDS interval assigned to it
    pub cds: Span,
}

/// Genomic-to-CDS interval map over the novel allele's exons
///
/// Built by walking exon features only, in order, assigning contiguous
/// 1-based CDS ranges.
#[derive(Clone)]
pub struct CdsMap {
    entries: Vec<CdsEntry>,
    lapper: Lapper<u64, usize>,
}

impl std::fmt::Debug for CdsMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdsMap").field("entries", &self.entries).finish()
    }
}

impl CdsMap {
    /// Build the map from the allele's feature kinds and novel spans
    pub fn build(allele: &ReferenceAllele, spans: &[Span]) -> Self {
        let mut entries = Vec::new();
        let mut intervals = Vec::new();
        let mut cds_cursor = 1i64;
        for (feature, span) in allele.features.iter().zip(spans) {
            if let crate::core::feature::FeatureKind::Exon(n) = feature.kind {
                if span.is_empty() || span.start < 1 {
                    continue;
                }
                let cds = Span::new(cds_cursor, cds_cursor + span.len() - 1);
                intervals.push(Interval {
                    start: span.start as u64,
                    stop: span.end as u64 + 1,
                    val: entries.len(),
                });
                entries.push(CdsEntry {
                    exon: n,
                    genomic: *span,
                    cds,
                });
                cds_cursor += span.len();
            }
        }
        Self {
            entries,
            lapper: Lapper::new(intervals),
        }
    }

    pub fn entries(&self) -> &[CdsEntry] {
        &self.entries
    }

    /// Total CDS length covered by the map
    pub fn cds_len(&self) -> i64 {
        self.entries.iter().map(|e| e.cds.len()).sum()
    }

    /// The exon entry containing a genomic position and the CDS position it
    /// maps to, or `None` for non-coding positions
    pub fn locate(&self, pos: i64) -> Option<(&CdsEntry, i64)> {
        if pos < 1 {
            return None;
        }
        let hit = self.lapper.find(pos as u64, pos as u64 + 1).next()?;
        let entry = &self.entries[hit.val];
        Some((entry, entry.cds.start + (pos - entry.genomic.start)))
    }
}

/// One difference re-expressed in IMGT numbering
#[derive(Debug, Clone, PartialEq)]
pub struct ImgtDifference {
    pub kind: DiffKind,
    /// Position on the novel sequence (genomic frame)
    pub genomic_position: i64,
    /// CDS position when coding, UTR-relative position otherwise
    pub imgt_position: i64,
    pub cds_position: Option<i64>,
    /// IMGT codon number for coding differences
    pub codon: Option<i64>,
    /// Inserted, deleted or novel base
    pub base: char,
    /// Reference base, for mismatches
    pub reference_base: Option<char>,
    /// Before/after codon triplets, annotated for coding mismatches
    pub mm_codon: Option<CodonDiff>,
}

/// Features and differences of a novel allele in IMGT numbering
#[derive(Debug, Clone)]
pub struct ImgtView {
    /// Feature intervals, parallel to the reference feature list
    pub spans: Vec<Span>,
    pub cds_map: CdsMap,
    pub differences: Vec<ImgtDifference>,
    pub gene_class: GeneClass,
    pub exon1_codons: i64,
}

/// Re-express normalized features and differences in IMGT numbering
pub fn to_imgt(allele: &ReferenceAllele, normalized: &Normalized) -> ImgtView {
    let utr5_len = normalized.spans.first().map(|s| s.end).unwrap_or(0);
    let gene_class = GeneClass::from_allele_name(&allele.name);
    let exon1 = exon1_codons(allele);

    let spans: Vec<Span> = allele
        .features
        .iter()
        .zip(&normalized.spans)
        .map(|(feature, span)| {
            if feature.kind == crate::core::feature::FeatureKind::Utr5 {
                Span::new(-utr5_len, -1)
            } else {
                span.shifted(-utr5_len)
            }
        })
        .collect();

    let cds_map = CdsMap::build(allele, &normalized.spans);
    let differences = imgt_differences(
        &normalized.differences,
        &cds_map,
        utr5_len,
        gene_class,
        exon1,
    );

    ImgtView {
        spans,
        cds_map,
        differences,
        gene_class,
        exon1_codons: exon1,
    }
}

fn imgt_differences(
    differences: &DifferenceSet,
    cds_map: &CdsMap,
    utr5_len: i64,
    gene_class: GeneClass,
    exon1: i64,
) -> Vec<ImgtDifference> {
    let mut out = Vec::with_capacity(differences.total());

    let mut push = |kind: DiffKind, pos: i64, base: char, reference_base: Option<char>| {
        let (imgt_position, cds_position, codon) = match cds_map.locate(pos) {
            Some((_, cds_pos)) => (
                cds_pos,
                Some(cds_pos),
                Some(imgt_codon_number(raw_codon(cds_pos), gene_class, exon1)),
            ),
            // UTR5 positions run backward to -1 with no position 0, so the
            // shift is one larger there.
            None if pos <= utr5_len => (pos - utr5_len - 1, None, None),
            None => (pos - utr5_len, None, None),
        };
        out.push(ImgtDifference {
            kind,
            genomic_position: pos,
            imgt_position,
            cds_position,
            codon,
            base,
            reference_base,
            mm_codon: None,
        });
    };

    for (pos, base) in differences
        .insertion_positions
        .iter()
        .zip(&differences.insertion_bases)
    {
        push(DiffKind::Insertion, *pos, *base, None);
    }
    for (pos, base) in differences
        .deletion_positions
        .iter()
        .zip(&differences.deletion_bases)
    {
        push(DiffKind::Deletion, *pos, *base, None);
    }
    for (pos, (novel, reference)) in differences
        .mismatch_positions
        .iter()
        .zip(&differences.mismatch_bases)
    {
        push(DiffKind::Mismatch, *pos, *novel, Some(*reference));
    }

    out.sort_by_key(|d| d.genomic_position);
    out
}
