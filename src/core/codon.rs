//! Codon-level mismatch annotation
//!
//! For a mismatch inside the CDS, reports the enclosing codon number along
//! with the novel and reference triplets. Codon tables for both sequences
//! are built by walking each CDS three bases at a time. When an
//! uncompensated net indel leaves the two CDS lengths out of step, indexing
//! continues along the longer sequence while the shorter one holds its final
//! codon — a best-effort resynchronization.
//!
//! Codon labels are 0-based: label `c` names the triplet over CDS positions
//! `3c+1` through `3c+3`, so the integer-division position formula lands on
//! the right label except at a codon's third base, where it points one label
//! right. The annotator probes the canonical label, then its left and right
//! neighbors, and reports the first pair that actually differs.

use crate::core::error::ResolveError;

/// A codon-level difference between the novel and reference CDS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodonDiff {
    /// IMGT codon number
    pub codon: i64,
    pub novel: String,
    pub reference: String,
}

/// Split a CDS into its codon table
///
/// The final entry may be shorter than three bases when the CDS length is
/// not a codon multiple.
pub fn codon_table(cds: &str) -> Vec<String> {
    cds.as_bytes()
        .chunks(3)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// Codon label `index` of `table`, resynchronized against the other table
///
/// Labels past this table's end but within the other's hold this table's
/// final codon fixed. Labels absent from both tables are an internal
/// inconsistency.
fn codon_at<'a>(
    table: &'a [String],
    other_len: usize,
    index: i64,
) -> Result<&'a str, ResolveError> {
    if index < 0 || index as usize >= table.len().max(other_len) {
        return Err(ResolveError::CodonLookup {
            index,
            table_len: table.len(),
        });
    }
    if (index as usize) < table.len() {
        Ok(&table[index as usize])
    } else {
        table.last().map(|s| s.as_str()).ok_or(ResolveError::CodonLookup {
            index,
            table_len: 0,
        })
    }
}

/// Find the differing codon pair around a canonical codon label
///
/// Probes `canonical`, `canonical - 1`, `canonical + 1` in that order and
/// returns the first label whose triplets differ, together with both
/// triplets. Falls back to the first resolvable probe when the neighborhood
/// shows no difference. Fails with [`ResolveError::CodonLookup`] when no
/// probed label exists in either table.
pub fn annotate_mismatch(
    novel_table: &[String],
    ref_table: &[String],
    canonical: i64,
) -> Result<(i64, String, String), ResolveError> {
    let mut fallback: Option<(i64, String, String)> = None;
    let mut first_err: Option<ResolveError> = None;
    for probe in [canonical, canonical - 1, canonical + 1] {
        let novel = codon_at(novel_table, ref_table.len(), probe);
        let reference = codon_at(ref_table, novel_table.len(), probe);
        match (novel, reference) {
            (Ok(n), Ok(r)) => {
                if n != r {
                    return Ok((probe, n.to_string(), r.to_string()));
                }
                if fallback.is_none() {
                    fallback = Some((probe, n.to_string(), r.to_string()));
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }
    fallback.ok_or_else(|| {
        first_err.unwrap_or(ResolveError::CodonLookup {
            index: canonical,
            table_len: ref_table.len(),
        })
    })
}
