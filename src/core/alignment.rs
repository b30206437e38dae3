//! Alignment acquisition and end recovery
//!
//! Local search tools report one best HSP per query, but drop query bases
//! near either end when a mismatch or indel sits close to the boundary. The
//! acquirer repairs such truncated hits by globally re-aligning the dropped
//! prefix or suffix against the adjacent reference window and splicing the
//! recovered columns back onto the hit, so that downstream stages always see
//! the full query.
//!
//! Scoring for the recovery alignment: match +2, mismatch -3, gap open -5,
//! gap extend -2, with the outer end of the reference window free. The DP
//! traceback is deterministic (leftmost gap placement among equal scores).

use crate::core::error::ResolveError;
use crate::core::feature::ReferenceAllele;
use bio::alignment::pairwise::{Aligner, Scoring};
use bio::alignment::AlignmentOperation;

/// Column character marking a matching base in the match line
pub const MATCH_CHAR: char = '|';

/// Most query bases tolerated without any reference mapping at the start
pub const MAX_UNALIGNED_START: i64 = 3;

/// Extra reference bases added to a recovery window to leave room for indels
const RECOVERY_WINDOW_SLACK: usize = 5;

/// A single best-hit alignment between a query and a reference sequence
///
/// The three strings have equal length; `-` marks a gap column. Offsets are
/// 1-based. `start_overhang` counts query bases that precede reference base
/// 1 and therefore can never be aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentHit {
    pub query_aligned: String,
    pub ref_aligned: String,
    pub match_line: String,
    /// Reference position of the first aligned column
    pub ref_start: i64,
    /// Query position of the first aligned base
    pub query_start: i64,
    /// Number of alignment columns
    pub length: i64,
    /// Full (unaligned) query length
    pub query_length: i64,
    pub start_overhang: i64,
}

impl AlignmentHit {
    /// Query bases consumed by the aligned region
    pub fn aligned_query_bases(&self) -> i64 {
        self.query_aligned.chars().filter(|c| *c != '-').count() as i64
    }

    /// Reference bases consumed by the aligned region
    pub fn aligned_ref_bases(&self) -> i64 {
        self.ref_aligned.chars().filter(|c| *c != '-').count() as i64
    }

    /// True when every query base is covered by the alignment
    pub fn spans_full_query(&self) -> bool {
        self.query_start == 1 && self.aligned_query_bases() == self.query_length
    }
}

/// Render the aligned string triplet for an operation list
///
/// `x` is the query fragment (walked from its first base), `y` the reference
/// window slice the operations refer to. `Yclip` columns consume reference
/// bases without emitting columns; `Xclip` is symmetric for the query.
fn aligned_strings(x: &[u8], y: &[u8], operations: &[AlignmentOperation]) -> (String, String, String) {
    let mut q = String::new();
    let mut r = String::new();
    let mut m = String::new();
    let mut xi = 0usize;
    let mut yi = 0usize;
    for op in operations {
        match op {
            AlignmentOperation::Match => {
                q.push(x[xi] as char);
                r.push(y[yi] as char);
                m.push(MATCH_CHAR);
                xi += 1;
                yi += 1;
            }
            AlignmentOperation::Subst => {
                q.push(x[xi] as char);
                r.push(y[yi] as char);
                m.push(' ');
                xi += 1;
                yi += 1;
            }
            AlignmentOperation::Ins => {
                q.push(x[xi] as char);
                r.push('-');
                m.push(' ');
                xi += 1;
            }
            AlignmentOperation::Del => {
                q.push('-');
                r.push(y[yi] as char);
                m.push(' ');
                yi += 1;
            }
            AlignmentOperation::Xclip(n) => xi += n,
            AlignmentOperation::Yclip(n) => yi += n,
        }
    }
    (q, r, m)
}

fn recovery_scoring() -> Scoring<bio::alignment::pairwise::MatchParams> {
    Scoring::from_scores(-5, -2, 2, -3)
}

/// Repair a hit whose aligned region does not cover the whole query
///
/// Returns the hit unchanged when it already spans the full query. Otherwise
/// the unaligned prefix and suffix are each re-aligned globally against the
/// neighboring reference window and spliced onto the hit, with `ref_start`,
/// `length` and `start_overhang` recomputed.
///
/// Fails with [`ResolveError::AlignmentRecovery`] when more than
/// [`MAX_UNALIGNED_START`] query bases precede reference base 1: the query
/// is too dissimilar to the chosen reference to anchor.
pub fn recover_ends(
    hit: AlignmentHit,
    query: &str,
    reference: &str,
) -> Result<AlignmentHit, ResolveError> {
    if hit.spans_full_query() {
        return Ok(hit);
    }
    log::debug!(
        "recovering alignment ends: {}/{} query bases aligned",
        hit.aligned_query_bases(),
        hit.query_length
    );

    let mut hit = hit;
    let query_bytes = query.as_bytes();
    let ref_bytes = reference.as_bytes();

    // Unaligned prefix.
    let prefix_len = (hit.query_start - 1) as usize;
    if prefix_len > 0 {
        let avail = (hit.ref_start - 1) as usize;
        let overhang = prefix_len.saturating_sub(avail);
        if overhang as i64 > MAX_UNALIGNED_START {
            return Err(ResolveError::AlignmentRecovery {
                unaligned: overhang as i64,
            });
        }
        let frag = &query_bytes[overhang..prefix_len];
        if !frag.is_empty() {
            let window_len = avail.min(frag.len() + RECOVERY_WINDOW_SLACK);
            let window = &ref_bytes[avail - window_len..avail];
            let scoring = recovery_scoring().yclip_prefix(0);
            let mut aligner = Aligner::with_scoring(scoring);
            let aln = aligner.custom(frag, window);
            let (q_al, r_al, m_al) = aligned_strings(frag, window, &aln.operations);
            let ref_consumed = r_al.chars().filter(|c| *c != '-').count() as i64;

            hit.query_aligned = q_al + &hit.query_aligned;
            hit.ref_aligned = r_al + &hit.ref_aligned;
            hit.match_line = m_al + &hit.match_line;
            hit.ref_start -= ref_consumed;
            hit.query_start = overhang as i64 + 1;
        } else {
            hit.query_start = overhang as i64 + 1;
        }
        hit.start_overhang = overhang as i64;
    }

    // Unaligned suffix.
    let consumed = (hit.query_start - 1 + hit.aligned_query_bases()) as usize;
    if consumed < query_bytes.len() {
        let tail = &query_bytes[consumed..];
        let ref_end = (hit.ref_start - 1 + hit.aligned_ref_bases()) as usize;
        let avail = ref_bytes.len().saturating_sub(ref_end);
        if avail > 0 {
            let window_len = avail.min(tail.len() + RECOVERY_WINDOW_SLACK);
            let window = &ref_bytes[ref_end..ref_end + window_len];
            let scoring = recovery_scoring().yclip_suffix(0);
            let mut aligner = Aligner::with_scoring(scoring);
            let aln = aligner.custom(tail, window);
            let (q_al, r_al, m_al) = aligned_strings(tail, window, &aln.operations);

            hit.query_aligned.push_str(&q_al);
            hit.ref_aligned.push_str(&r_al);
            hit.match_line.push_str(&m_al);
        }
        // With no reference left the tail stays unaligned; the difference
        // extractor records it as a single unknown mismatch.
    }

    hit.length = hit.query_aligned.chars().count() as i64;
    Ok(hit)
}

/// Scan reference alleles and return the best-scoring semiglobal hit
///
/// The query is aligned end-to-end against every candidate; reference
/// flanks are free. This is the default Alignment Source for the CLI and
/// tests; callers with an external search tool can construct
/// [`AlignmentHit`] records directly instead.
pub fn best_hit<'a, I>(query: &str, alleles: I) -> Option<(&'a ReferenceAllele, AlignmentHit)>
where
    I: IntoIterator<Item = &'a ReferenceAllele>,
{
    let score_fn = |a: u8, b: u8| if a == b { 2i32 } else { -3i32 };
    let mut aligner = Aligner::new(-5, -2, score_fn);

    let mut best: Option<(&ReferenceAllele, bio::alignment::Alignment)> = None;
    for allele in alleles {
        let aln = aligner.semiglobal(query.as_bytes(), allele.sequence.as_bytes());
        let better = match &best {
            Some((_, current)) => aln.score > current.score,
            None => true,
        };
        if better {
            best = Some((allele, aln));
        }
    }

    let (allele, aln) = best?;
    log::debug!("closest allele {} (score {})", allele.name, aln.score);
    let window = &allele.sequence.as_bytes()[aln.ystart..aln.yend];
    let (q_al, r_al, m_al) = aligned_strings(query.as_bytes(), window, &aln.operations);
    let length = q_al.chars().count() as i64;
    Some((
        allele,
        AlignmentHit {
            query_aligned: q_al,
            ref_aligned: r_al,
            match_line: m_al,
            ref_start: aln.ystart as i64 + 1,
            query_start: 1,
            length,
            query_length: query.len() as i64,
            start_overhang: 0,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feature::{Feature, FeatureKind};

    /// Hit covering the whole of `query` against `reference` starting at
    /// `ref_start`, assuming a gap-free overlap.
    fn identity_hit(query: &str, reference: &str, ref_start: i64) -> AlignmentHit {
        let start = (ref_start - 1) as usize;
        let ref_slice = &reference[start..start + query.len()];
        let match_line: String = query
            .chars()
            .zip(ref_slice.chars())
            .map(|(a, b)| if a == b { MATCH_CHAR } else { ' ' })
            .collect();
        AlignmentHit {
            query_aligned: query.to_string(),
            ref_aligned: ref_slice.to_string(),
            match_line,
            ref_start,
            query_start: 1,
            length: query.len() as i64,
            query_length: query.len() as i64,
            start_overhang: 0,
        }
    }

    fn reference() -> String {
        // 40 bases, no short repeats around the edit sites used below
        "ACGTACGTTGCATGCAGGATCCGGAACTTGCAACGGTACA".to_string()
    }

    #[test]
    fn test_full_hit_returned_unchanged() {
        let reference = reference();
        let hit = identity_hit(&reference, &reference, 1);
        let recovered = recover_ends(hit.clone(), &reference, &reference).unwrap();
        assert_eq!(recovered, hit);
    }

    #[test]
    fn test_prefix_recovery_splices_columns() {
        let reference = reference();
        // The search tool dropped the first 6 query bases.
        let truncated = {
            let mut hit = identity_hit(&reference, &reference, 1);
            hit.query_aligned = hit.query_aligned[6..].to_string();
            hit.ref_aligned = hit.ref_aligned[6..].to_string();
            hit.match_line = hit.match_line[6..].to_string();
            hit.ref_start = 7;
            hit.query_start = 7;
            hit.length -= 6;
            hit
        };
        let recovered = recover_ends(truncated, &reference, &reference).unwrap();
        assert!(recovered.spans_full_query());
        assert_eq!(recovered.ref_start, 1);
        assert_eq!(recovered.query_aligned, reference);
        assert_eq!(recovered.length, reference.len() as i64);
        assert_eq!(recovered.start_overhang, 0);
    }

    #[test]
    fn test_suffix_recovery_splices_columns() {
        let reference = reference();
        let truncated = {
            let mut hit = identity_hit(&reference, &reference, 1);
            let keep = reference.len() - 5;
            hit.query_aligned.truncate(keep);
            hit.ref_aligned.truncate(keep);
            hit.match_line.truncate(keep);
            hit.length = keep as i64;
            hit
        };
        let recovered = recover_ends(truncated, &reference, &reference).unwrap();
        assert!(recovered.spans_full_query());
        assert_eq!(recovered.query_aligned, reference);
    }

    #[test]
    fn test_small_start_overhang_tolerated() {
        let reference = reference();
        // Query carries two extra leading bases the reference cannot hold.
        let query = format!("TT{}", &reference);
        let truncated = {
            let mut hit = identity_hit(&reference, &reference, 1);
            hit.query_start = 3;
            hit.query_length = query.len() as i64;
            hit
        };
        let recovered = recover_ends(truncated, &query, &reference).unwrap();
        assert_eq!(recovered.start_overhang, 2);
        assert_eq!(recovered.query_start, 3);
        assert_eq!(recovered.ref_start, 1);
    }

    #[test]
    fn test_excessive_overhang_fails() {
        let reference = reference();
        let query = format!("TTTTTT{}", &reference);
        let truncated = {
            let mut hit = identity_hit(&reference, &reference, 1);
            hit.query_start = 7;
            hit.query_length = query.len() as i64;
            hit
        };
        let err = recover_ends(truncated, &query, &reference).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::AlignmentRecovery { unaligned: 6 }
        ));
    }

    #[test]
    fn test_best_hit_prefers_identical_allele() {
        let make = |name: &str, sequence: &str| ReferenceAllele {
            name: name.to_string(),
            features: vec![Feature::new(FeatureKind::Utr5, 1, sequence.len() as i64)],
            sequence: sequence.to_string(),
        };
        let a = make("TEST*01", "ACGTACGTTGCATGCAGGATCCGGAACTTGCA");
        let b = make("TEST*02", "ACGTACGTTGCATGCAGCATCCGGAACTTGCA");
        let query = a.sequence.clone();

        let (closest, hit) = best_hit(&query, [&a, &b]).unwrap();
        assert_eq!(closest.name, "TEST*01");
        assert_eq!(hit.ref_start, 1);
        assert!(hit.spans_full_query());
        assert!(hit.match_line.chars().all(|c| c == MATCH_CHAR));
    }

    #[test]
    fn test_best_hit_reports_interior_start() {
        let make = |name: &str, sequence: &str| ReferenceAllele {
            name: name.to_string(),
            features: vec![Feature::new(FeatureKind::Utr5, 1, sequence.len() as i64)],
            sequence: sequence.to_string(),
        };
        let reference = make("TEST*01", "ACGTACGTTGCATGCAGGATCCGGAACTTGCA");
        // Query missing the first four reference bases
        let query = reference.sequence[4..].to_string();

        let (_, hit) = best_hit(&query, [&reference]).unwrap();
        assert_eq!(hit.ref_start, 5);
        assert_eq!(hit.query_start, 1);
        assert_eq!(hit.aligned_query_bases(), query.len() as i64);
    }
}
