//! Feature coordinate projection
//!
//! Projects a reference allele's feature boundaries onto the novel sequence
//! by sweeping the ordered feature list once, left to right, and propagating
//! every indel-driven boundary shift to the features downstream of it. The
//! sweep is a pure function: it returns a fresh interval list and never
//! touches the reference's own coordinates.
//!
//! Within the sweep, an indel sitting exactly on a feature's end boundary
//! belongs to that feature, not the next one. The terminal feature's end is
//! pinned to the observed sequence extent rather than translated, so a
//! truncated 3' end stays visible to the normalization stage.

use crate::core::diff::DifferenceSet;
use crate::core::feature::{Feature, Span};

/// Result of projecting reference features onto the novel sequence
///
/// `spans` parallels the reference feature list. `mismatch_positions`
/// parallels the input mismatch list, re-homed into the novel coordinate
/// frame; insertion and deletion positions keep their reference-frame
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub spans: Vec<Span>,
    pub mismatch_positions: Vec<i64>,
}

/// Project feature boundaries across the differences
///
/// `total_len` is the last occupied position of the novel sequence in the
/// reference-anchored frame; the terminal feature's end always lands there.
///
/// Complexity is O(features × differences). The sweep order is the
/// correctness concern: each feature's shift must be applied to everything
/// downstream before the next feature is examined.
pub fn project(features: &[Feature], diffs: &DifferenceSet, total_len: i64) -> Projection {
    let mut spans: Vec<Span> = features.iter().map(|f| f.span).collect();
    let mut mismatches = diffs.mismatch_positions.clone();
    if spans.is_empty() {
        return Projection {
            spans,
            mismatch_positions: mismatches,
        };
    }
    let last = spans.len() - 1;

    for i in 0..spans.len() {
        // Difference positions never move out of the reference frame, so
        // bucketing uses the original interval; the running spans already
        // carry upstream shifts.
        let Span { start, end } = features[i].span;
        let ins: Vec<i64> = diffs
            .insertion_positions
            .iter()
            .copied()
            .filter(|p| *p >= start && *p <= end)
            .collect();
        let dels: Vec<i64> = diffs
            .deletion_positions
            .iter()
            .copied()
            .filter(|p| *p >= start && *p <= end)
            .collect();
        let coord_change = ins.len() as i64 - dels.len() as i64;
        if coord_change == 0 {
            continue;
        }

        if i != last {
            spans[i].end += coord_change;
        }

        for (m, &ref_m) in mismatches.iter_mut().zip(&diffs.mismatch_positions) {
            if ref_m >= start && ref_m <= end {
                let local = ins.iter().filter(|p| **p < ref_m).count() as i64
                    - dels.iter().filter(|p| **p < ref_m).count() as i64;
                *m += local;
            } else if ref_m > end {
                *m += coord_change;
            }
        }

        for j in i + 1..spans.len() {
            spans[j].start += coord_change;
            if j != last {
                spans[j].end += coord_change;
            }
        }
    }

    spans[last].end = total_len;
    Projection {
        spans,
        mismatch_positions: mismatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feature::FeatureKind;

    fn model() -> Vec<Feature> {
        vec![
            Feature::new(FeatureKind::Utr5, 1, 100),
            Feature::new(FeatureKind::Exon(1), 101, 200),
            Feature::new(FeatureKind::Intron(1), 201, 300),
            Feature::new(FeatureKind::Exon(2), 301, 400),
            Feature::new(FeatureKind::Utr3, 401, 500),
        ]
    }

    fn diffs(ins: &[i64], del: &[i64], mm: &[i64]) -> DifferenceSet {
        DifferenceSet {
            insertion_positions: ins.to_vec(),
            insertion_bases: vec!['A'; ins.len()],
            deletion_positions: del.to_vec(),
            deletion_bases: vec!['A'; del.len()],
            mismatch_positions: mm.to_vec(),
            mismatch_bases: vec![('A', 'C'); mm.len()],
            exact_match: ins.is_empty() && del.is_empty() && mm.is_empty(),
        }
    }

    #[test]
    fn test_no_differences_is_identity() {
        let features = model();
        let p = project(&features, &diffs(&[], &[], &[]), 500);
        let expected: Vec<Span> = features.iter().map(|f| f.span).collect();
        assert_eq!(p.spans, expected);
    }

    #[test]
    fn test_insertion_shifts_downstream_features() {
        let features = model();
        let p = project(&features, &diffs(&[150], &[], &[]), 501);
        assert_eq!(p.spans[0], Span::new(1, 100)); // untouched
        assert_eq!(p.spans[1], Span::new(101, 201)); // holds the insertion
        assert_eq!(p.spans[2], Span::new(202, 301));
        assert_eq!(p.spans[3], Span::new(302, 401));
        assert_eq!(p.spans[4], Span::new(402, 501));
    }

    #[test]
    fn test_deletion_shrinks_containing_feature() {
        let features = model();
        let p = project(&features, &diffs(&[], &[250], &[]), 499);
        assert_eq!(p.spans[1], Span::new(101, 200));
        assert_eq!(p.spans[2], Span::new(201, 299));
        assert_eq!(p.spans[3], Span::new(300, 399));
        assert_eq!(p.spans[4], Span::new(400, 499));
    }

    #[test]
    fn test_boundary_insertion_belongs_to_earlier_feature() {
        let features = model();
        // Insertion exactly at exon 1's end extends the exon, not intron 1.
        let p = project(&features, &diffs(&[200], &[], &[]), 501);
        assert_eq!(p.spans[1], Span::new(101, 201));
        assert_eq!(p.spans[2], Span::new(202, 301));
    }

    #[test]
    fn test_balanced_indels_in_one_feature_cancel() {
        let features = model();
        let p = project(&features, &diffs(&[210], &[260], &[]), 500);
        let expected: Vec<Span> = model().iter().map(|f| f.span).collect();
        assert_eq!(p.spans, expected);
    }

    #[test]
    fn test_mismatch_rehomed_after_insertion_in_same_feature() {
        let features = model();
        // Insertion at 150 sits before the mismatch at 180 inside exon 1.
        let p = project(&features, &diffs(&[150], &[], &[180]), 501);
        assert_eq!(p.mismatch_positions, vec![181]);
    }

    #[test]
    fn test_mismatch_before_insertion_not_shifted() {
        let features = model();
        let p = project(&features, &diffs(&[180], &[], &[150]), 501);
        assert_eq!(p.mismatch_positions, vec![150]);
    }

    #[test]
    fn test_mismatch_downstream_of_indel_feature_shifts_fully() {
        let features = model();
        // Insertion in exon 1, mismatch in exon 2.
        let p = project(&features, &diffs(&[150], &[], &[350]), 501);
        assert_eq!(p.mismatch_positions, vec![351]);
    }

    #[test]
    fn test_terminal_end_is_pinned_not_translated() {
        let features = model();
        // Insertion inside the 3'UTR itself: its end lands on the observed
        // sequence extent instead of being stretched.
        let p = project(&features, &diffs(&[450], &[], &[]), 501);
        assert_eq!(p.spans[4], Span::new(401, 501));
    }

    #[test]
    fn test_truncated_end_clips_terminal_feature() {
        let features = model();
        let p = project(&features, &diffs(&[], &[], &[]), 460);
        assert_eq!(p.spans[4], Span::new(401, 460));
    }

    #[test]
    fn test_exon_sum_preserved_for_intron_indels() {
        let features = model();
        let p = project(&features, &diffs(&[210, 220], &[250], &[]), 501);
        let exon_total: i64 = features
            .iter()
            .zip(&p.spans)
            .filter(|(f, _)| f.kind.is_exon())
            .map(|(_, s)| s.len())
            .sum();
        assert_eq!(exon_total, 200);
    }

    #[test]
    fn test_indel_inside_upstream_shift_still_counted() {
        let features = vec![
            Feature::new(FeatureKind::Utr5, 1, 10),
            Feature::new(FeatureKind::Exon(1), 11, 40),
            Feature::new(FeatureKind::Intron(1), 41, 60),
            Feature::new(FeatureKind::Exon(2), 61, 90),
            Feature::new(FeatureKind::Utr3, 91, 100),
        ];
        // The exon 1 insertion pushes the intron to 42..61 before the
        // intron is processed; the insertion at reference 41 must still
        // count as intronic.
        let p = project(&features, &diffs(&[20, 41], &[], &[]), 102);
        assert_eq!(p.spans[1], Span::new(11, 41));
        assert_eq!(p.spans[2], Span::new(42, 62));
        assert_eq!(p.spans[3], Span::new(63, 92));
        assert_eq!(p.spans[4], Span::new(93, 102));
    }

    #[test]
    fn test_cascade_across_multiple_features() {
        let features = model();
        // +1 in exon 1 and -1 in intron 1: exon 2 ends up where it started.
        let p = project(&features, &diffs(&[150], &[250], &[]), 500);
        assert_eq!(p.spans[1], Span::new(101, 201));
        assert_eq!(p.spans[2], Span::new(202, 300));
        assert_eq!(p.spans[3], Span::new(301, 400));
        assert_eq!(p.spans[4], Span::new(401, 500));
    }
}
