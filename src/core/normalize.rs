//! Partial-coverage normalization
//!
//! An alignment that starts past reference position 1 leaves the first
//! `missing_bp` reference bases uncovered. This stage re-anchors every
//! projected coordinate and difference position onto the novel sequence
//! (position 1 = first sequenced base) and enforces the minimum-UTR
//! invariant: at least one base of each untranslated region must be present
//! for the reading frame to be trustworthy.
//!
//! Incomplete coverage that leaves both UTRs intact is a warning condition.
//! Callers opt into it explicitly; without the opt-in it blocks.

use crate::core::diff::DifferenceSet;
use crate::core::error::{ResolveError, UtrEnd};
use crate::core::feature::{Feature, Span};
use crate::core::projector::Projection;

/// Fully normalized coordinates and differences for the novel sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Feature intervals, parallel to the reference feature list
    pub spans: Vec<Span>,
    /// Differences in the novel frame (re-homed mismatches folded in)
    pub differences: DifferenceSet,
    /// Reference bases absent at the 5' end
    pub missing_bp: i64,
    /// Reference bases absent at the 3' end
    pub missing_bp_end: i64,
}

/// Re-anchor projected coordinates onto the novel sequence
///
/// `ref_start` is the hit's reference start offset, `ref_len` the reference
/// sequence length. Fails with [`ResolveError::MissingUtr`] when either
/// projected UTR has no bases left, and with
/// [`ResolveError::IncompleteSequence`] when coverage is partial and
/// `tolerate_incomplete` is false.
pub fn normalize(
    features: &[Feature],
    projection: Projection,
    diffs: &DifferenceSet,
    ref_start: i64,
    ref_len: i64,
    tolerate_incomplete: bool,
) -> Result<Normalized, ResolveError> {
    let mut spans = projection.spans;
    let mut differences = DifferenceSet {
        mismatch_positions: projection.mismatch_positions,
        ..diffs.clone()
    };

    let missing_bp = ref_start - 1;
    if missing_bp > 0 {
        for span in spans.iter_mut() {
            *span = span.shifted(-missing_bp);
        }
        // The leading UTR starts wherever sequencing picked up.
        spans[0].start = 1;
        for pos in differences
            .insertion_positions
            .iter_mut()
            .chain(differences.deletion_positions.iter_mut())
            .chain(differences.mismatch_positions.iter_mut())
        {
            *pos -= missing_bp;
        }

        let utr5_len = spans[0].end;
        if utr5_len <= 0 {
            return Err(ResolveError::MissingUtr {
                end: UtrEnd::Five,
                length: utr5_len,
            });
        }
    }

    let utr3 = *spans.last().expect("gene model has features");
    let utr3_len = utr3.len();
    if utr3_len <= 0 {
        return Err(ResolveError::MissingUtr {
            end: UtrEnd::Three,
            length: utr3_len,
        });
    }
    let expected_utr3 = features.last().expect("gene model has features").span.len();
    let missing_bp_end = (expected_utr3 - utr3_len).max(0);

    if missing_bp > 0 || missing_bp_end > 0 {
        if !tolerate_incomplete {
            return Err(ResolveError::IncompleteSequence {
                missing_bp,
                missing_bp_end,
            });
        }
        log::warn!(
            "incomplete coverage tolerated: {} bp missing at 5', {} bp at 3'",
            missing_bp,
            missing_bp_end
        );
    }

    // Positions pushed past the reference by the shift are artifacts of the
    // renumbering, not observations; drop them.
    discard_beyond(&mut differences, ref_len);

    Ok(Normalized {
        spans,
        differences,
        missing_bp,
        missing_bp_end,
    })
}

fn discard_beyond(differences: &mut DifferenceSet, ref_len: i64) {
    retain_parallel(
        &mut differences.insertion_positions,
        &mut differences.insertion_bases,
        ref_len,
    );
    retain_parallel(
        &mut differences.deletion_positions,
        &mut differences.deletion_bases,
        ref_len,
    );
    retain_parallel(
        &mut differences.mismatch_positions,
        &mut differences.mismatch_bases,
        ref_len,
    );
}

fn retain_parallel<T>(positions: &mut Vec<i64>, values: &mut Vec<T>, ref_len: i64) {
    let mut keep = positions.iter().map(|p| *p <= ref_len);
    values.retain(|_| keep.next().unwrap_or(false));
    positions.retain(|p| *p <= ref_len);
}
