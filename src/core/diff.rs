//! Difference extraction from aligned sequence pairs
//!
//! Walks the aligned query/reference strings column by column and produces
//! typed position lists. Positions are 1-based reference genomic
//! coordinates: the reference cursor does not advance on insertion columns,
//! and an insertion takes the position of the last consumed reference base.
//! This keeps every difference directly bucketable into reference feature
//! intervals, with boundary insertions attributed to the earlier feature.

use crate::core::alignment::{AlignmentHit, MATCH_CHAR};

/// Literal recorded for bases a search tool could not resolve
pub const UNKNOWN_BASE: char = '?';

/// The three kinds of sequence difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    Insertion,
    Deletion,
    Mismatch,
}

impl std::fmt::Display for DiffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffKind::Insertion => write!(f, "insertion"),
            DiffKind::Deletion => write!(f, "deletion"),
            DiffKind::Mismatch => write!(f, "mismatch"),
        }
    }
}

/// Typed difference lists for one aligned pair
///
/// Parallel vectors: `insertion_positions[i]` and `insertion_bases[i]`
/// describe the same event. Mismatch values carry the novel base first, the
/// reference base second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferenceSet {
    pub insertion_positions: Vec<i64>,
    pub insertion_bases: Vec<char>,
    pub deletion_positions: Vec<i64>,
    pub deletion_bases: Vec<char>,
    pub mismatch_positions: Vec<i64>,
    pub mismatch_bases: Vec<(char, char)>,
    pub exact_match: bool,
}

impl DifferenceSet {
    pub fn is_empty(&self) -> bool {
        self.insertion_positions.is_empty()
            && self.deletion_positions.is_empty()
            && self.mismatch_positions.is_empty()
    }

    /// Total number of recorded differences
    pub fn total(&self) -> usize {
        self.insertion_positions.len()
            + self.deletion_positions.len()
            + self.mismatch_positions.len()
    }
}

/// Extract typed differences from a hit
///
/// A gap in the aligned query marks a deletion, a gap in the aligned
/// reference an insertion; any remaining column the match line does not
/// confirm is a mismatch. When the aligned region consumes fewer bases than
/// the query holds, one synthetic unknown mismatch is appended at the first
/// unaligned position and the exact-match flag is cleared.
pub fn extract_differences(hit: &AlignmentHit) -> DifferenceSet {
    let mut set = DifferenceSet::default();
    // Last consumed reference position.
    let mut ref_cursor = hit.ref_start - 1;

    let query = hit.query_aligned.chars();
    let reference = hit.ref_aligned.chars();
    let matches = hit.match_line.chars();

    for ((q, r), m) in query.zip(reference).zip(matches) {
        if q == '-' {
            ref_cursor += 1;
            set.deletion_positions.push(ref_cursor);
            set.deletion_bases.push(r);
        } else if r == '-' {
            set.insertion_positions.push(ref_cursor);
            set.insertion_bases.push(q);
        } else {
            ref_cursor += 1;
            if m != MATCH_CHAR {
                set.mismatch_positions.push(ref_cursor);
                set.mismatch_bases.push((q, r));
            }
        }
    }

    let covered = hit.start_overhang + hit.aligned_query_bases();
    if covered < hit.query_length {
        log::debug!(
            "{} residual query bases without alignment",
            hit.query_length - covered
        );
        set.mismatch_positions.push(ref_cursor + 1);
        set.mismatch_bases.push((UNKNOWN_BASE, UNKNOWN_BASE));
    }

    set.exact_match = set.is_empty() && hit.start_overhang == 0;
    set
}
