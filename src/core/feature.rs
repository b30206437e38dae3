//! Gene-model features and reference alleles
//!
//! A gene model is an ordered (5'→3') sequence of typed features, each
//! covering a 1-based inclusive genomic interval. The order is fixed and
//! never rearranged; all coordinate transformations produce fresh interval
//! lists instead of mutating a model in place.

/// A 1-based inclusive coordinate interval
///
/// Positions are signed: IMGT numbering runs backward through negative
/// coordinates inside the 5'UTR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Number of bases covered by the interval
    ///
    /// # Examples
    /// ```
    /// use allele_resolver::core::Span;
    /// assert_eq!(Span::new(10, 12).len(), 3);
    /// assert_eq!(Span::new(5, 5).len(), 1);
    /// ```
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    /// True when the interval covers no bases
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// True when `pos` lies inside the interval (both bounds inclusive)
    #[inline]
    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos <= self.end
    }

    /// A copy of the interval translated by `delta`
    pub fn shifted(&self, delta: i64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// The kind of a gene-model feature
///
/// Exons, introns and pseudo-exons carry their 1-based ordinal within the
/// gene model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Utr5,
    Exon(u8),
    Intron(u8),
    PseudoExon(u8),
    Utr3,
}

impl FeatureKind {
    /// True for coding features (exons only; pseudo-exons do not code)
    pub fn is_exon(&self) -> bool {
        matches!(self, FeatureKind::Exon(_))
    }

    /// True for either untranslated region
    pub fn is_utr(&self) -> bool {
        matches!(self, FeatureKind::Utr5 | FeatureKind::Utr3)
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Utr5 => write!(f, "UTR5"),
            FeatureKind::Exon(n) => write!(f, "Exon {}", n),
            FeatureKind::Intron(n) => write!(f, "Intron {}", n),
            FeatureKind::PseudoExon(n) => write!(f, "PseudoExon {}", n),
            FeatureKind::Utr3 => write!(f, "UTR3"),
        }
    }
}

/// A typed feature with its genomic interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub kind: FeatureKind,
    pub span: Span,
}

impl Feature {
    pub fn new(kind: FeatureKind, start: i64, end: i64) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
        }
    }
}

/// A known allele from the reference catalog
///
/// Immutable once constructed; the catalog owns it and hands out references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceAllele {
    pub name: String,
    /// Ordered 5'→3'; strictly increasing, non-overlapping intervals
    pub features: Vec<Feature>,
    pub sequence: String,
}

impl ReferenceAllele {
    /// The reference coding sequence: exon substrings concatenated in order
    pub fn cds(&self) -> String {
        let mut out = String::new();
        for feature in &self.features {
            if feature.kind.is_exon() {
                out.push_str(slice_1based(&self.sequence, feature.span));
            }
        }
        out
    }

    /// Length of the reference exon with the given ordinal, if present
    pub fn exon_len(&self, ordinal: u8) -> Option<i64> {
        self.features
            .iter()
            .find(|f| f.kind == FeatureKind::Exon(ordinal))
            .map(|f| f.span.len())
    }
}

/// Slice a sequence by a 1-based inclusive interval, clamped to its bounds
pub fn slice_1based(sequence: &str, span: Span) -> &str {
    if span.is_empty() || sequence.is_empty() {
        return "";
    }
    let start = (span.start.max(1) - 1) as usize;
    let end = (span.end.min(sequence.len() as i64)) as usize;
    if start >= end {
        return "";
    }
    &sequence[start..end]
}

/// Index of the feature interval containing `pos`
///
/// Boundary ties resolve to the earlier feature: a position equal to a
/// feature's end belongs to that feature, not to the next one.
pub fn containing_feature(spans: &[Span], pos: i64) -> Option<usize> {
    spans.iter().position(|s| s.contains(pos))
}
