//! End-to-end resolution tests
//!
//! Drives the full pipeline from catalog text to a [`Resolution`]: closest
//! allele selection, coordinate projection, partial-coverage handling,
//! IMGT renumbering and codon annotation, plus the error taxonomy.

use allele_resolver::core::{resolve_against, AlignmentHit, Span, UtrEnd, MATCH_CHAR};
use allele_resolver::{
    Catalog, DiffKind, Feature, FeatureKind, ReferenceAllele, ResolveError, Resolver,
};

/// Period-15 base pattern without short internal repeats
const PATTERN: &[u8] = b"ACGGTCAATGCCTGA";
/// A second pattern for the class II allele
const PATTERN2: &[u8] = b"TGCACTGGATACCGT";

fn patterned_sequence(pattern: &[u8], len: usize) -> String {
    (0..len).map(|i| pattern[i % pattern.len()] as char).collect()
}

/// Replace the base at a 1-based genomic position
fn mutate(sequence: &str, pos: i64, base: char) -> String {
    let mut out = sequence.to_string();
    let idx = (pos - 1) as usize;
    out.replace_range(idx..idx + 1, &base.to_string());
    out
}

/// Catalog text with two class I alleles and one class II allele, all
/// carrying a 63-base exon 1 (21 signal codons) and a 120-base exon 2.
fn catalog_text() -> String {
    const MODEL: &str = "UTR5 1 20\n\
                         Exon 1 21 83\n\
                         Intron 1 84 113\n\
                         Exon 2 114 233\n\
                         UTR3 234 253\n";
    let w0101 = patterned_sequence(PATTERN, 253);
    let w0102 = mutate(&mutate(&w0101, 130, 'T'), 180, 'C');
    let dpb1 = patterned_sequence(PATTERN2, 253);
    format!(
        "allele HLA-W*01:01\n{MODEL}sequence\n{w0101}\n//\n\
         allele HLA-W*01:02\n{MODEL}sequence\n{w0102}\n//\n\
         allele HLA-DPB1*02:01\n{MODEL}sequence\n{dpb1}\n//\n"
    )
}

fn resolver() -> Resolver {
    Resolver::new(Catalog::from_bytes(catalog_text().as_bytes()).unwrap())
}

/// Hit over pre-gapped aligned strings; the match line is derived
fn hit_from_aligned(
    query_aligned: &str,
    ref_aligned: &str,
    ref_start: i64,
    query_start: i64,
    query_length: i64,
) -> AlignmentHit {
    let match_line: String = query_aligned
        .chars()
        .zip(ref_aligned.chars())
        .map(|(q, r)| if q == r && q != '-' { MATCH_CHAR } else { ' ' })
        .collect();
    AlignmentHit {
        query_aligned: query_aligned.to_string(),
        ref_aligned: ref_aligned.to_string(),
        match_line,
        ref_start,
        query_start,
        length: query_aligned.chars().count() as i64,
        query_length,
        start_overhang: 0,
    }
}

#[test]
fn test_exact_match_resolution() {
    let resolver = resolver();
    let query = patterned_sequence(PATTERN, 253);

    let resolution = resolver.resolve_best(&query, false).unwrap();

    assert_eq!(resolution.closest_allele, "HLA-W*01:01");
    assert!(resolution.exact_match);
    assert!(resolution.differences.is_empty());
    assert!(resolution.imgt_differences.is_empty());
    assert_eq!(resolution.missing_bp, 0);
    assert_eq!(resolution.missing_bp_end, 0);

    let reference_spans: Vec<Span> = resolver
        .catalog()
        .get("HLA-W*01:01")
        .unwrap()
        .features
        .iter()
        .map(|f| f.span)
        .collect();
    assert_eq!(resolution.coordinates, reference_spans);
    // The 5'UTR runs backward to -1 in IMGT numbering.
    assert_eq!(resolution.imgt_coordinates[0], Span::new(-20, -1));
    assert_eq!(resolution.imgt_coordinates[1], Span::new(1, 63));
    assert_eq!(resolution.cds_map.cds_len(), 183);
}

#[test]
fn test_closest_allele_selection() {
    let resolver = resolver();
    let query = mutate(&mutate(&patterned_sequence(PATTERN, 253), 130, 'T'), 180, 'C');

    let resolution = resolver.resolve_best(&query, false).unwrap();

    assert_eq!(resolution.closest_allele, "HLA-W*01:02");
    assert!(resolution.exact_match);
}

#[test]
fn test_class_i_mismatch_at_cds_67_reports_codon_one() {
    let resolver = resolver();
    // Genomic 117 is CDS position 67 (exon 2 starts at CDS 64); with 21
    // signal codons the annotated mature codon is 1.
    let query = mutate(&patterned_sequence(PATTERN, 253), 117, 'A');

    let resolution = resolver.resolve_best(&query, false).unwrap();

    assert_eq!(resolution.closest_allele, "HLA-W*01:01");
    assert!(!resolution.exact_match);
    assert_eq!(resolution.differences.mismatch_positions, vec![117]);

    let difference = &resolution.imgt_differences[0];
    assert_eq!(difference.kind, DiffKind::Mismatch);
    assert_eq!(difference.cds_position, Some(67));
    assert_eq!(difference.codon, Some(1));
    let mm = difference.mm_codon.as_ref().unwrap();
    assert_eq!(mm.codon, 1);
    assert_eq!(mm.novel, "ATG");
    assert_eq!(mm.reference, "CTG");
}

#[test]
fn test_class_ii_mismatch_keeps_unshifted_codon() {
    let resolver = resolver();
    let query = mutate(&patterned_sequence(PATTERN2, 253), 117, 'G');

    let resolution = resolver.resolve_best(&query, false).unwrap();

    assert_eq!(resolution.closest_allele, "HLA-DPB1*02:01");
    let difference = &resolution.imgt_differences[0];
    assert_eq!(difference.cds_position, Some(67));
    // No signal-peptide offset for class II genes.
    assert_eq!(difference.codon, Some(22));
    let mm = difference.mm_codon.as_ref().unwrap();
    assert_eq!(mm.codon, 22);
    assert_eq!(mm.novel, "GCG");
    assert_eq!(mm.reference, "CCG");
}

#[test]
fn test_boundary_insertion_extends_exon() {
    let sequence = patterned_sequence(PATTERN, 400);
    let allele = ReferenceAllele {
        name: "HLA-Y*01:01".to_string(),
        features: vec![
            Feature::new(FeatureKind::Utr5, 1, 99),
            Feature::new(FeatureKind::Exon(1), 100, 200),
            Feature::new(FeatureKind::Intron(1), 201, 300),
            Feature::new(FeatureKind::Exon(2), 301, 360),
            Feature::new(FeatureKind::Utr3, 361, 400),
        ],
        sequence: sequence.clone(),
    };

    // One base inserted right after reference position 200, the exon 1
    // end boundary.
    let query = format!("{}T{}", &sequence[..200], &sequence[200..]);
    let query_aligned = query.clone();
    let ref_aligned = format!("{}-{}", &sequence[..200], &sequence[200..]);
    let hit = hit_from_aligned(&query_aligned, &ref_aligned, 1, 1, query.len() as i64);

    let resolution = resolve_against(&allele, hit, &query, false).unwrap();

    assert_eq!(resolution.differences.insertion_positions, vec![200]);
    // The insertion belongs to exon 1, which absorbs the extra base.
    assert_eq!(resolution.coordinates[1], Span::new(100, 201));
    assert_eq!(resolution.coordinates[2], Span::new(202, 301));
    assert_eq!(resolution.coordinates[3], Span::new(302, 361));
    assert_eq!(resolution.coordinates[4], Span::new(362, 401));

    let difference = &resolution.imgt_differences[0];
    assert_eq!(difference.kind, DiffKind::Insertion);
    assert_eq!(difference.cds_position, Some(101));
}

#[test]
fn test_intron_deletion_preserves_cds_length() {
    let resolver = resolver();
    let reference = patterned_sequence(PATTERN, 253);
    // Reference base 100 (inside intron 1) absent from the query.
    let query = format!("{}{}", &reference[..99], &reference[100..]);
    let query_aligned = format!("{}-{}", &reference[..99], &reference[100..]);
    let hit = hit_from_aligned(&query_aligned, &reference, 1, 1, query.len() as i64);

    let resolution = resolver
        .resolve(hit, &query, "HLA-W*01:01", false)
        .unwrap();

    assert_eq!(resolution.differences.deletion_positions, vec![100]);
    assert_eq!(resolution.coordinates[2], Span::new(84, 112));
    assert_eq!(resolution.coordinates[3], Span::new(113, 232));
    // The exon sum is untouched by the intron indel.
    assert_eq!(resolution.cds_map.cds_len(), 183);
    assert!(resolution.imgt_differences[0].cds_position.is_none());
}

#[test]
fn test_missing_front_bases_shift_coordinates_back() {
    let resolver = resolver();
    let reference = patterned_sequence(PATTERN, 253);
    // Sequencing picked up at reference position 4.
    let query = reference[3..].to_string();
    let hit = hit_from_aligned(&query, &reference[3..], 4, 1, query.len() as i64);

    let err = resolver
        .resolve(hit.clone(), &query, "HLA-W*01:01", false)
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::IncompleteSequence {
            missing_bp: 3,
            missing_bp_end: 0
        }
    ));

    let resolution = resolver.resolve(hit, &query, "HLA-W*01:01", true).unwrap();
    assert_eq!(resolution.missing_bp, 3);
    assert!(!resolution.exact_match);
    assert_eq!(resolution.coordinates[0], Span::new(1, 17));
    assert_eq!(resolution.coordinates[1], Span::new(18, 80));
    assert_eq!(resolution.imgt_coordinates[0], Span::new(-17, -1));
}

#[test]
fn test_missing_whole_utr5_is_fatal_even_when_tolerated() {
    let resolver = resolver();
    let reference = patterned_sequence(PATTERN, 253);
    // The whole 20 bp 5'UTR plus one exon base are absent.
    let query = reference[21..].to_string();
    let hit = hit_from_aligned(&query, &reference[21..], 22, 1, query.len() as i64);

    let err = resolver.resolve(hit, &query, "HLA-W*01:01", true).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::MissingUtr {
            end: UtrEnd::Five,
            ..
        }
    ));
}

#[test]
fn test_truncated_hit_recovered_before_extraction() {
    let resolver = resolver();
    let reference = patterned_sequence(PATTERN, 253);
    // Query differs at genomic 5; the search tool dropped the first 8
    // columns around that mismatch.
    let query = mutate(&reference, 5, 'A');
    let hit = hit_from_aligned(&reference[8..], &reference[8..], 9, 9, query.len() as i64);

    let resolution = resolver.resolve(hit, &query, "HLA-W*01:01", false).unwrap();

    assert_eq!(resolution.differences.mismatch_positions, vec![5]);
    let difference = &resolution.imgt_differences[0];
    // UTR5 position 5 with a 20 bp UTR renumbers to -16.
    assert_eq!(difference.imgt_position, -16);
    assert_eq!(difference.codon, None);
    assert!(difference.mm_codon.is_none());
}

#[test]
fn test_excessive_start_overhang_fails() {
    let resolver = resolver();
    let reference = patterned_sequence(PATTERN, 253);
    // Six leading query bases precede reference base 1.
    let query = format!("TTTTTT{}", reference);
    let hit = hit_from_aligned(&reference, &reference, 1, 7, query.len() as i64);

    let err = resolver.resolve(hit, &query, "HLA-W*01:01", false).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::AlignmentRecovery { unaligned: 6 }
    ));
}

#[test]
fn test_unknown_allele_is_reported() {
    let resolver = resolver();
    let reference = patterned_sequence(PATTERN, 253);
    let hit = hit_from_aligned(&reference, &reference, 1, 1, reference.len() as i64);

    let err = resolver
        .resolve(hit, &reference, "HLA-W*99:99", false)
        .unwrap_err();
    match err {
        ResolveError::UnknownAllele(name) => assert_eq!(name, "HLA-W*99:99"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_batch_resolution() {
    let resolver = resolver();
    let queries = vec![
        ("s1".to_string(), patterned_sequence(PATTERN, 253)),
        (
            "s2".to_string(),
            mutate(&mutate(&patterned_sequence(PATTERN, 253), 130, 'T'), 180, 'C'),
        ),
    ];

    let results = resolver.resolve_batch(&queries, false);

    assert_eq!(results.len(), 2);
    let s1 = results.iter().find(|(id, _)| id == "s1").unwrap();
    let s2 = results.iter().find(|(id, _)| id == "s2").unwrap();
    assert_eq!(s1.1.as_ref().unwrap().closest_allele, "HLA-W*01:01");
    assert_eq!(s2.1.as_ref().unwrap().closest_allele, "HLA-W*01:02");
}
