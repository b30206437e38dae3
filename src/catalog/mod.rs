//! Reference allele catalog
//!
//! Parses the flat catalog format distributed by nomenclature databases:
//! one record per allele, its ordered feature table, then the raw sequence,
//! terminated by `//`.
//!
//! # Catalog Format
//!
//! ```text
//! # comment
//! allele HLA-A*01:01:01:01
//! UTR5 1 10
//! Exon 1 11 73
//! Intron 1 74 93
//! Exon 2 94 213
//! UTR3 214 233
//! sequence
//! ACGTACGTAC...
//! //
//! ```
//!
//! - `allele <name>` opens a record
//! - feature lines are `<UTR5|UTR3> <start> <end>` or
//!   `<Exon|Intron|PseudoExon> <ordinal> <start> <end>`, 1-based inclusive
//! - `sequence` starts the sequence block; lines may be wrapped
//! - `//` closes the record
//!
//! Records are validated on load: the model must open with a 5'UTR at
//! position 1, close with a 3'UTR at the sequence end, and hold strictly
//! increasing, non-overlapping intervals.

pub mod fasta;

use crate::core::{CatalogError, CatalogResult, Feature, FeatureKind, ReferenceAllele};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Compression format for catalog and FASTA files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

/// Detect compression format from file extension and/or magic bytes
pub fn detect_compression(path: &Path) -> CatalogResult<CompressionFormat> {
    use std::fs::File;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if extension == "gz" {
        return Ok(CompressionFormat::Gzip);
    }
    if extension == "bz2" {
        return Ok(CompressionFormat::Bzip2);
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;

    if bytes_read >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        return Ok(CompressionFormat::Gzip);
    }
    // BZ2 magic: "BZh"
    if bytes_read >= 3 && magic[0] == 0x42 && magic[1] == 0x5a && magic[2] == 0x68 {
        return Ok(CompressionFormat::Bzip2);
    }

    Ok(CompressionFormat::Plain)
}

/// Open a possibly compressed file as a buffered reader
pub(crate) fn open_reader(path: &Path) -> CatalogResult<Box<dyn BufRead>> {
    use std::fs::File;

    if !path.exists() {
        return Err(CatalogError::FileNotFound(path.to_path_buf()));
    }
    let format = detect_compression(path)?;
    let file = File::open(path)?;

    Ok(match format {
        CompressionFormat::Gzip => {
            let decoder = flate2::read::GzDecoder::new(file);
            Box::new(BufReader::with_capacity(128 * 1024, decoder))
        }
        CompressionFormat::Bzip2 => {
            let decoder = bzip2::read::BzDecoder::new(file);
            Box::new(BufReader::with_capacity(128 * 1024, decoder))
        }
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(128 * 1024, file)),
    })
}

/// True for standard bases and IUPAC ambiguity codes
#[inline]
pub(crate) fn is_dna_base(base: u8) -> bool {
    matches!(
        base.to_ascii_uppercase(),
        b'A' | b'C' | b'G' | b'T' | b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B' | b'V'
            | b'D' | b'H' | b'N'
    )
}

/// An in-memory reference allele catalog
///
/// Read-only after loading; alleles are looked up by exact name.
#[derive(Debug)]
pub struct Catalog {
    alleles: Vec<ReferenceAllele>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Load a catalog from a path
    ///
    /// Automatically handles gzip and bzip2 compression.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let reader = open_reader(path.as_ref())?;
        Self::from_reader(reader)
    }

    /// Parse a catalog from bytes (for testing)
    pub fn from_bytes(data: &[u8]) -> CatalogResult<Self> {
        Self::from_reader(BufReader::new(data))
    }

    /// Parse a catalog from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> CatalogResult<Self> {
        let mut parser = Parser::default();
        let mut line_number = 0usize;
        for line_result in reader.lines() {
            line_number += 1;
            let line = line_result?;
            parser.line(line.trim(), line_number)?;
        }
        parser.finish(line_number)
    }

    /// Look up an allele by exact name
    pub fn get(&self, name: &str) -> Option<&ReferenceAllele> {
        self.index.get(name).map(|i| &self.alleles[*i])
    }

    pub fn len(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceAllele> {
        self.alleles.iter()
    }

    /// All allele names, in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.alleles.iter().map(|a| a.name.as_str())
    }
}

/// Incremental catalog record parser
#[derive(Default)]
struct Parser {
    alleles: Vec<ReferenceAllele>,
    index: HashMap<String, usize>,
    current: Option<Record>,
}

struct Record {
    name: String,
    features: Vec<Feature>,
    sequence: Option<String>,
}

impl Parser {
    fn line(&mut self, line: &str, line_number: usize) -> CatalogResult<()> {
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        if line == "//" {
            return self.close_record(line_number);
        }

        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or("");
        match keyword {
            "allele" => {
                // An unterminated previous record is closed implicitly.
                self.close_open_record(line_number)?;
                let name = tokens.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(CatalogError::InvalidFeatureLine {
                        line: line_number,
                        message: "allele line has no name".to_string(),
                    });
                }
                if self.index.contains_key(&name) {
                    return Err(CatalogError::DuplicateAllele {
                        line: line_number,
                        name,
                    });
                }
                self.current = Some(Record {
                    name,
                    features: Vec::new(),
                    sequence: None,
                });
                Ok(())
            }
            "sequence" => match self.current.as_mut() {
                Some(record) => {
                    record.sequence = Some(String::new());
                    Ok(())
                }
                None => Err(CatalogError::UnknownKeyword {
                    line: line_number,
                    keyword: keyword.to_string(),
                }),
            },
            "UTR5" | "UTR3" | "Exon" | "Intron" | "PseudoExon" => {
                let feature = parse_feature(keyword, tokens, line_number)?;
                match self.current.as_mut() {
                    Some(record) if record.sequence.is_none() => {
                        record.features.push(feature);
                        Ok(())
                    }
                    _ => Err(CatalogError::InvalidFeatureLine {
                        line: line_number,
                        message: format!("feature line outside a record: '{}'", line),
                    }),
                }
            }
            _ => match self.current.as_mut() {
                // Inside a sequence block every line is sequence data.
                Some(record) => match record.sequence.as_mut() {
                    Some(sequence) => {
                        for b in line.bytes() {
                            if !is_dna_base(b) {
                                return Err(CatalogError::InvalidSequenceChar {
                                    line: line_number,
                                    chr: b as char,
                                });
                            }
                            sequence.push(b.to_ascii_uppercase() as char);
                        }
                        Ok(())
                    }
                    None => Err(CatalogError::UnknownKeyword {
                        line: line_number,
                        keyword: keyword.to_string(),
                    }),
                },
                None => Err(CatalogError::UnknownKeyword {
                    line: line_number,
                    keyword: keyword.to_string(),
                }),
            },
        }
    }

    fn close_record(&mut self, line_number: usize) -> CatalogResult<()> {
        match self.current.take() {
            Some(record) => {
                let allele = record.validate(line_number)?;
                self.index.insert(allele.name.clone(), self.alleles.len());
                self.alleles.push(allele);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn close_open_record(&mut self, line_number: usize) -> CatalogResult<()> {
        if self.current.is_some() {
            self.close_record(line_number)?;
        }
        Ok(())
    }

    fn finish(mut self, line_number: usize) -> CatalogResult<Catalog> {
        self.close_open_record(line_number)?;
        log::debug!("catalog loaded: {} alleles", self.alleles.len());
        Ok(Catalog {
            alleles: self.alleles,
            index: self.index,
        })
    }
}

impl Record {
    fn validate(self, line_number: usize) -> CatalogResult<ReferenceAllele> {
        let sequence = match self.sequence {
            Some(s) if !s.is_empty() => s,
            _ => {
                return Err(CatalogError::MissingSequence {
                    line: line_number,
                    name: self.name,
                })
            }
        };
        let invalid = |message: String| CatalogError::InvalidModel {
            name: self.name.clone(),
            message,
        };

        if self.features.is_empty() {
            return Err(invalid("no features".to_string()));
        }
        let first = &self.features[0];
        if first.kind != FeatureKind::Utr5 || first.span.start != 1 {
            return Err(invalid("model must open with a 5'UTR at position 1".to_string()));
        }
        let last = self.features.last().unwrap();
        if last.kind != FeatureKind::Utr3 || last.span.end != sequence.len() as i64 {
            return Err(invalid(format!(
                "model must close with a 3'UTR ending at {} (sequence length)",
                sequence.len()
            )));
        }
        let mut previous_end = 0i64;
        for feature in &self.features {
            if feature.span.end < feature.span.start {
                return Err(invalid(format!(
                    "{} interval {} is inverted",
                    feature.kind, feature.span
                )));
            }
            if feature.span.start <= previous_end {
                return Err(invalid(format!(
                    "{} interval {} overlaps the previous feature",
                    feature.kind, feature.span
                )));
            }
            previous_end = feature.span.end;
        }

        Ok(ReferenceAllele {
            name: self.name,
            features: self.features,
            sequence,
        })
    }
}

fn parse_feature<'a, I>(keyword: &str, mut tokens: I, line_number: usize) -> CatalogResult<Feature>
where
    I: Iterator<Item = &'a str>,
{
    let mut number = |field: &'static str| -> CatalogResult<i64> {
        let token = tokens.next().ok_or(CatalogError::InvalidFeatureLine {
            line: line_number,
            message: format!("missing {} field", field),
        })?;
        token
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(CatalogError::InvalidNumber {
                line: line_number,
                field,
                value: token.to_string(),
            })
    };

    let kind = match keyword {
        "UTR5" => FeatureKind::Utr5,
        "UTR3" => FeatureKind::Utr3,
        "Exon" => FeatureKind::Exon(number("ordinal")? as u8),
        "Intron" => FeatureKind::Intron(number("ordinal")? as u8),
        "PseudoExon" => FeatureKind::PseudoExon(number("ordinal")? as u8),
        _ => unreachable!("caller matched the keyword"),
    };
    let start = number("start")?;
    let end = number("end")?;
    Ok(Feature::new(kind, start, end))
}
