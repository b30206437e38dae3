//! Minimal FASTA reading for query sequences
//!
//! Permissive single-pass parser: headers start with `>`, the record id is
//! the header up to the first space, sequence lines may be wrapped and are
//! uppercased. Compressed files are handled the same way as catalogs.

use crate::catalog::{is_dna_base, open_reader};
use crate::core::{CatalogError, CatalogResult};
use memchr::memchr;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One FASTA record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub sequence: String,
}

/// Read all records from a FASTA file (plain, gzip or bzip2)
pub fn read_fasta<P: AsRef<Path>>(path: P) -> CatalogResult<Vec<FastaRecord>> {
    let reader = open_reader(path.as_ref())?;
    parse_fasta_reader(reader)
}

/// Parse FASTA records from bytes (for testing)
pub fn parse_fasta_bytes(data: &[u8]) -> CatalogResult<Vec<FastaRecord>> {
    parse_fasta_reader(BufReader::new(data))
}

/// Parse FASTA records from any buffered reader
pub fn parse_fasta_reader<R: BufRead>(reader: R) -> CatalogResult<Vec<FastaRecord>> {
    let mut records: Vec<FastaRecord> = Vec::new();
    let mut line_number = 0usize;

    for line_result in reader.lines() {
        line_number += 1;
        let line = line_result?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            let bytes = header.as_bytes();
            let id_end = memchr(b' ', bytes).unwrap_or(bytes.len());
            let id = header[..id_end].to_string();
            if id.is_empty() {
                return Err(CatalogError::InvalidFasta {
                    line: line_number,
                    message: "header has no id".to_string(),
                });
            }
            records.push(FastaRecord {
                id,
                sequence: String::new(),
            });
        } else {
            let record = records.last_mut().ok_or(CatalogError::InvalidFasta {
                line: line_number,
                message: "sequence data before the first header".to_string(),
            })?;
            for b in line.bytes() {
                if !is_dna_base(b) {
                    return Err(CatalogError::InvalidSequenceChar {
                        line: line_number,
                        chr: b as char,
                    });
                }
                record.sequence.push(b.to_ascii_uppercase() as char);
            }
        }
    }

    Ok(records)
}
