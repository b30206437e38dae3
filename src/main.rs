//! AlleleResolver CLI entry point
//!
//! Characterizes novel immunogene alleles against a reference catalog.

use allele_resolver::core::DiffKind;
use allele_resolver::{read_fasta, Catalog, ResolveError, Resolution, Resolver};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "allele-resolver")]
#[command(about = "Feature annotation and IMGT-coordinate differences for novel alleles")]
#[command(version)]
#[command(author = "AlleleResolver Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve query sequences against the catalog
    Resolve {
        /// Reference catalog file (plain, .gz or .bz2)
        catalog: PathBuf,
        /// Query sequences in FASTA format
        input: PathBuf,
        /// Resolve against this allele instead of the closest hit
        #[arg(short = 'a', long)]
        allele: Option<String>,
        /// Accept sequences that do not cover the full reference
        #[arg(long = "tolerate-incomplete")]
        tolerate_incomplete: bool,
        /// Number of threads for batch resolution
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,
    },
    /// Print a summary of a catalog file
    Inspect {
        /// Reference catalog file (plain, .gz or .bz2)
        catalog: PathBuf,
    },
}

fn load_catalog(path: &PathBuf) -> anyhow::Result<Catalog> {
    let start = Instant::now();
    eprintln!("Loading catalog: {:?}", path);
    let catalog = Catalog::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load catalog: {}", e))?;
    eprintln!(
        "Catalog loaded: {} alleles in {:.2}s",
        catalog.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(catalog)
}

fn print_resolution(id: &str, resolution: &Resolution) {
    println!(">{}", id);
    println!(
        "closest allele: {}{}",
        resolution.closest_allele,
        if resolution.exact_match { " (exact match)" } else { "" }
    );
    if resolution.missing_bp > 0 || resolution.missing_bp_end > 0 {
        println!(
            "incomplete: {} bp missing at 5', {} bp at 3'",
            resolution.missing_bp, resolution.missing_bp_end
        );
    }

    println!("features:");
    for ((kind, span), imgt) in resolution
        .features
        .iter()
        .zip(&resolution.coordinates)
        .zip(&resolution.imgt_coordinates)
    {
        println!("  {:<14} {:>14}  imgt {:>14}", kind.to_string(), span.to_string(), imgt.to_string());
    }

    if resolution.imgt_differences.is_empty() {
        println!("differences: none");
        return;
    }
    println!("differences:");
    for difference in &resolution.imgt_differences {
        let location = match difference.cds_position {
            Some(cds) => format!("CDS {}", cds),
            None => format!("non-coding {}", difference.imgt_position),
        };
        let bases = match difference.kind {
            DiffKind::Mismatch => format!(
                "{}>{}",
                difference.reference_base.unwrap_or('?'),
                difference.base
            ),
            _ => difference.base.to_string(),
        };
        let codon = match &difference.mm_codon {
            Some(mm) => format!("  codon {} {}>{}", mm.codon, mm.reference, mm.novel),
            None => String::new(),
        };
        println!(
            "  {:<9} pos {:>6}  {}  {}{}",
            difference.kind.to_string(),
            difference.genomic_position,
            location,
            bases,
            codon
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Resolve {
            catalog,
            input,
            allele,
            tolerate_incomplete,
            threads,
        } => {
            let catalog = load_catalog(&catalog)?;
            let resolver = Resolver::new(catalog);
            let queries = read_fasta(&input)
                .map_err(|e| anyhow::anyhow!("Failed to read queries: {}", e))?;
            eprintln!("Resolving {} queries from {:?}", queries.len(), input);

            let results: Vec<(String, Result<Resolution, ResolveError>)> = match &allele {
                Some(name) => queries
                    .iter()
                    .map(|record| {
                        let result = match allele_resolver::best_hit(
                            &record.sequence,
                            resolver.catalog().iter().filter(|a| &a.name == name),
                        ) {
                            Some((_, hit)) => resolver.resolve(
                                hit,
                                &record.sequence,
                                name,
                                tolerate_incomplete,
                            ),
                            None => Err(ResolveError::UnknownAllele(name.clone())),
                        };
                        (record.id.clone(), result)
                    })
                    .collect(),
                None => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()?;
                    let pairs: Vec<(String, String)> = queries
                        .iter()
                        .map(|r| (r.id.clone(), r.sequence.clone()))
                        .collect();
                    pool.install(|| resolver.resolve_batch(&pairs, tolerate_incomplete))
                }
            };

            let mut failed = 0usize;
            for (id, result) in &results {
                match result {
                    Ok(resolution) => print_resolution(id, resolution),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {}", id, e);
                    }
                }
            }

            eprintln!("\n=== Resolution Statistics ===");
            eprintln!("Total queries:   {}", results.len());
            eprintln!("Successful:      {}", results.len() - failed);
            eprintln!("Failed:          {}", failed);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Inspect { catalog } => {
            let catalog = load_catalog(&catalog)?;
            for allele in catalog.iter() {
                let exons = allele.features.iter().filter(|f| f.kind.is_exon()).count();
                println!(
                    "{}\t{} bp\t{} features\t{} exons\tCDS {} bp",
                    allele.name,
                    allele.sequence.len(),
                    allele.features.len(),
                    exons,
                    allele.cds().len()
                );
            }
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
