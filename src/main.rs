mod db;
mod document;
mod error;
mod parser;
mod record;
mod reference;
mod settings;
mod skills;
mod titles;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::document::Document;
use crate::error::StoreError;
use crate::parser::Pipeline;
use crate::record::JobRecord;
use crate::reference::ReferenceData;
use crate::settings::Settings;
use crate::skills::{LexicalSimilarity, RuleTokenizer, SemanticSimilarity, SkillAnnotator, TaxonomyMatcher, WordVectors};
use crate::titles::salary::{FileSalarySource, HttpSalarySource, NoSalaryData, SalarySource};
use crate::titles::{TitleNormalizer, TokenSortRatio};

#[derive(Parser)]
#[command(name = "jobs_pipeline", about = "Turn fetched job postings into structured records")]
struct Cli {
    /// Settings file (default: ./jobs_pipeline.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from a JSON Lines file of documents and upsert them
    Process {
        /// One document per line
        #[arg(short, long)]
        input: PathBuf,
        /// Max documents to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Also write the records as JSON Lines
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show column completeness and value distributions
    Stats,
    /// Stored postings table
    Overview {
        /// Filter by flexibility (Remote, Hybrid, On-site, Undefined)
        #[arg(short, long)]
        flexibility: Option<String>,
        /// Filter by employment type (e.g. "Full-Time")
        #[arg(short, long)]
        employment_type: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Process { input, limit, output } => {
            let reference = ReferenceData::load(&settings).context("Failed to load reference data")?;
            let pipeline = build_pipeline(&settings, &reference)?;

            let file = File::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            let docs = read_documents(BufReader::new(file), limit)?;
            if docs.is_empty() {
                println!("No documents in {}.", input.display());
                return Ok(());
            }

            let conn = db::connect(&settings.db_path)?;
            println!("Processing {} documents...", docs.len());
            let counts = process_documents(&conn, &pipeline, &docs, output.as_deref())?;
            counts.print();
            Ok(())
        }
        Commands::Overview {
            flexibility,
            employment_type,
            limit,
        } => {
            let conn = db::connect(&settings.db_path)?;
            let rows = db::fetch_overview(
                &conn,
                flexibility.as_deref(),
                employment_type.as_deref(),
                limit,
            )?;
            if rows.is_empty() {
                println!("No postings found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<28} | {:<20} | {:<18} | {:<10} | {:<9} | {:<22} | {:>9}",
                "#", "Title", "Company", "Location", "Type", "Mode", "Mapped", "Mean/mo"
            );
            println!("{}", "-".repeat(138));

            for (i, r) in rows.iter().enumerate() {
                let salary = r
                    .mean_salary
                    .map(|s| format!("{:.0}", s))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<28} | {:<20} | {:<18} | {:<10} | {:<9} | {:<22} | {:>9}",
                    i + 1,
                    truncate(&r.job_title, 28),
                    truncate(&r.company, 20),
                    truncate(&r.location, 18),
                    truncate(&r.employment_type, 10),
                    r.job_flexibility,
                    truncate(&r.mapped_title, 22),
                    salary
                );
            }

            println!("\n--- Links ---");
            for (i, r) in rows.iter().enumerate() {
                println!("{:>3}  {}", i + 1, r.job_link);
            }

            println!("\n{} postings", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            let s = db::get_stats(&conn)?;
            println!("Total: {}", s.total);
            if s.total == 0 {
                return Ok(());
            }
            println!("\n--- Completeness ---");
            for (column, filled) in &s.completeness {
                println!(
                    "  {:<16} {:>7} ({:>5.1}%)",
                    column,
                    filled,
                    *filled as f64 * 100.0 / s.total as f64
                );
            }
            println!("\n--- Flexibility ---");
            for (value, n) in &s.flexibility {
                println!("  {:<16} {:>7}", value, n);
            }
            println!("\n--- Employment type ---");
            for (value, n) in &s.employment_type {
                println!("  {:<16} {:>7}", value, n);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Wire the production capabilities. A configured vectors file that fails
/// to load is fatal; without one the lexical similarity is used.
fn build_pipeline<'r>(settings: &Settings, reference: &'r ReferenceData) -> anyhow::Result<Pipeline<'r>> {
    let similarity: Box<dyn SemanticSimilarity> = match &settings.skills.vectors_path {
        Some(path) => Box::new(WordVectors::load(path)?),
        None => {
            info!("No word vectors configured, using lexical similarity");
            Box::new(LexicalSimilarity)
        }
    };
    let skills = SkillAnnotator::new(
        Box::new(RuleTokenizer),
        similarity,
        Box::new(TaxonomyMatcher::new(&reference.taxonomy, settings.skills.ngram_threshold)),
    );

    let salary: Box<dyn SalarySource> = match (&settings.salary.histogram_path, &settings.salary.base_url) {
        (Some(path), _) if path.exists() => Box::new(FileSalarySource::load(path)?),
        (_, Some(url)) => Box::new(HttpSalarySource::new(
            url,
            Duration::from_secs(settings.salary.timeout_secs),
        )?),
        _ => {
            warn!("No salary source configured, salary columns will be empty");
            Box::new(NoSalaryData)
        }
    };
    let titles = TitleNormalizer::new(Box::new(TokenSortRatio), salary);

    Ok(Pipeline::new(reference, skills, titles))
}

fn read_documents<R: std::io::BufRead>(reader: R, limit: Option<usize>) -> anyhow::Result<Vec<Document>> {
    let mut docs = Vec::new();
    let mut skipped = 0;
    for item in document::read_jsonl(reader, limit)? {
        match item {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                warn!("Skipping document: {}", e);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "Some input lines were not valid documents");
    }
    Ok(docs)
}

#[derive(Default)]
struct ProcessCounts {
    records: usize,
    inserted: usize,
    replaced: usize,
    partial: usize,
    company: usize,
    required: usize,
    preferred: usize,
}

impl ProcessCounts {
    fn tally(&mut self, records: &[JobRecord]) {
        self.records += records.len();
        for r in records {
            self.company += usize::from(r.company_description.is_some());
            self.required += usize::from(r.required_qualifications.is_some());
            self.preferred += usize::from(r.preferred_qualifications.is_some());
        }
    }

    /// Section completeness as `label found/total (pct%)`.
    fn section_lines(&self) -> Vec<String> {
        [
            ("Company description", self.company),
            ("Required quals", self.required),
            ("Preferred quals", self.preferred),
        ]
        .iter()
        .map(|(label, found)| {
            let pct = if self.records == 0 {
                0.0
            } else {
                *found as f64 * 100.0 / self.records as f64
            };
            format!("  {:<20} {}/{} ({:.1}%)", label, found, self.records, pct)
        })
        .collect()
    }

    fn print(&self) {
        println!(
            "Extracted {} records: {} rows written, {} replaced, {} lost to partial upserts.",
            self.records, self.inserted, self.replaced, self.partial,
        );
        println!("\n--- Sections ---");
        for line in self.section_lines() {
            println!("{}", line);
        }
    }
}

fn process_documents(
    conn: &rusqlite::Connection,
    pipeline: &Pipeline<'_>,
    docs: &[Document],
    output: Option<&Path>,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut out = match output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => None,
    };

    let mut counts = ProcessCounts::default();

    for chunk in docs.chunks(500) {
        let records = extract_chunk(pipeline, chunk);
        counts.tally(&records);

        if let Some(w) = out.as_mut() {
            for r in &records {
                serde_json::to_writer(&mut *w, r)?;
                w.write_all(b"\n")?;
            }
        }

        match db::upsert_records(conn, &records) {
            Ok(report) => {
                if report.created_table {
                    info!("Created table {}", db::TABLE);
                }
                counts.inserted += report.inserted;
                counts.replaced += report.deleted;
            }
            Err(StoreError::PartialUpsert { keys, source }) => {
                warn!(keys, "Insert failed after delete, rows missing until re-ingest: {}", source);
                counts.partial += keys;
            }
            Err(e) => return Err(e.into()),
        }
        pb.inc(chunk.len() as u64);
    }

    if let Some(mut w) = out {
        w.flush()?;
    }
    pb.finish_and_clear();
    Ok(counts)
}

#[cfg(feature = "rayon")]
fn extract_chunk(pipeline: &Pipeline<'_>, chunk: &[Document]) -> Vec<JobRecord> {
    use rayon::prelude::*;
    chunk.par_iter().map(|d| pipeline.process(d)).collect()
}

#[cfg(not(feature = "rayon"))]
fn extract_chunk(pipeline: &Pipeline<'_>, chunk: &[Document]) -> Vec<JobRecord> {
    chunk.iter().map(|d| pipeline.process(d)).collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn record(company: bool, required: bool, preferred: bool) -> JobRecord {
        let text = |on: bool| on.then(|| "section text".to_string());
        JobRecord {
            job_link: "https://jobs.example/view/1".into(),
            company_description: text(company),
            required_qualifications: text(required),
            preferred_qualifications: text(preferred),
            ..Default::default()
        }
    }

    #[test]
    fn section_completeness_is_counted() {
        let mut counts = ProcessCounts::default();
        counts.tally(&[record(true, true, false), record(false, true, false)]);
        counts.tally(&[record(true, true, true), record(false, false, false)]);

        assert_eq!(counts.records, 4);
        assert_eq!((counts.company, counts.required, counts.preferred), (2, 3, 1));
        assert_eq!(
            counts.section_lines(),
            vec![
                "  Company description  2/4 (50.0%)",
                "  Required quals       3/4 (75.0%)",
                "  Preferred quals      1/4 (25.0%)",
            ]
        );
    }

    #[test]
    fn empty_run_reports_zero_percent() {
        let counts = ProcessCounts::default();
        assert_eq!(counts.section_lines()[0], "  Company description  0/0 (0.0%)");
    }

    #[test]
    fn durations_and_truncation() {
        assert_eq!(format_duration(Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
        assert_eq!(truncate("Senior Data Analyst", 6), "Senior...");
        assert_eq!(truncate("Analyst", 7), "Analyst");
    }
}
