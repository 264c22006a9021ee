mod db;
mod error;
mod export;
mod loader;
mod normalize;
mod outline;
mod parser;
mod settings;
mod validate;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use error::PipelineError;
use outline::OutlineDocument;
use settings::Settings;

const RAW_JSON: &str = "outline_structured_data.json";
const VALIDATED_JSON: &str = "validated_data.json";
const STATISTICS_JSON: &str = "statistics.json";

#[derive(Parser)]
#[command(name = "exam_outline", about = "Exam outline extractor and loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file (overrides OUTLINE_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory for JSON/CSV artifacts (overrides OUTLINE_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Expected exam code (overrides OUTLINE_EXAM_CODE)
    #[arg(long, global = true)]
    exam_code: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the raw outline from an .html/.htm/.pdf study guide
    Extract {
        input: PathBuf,
        /// Exam title for PDF input (ignored for HTML, which carries its own)
        #[arg(long)]
        title: Option<String>,
    },
    /// Validate a raw outline JSON, normalize it, and export CSV + statistics
    Validate { json_file: PathBuf },
    /// Load a normalized outline JSON into SQLite
    Import { json_file: PathBuf },
    /// Extract + validate + normalize + export (+ load) in one pass
    Run {
        input: PathBuf,
        /// Exam title for PDF input (ignored for HTML)
        #[arg(long)]
        title: Option<String>,
        /// Stop after writing JSON/CSV artifacts
        #[arg(long)]
        skip_import: bool,
    },
    /// Run canned reports against the loaded outline
    Report {
        /// Report to run (default: all)
        #[arg(short, long, value_enum)]
        report: Option<db::Report>,
        /// Topic for the topic-skills report
        #[arg(long, default_value = "TOPIC-001")]
        topic_id: String,
        /// Keyword for the search report (repeatable)
        #[arg(short, long = "keyword", default_values_t = ["responsible ai".to_string(), "ethical".to_string()])]
        keywords: Vec<String>,
    },
    /// Show row counts per table
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(p) = cli.database {
        settings.database_path = p;
    }
    if let Some(d) = cli.output_dir {
        settings.output_dir = d;
    }
    if let Some(c) = cli.exam_code {
        settings.exam_code = c;
    }
    info!(settings = ?settings, "Starting exam outline pipeline");

    let result = match cli.command {
        Commands::Extract { input, title } => {
            let raw = extract_file(&input, &settings, title)?;
            print_summary(&raw);
            let out = write_json(&settings.output_dir.join(RAW_JSON), &raw)?;
            println!("Output saved to: {}", out.display());
            Ok(())
        }
        Commands::Validate { json_file } => {
            let data = read_json(&json_file)?;
            let canonical = validate::validate_and_normalize(&data, &settings.exam_code)?;
            write_artifacts(&canonical, &settings.output_dir)?;
            Ok(())
        }
        Commands::Import { json_file } => {
            let data = read_json(&json_file)?;
            let doc: OutlineDocument =
                serde_json::from_value(data).context("Not a normalized outline document")?;
            import(&doc, &settings)
        }
        Commands::Run {
            input,
            title,
            skip_import,
        } => {
            let raw = extract_file(&input, &settings, title)?;
            print_summary(&raw);
            write_json(&settings.output_dir.join(RAW_JSON), &raw)?;

            let data = serde_json::to_value(&raw)?;
            let canonical = validate::validate_and_normalize(&data, &settings.exam_code)?;
            write_artifacts(&canonical, &settings.output_dir)?;

            if skip_import {
                return Ok(());
            }
            import(&canonical, &settings)
        }
        Commands::Report {
            report,
            topic_id,
            keywords,
        } => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            let params = db::ReportParams {
                topic_id: &topic_id,
                keywords: &keywords,
            };
            let reports = match report {
                Some(r) => vec![r],
                None => db::Report::ALL.to_vec(),
            };
            for r in reports {
                db::run_report(&conn, r, &params)?.print(r.title());
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            let c = db::get_counts(&conn)?;
            println!("Topics:     {}", c.topics);
            println!("Skills:     {}", c.skills);
            println!("Sub-skills: {}", c.sub_skills);
            println!("Changes:    {}", c.changes);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn extract_file(input: &Path, settings: &Settings, title: Option<String>) -> Result<OutlineDocument> {
    println!("Parsing {}...", input.display());
    let loaded = loader::load(input)?;
    let extraction_date = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    let source_file = input.to_string_lossy();
    Ok(parser::extract(
        &loaded,
        &parser::ExtractOptions {
            exam_code: &settings.exam_code,
            source_file: &source_file,
            extraction_date: &extraction_date,
            title,
        },
    ))
}

fn write_artifacts(canonical: &OutlineDocument, dir: &Path) -> Result<()> {
    let json = write_json(&dir.join(VALIDATED_JSON), canonical)?;
    println!("Saved: {}", json.display());

    let (subs, changes) = export::export_csv(canonical, dir)?;
    println!("Saved: {}", subs.display());
    println!("Saved: {}", changes.display());
    export::check_round_trip(canonical, &subs)?;

    let stats = export::statistics(canonical);
    write_json(&dir.join(STATISTICS_JSON), &stats)?;
    println!("\n=== STATISTICS ===");
    stats.print();
    Ok(())
}

fn import(doc: &OutlineDocument, settings: &Settings) -> Result<()> {
    println!("\nImporting to {}...", settings.database_path.display());
    let conn = db::connect(&settings.database_path)?;
    db::init_schema(&conn)?;
    let counts = db::save_outline(&conn, doc)?;
    counts.print();
    Ok(())
}

fn print_summary(doc: &OutlineDocument) {
    println!("Topic areas found: {}", doc.topic_areas.len());
    println!("Change log entries: {}", doc.change_log.len());
    for topic in &doc.topic_areas {
        println!("  • {} ({})", topic.topic_area, topic.percentage_weight);
        println!("    Skills: {}", topic.skills.len());
        println!("    Sub-skills: {}", topic.sub_skill_count());
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        return Err(PipelineError::NotFound(path.to_path_buf()).into());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path.to_path_buf())
}
