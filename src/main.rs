mod ocr;
mod parser;
mod scan;
mod upload;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::scan::{Outcome, ScanReport};

#[derive(Parser)]
#[command(name = "card_scanner", about = "Read card names and copyright lines from card photos via AWS Textract")]
struct Cli {
    /// AWS region for Textract
    #[arg(long, global = true, env = "AWS_REGION", default_value = ocr::DEFAULT_REGION)]
    region: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR card photos (JPEG/PNG) and extract name + date
    Scan {
        /// Image files, scanned in the order given
        images: Vec<PathBuf>,
        /// Print full JSON results instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Classify saved OCR output (Textract JSON or one line per row) offline
    Classify {
        files: Vec<PathBuf>,
        /// Print full JSON results instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Verify AWS credentials and Textract access
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keys usually live in .env.local; real environment wins over both files
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan { images, json } => {
            let engine = ocr::TextractEngine::connect(&cli.region).await;
            let reports = scan::scan_images(&engine, &images).await?;
            print_reports(&reports, json)?;
            if reports.iter().all(|r| r.is_failed()) {
                bail!("All {} images failed", reports.len());
            }
            Ok(())
        }
        Commands::Classify { files, json } => {
            let reports = scan::classify_files(&files)?;
            print_reports(&reports, json)?;
            if reports.iter().all(|r| r.is_failed()) {
                bail!("All {} files failed", reports.len());
            }
            Ok(())
        }
        Commands::Check => run_check(&cli.region).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_check(region: &str) -> anyhow::Result<()> {
    println!("=== AWS CREDENTIALS ===");
    println!("AWS_REGION:                {}", region);
    match std::env::var("AWS_ACCESS_KEY_ID") {
        Ok(key) => {
            let prefix: String = key.chars().take(4).collect();
            println!("AWS_ACCESS_KEY_ID:         set ({}...)", prefix);
        }
        Err(_) => println!("AWS_ACCESS_KEY_ID:         not set (falling back to profile/role)"),
    }
    match std::env::var("AWS_SECRET_ACCESS_KEY") {
        Ok(secret) => println!("AWS_SECRET_ACCESS_KEY:     set (length {})", secret.len()),
        Err(_) => println!("AWS_SECRET_ACCESS_KEY:     not set"),
    }

    println!("\nTesting Textract connection...");
    let engine = ocr::TextractEngine::connect(region).await;
    match engine.probe().await {
        Ok(blocks) => {
            println!("OK: Textract is reachable ({} blocks returned)", blocks);
            Ok(())
        }
        Err(failure) => {
            println!(
                "FAILED: {} {}",
                failure.code.as_deref().unwrap_or("(no error code)"),
                failure.message
            );
            if let Some(hint) = failure.hint() {
                println!("\nFix: {}", hint);
            }
            bail!("Textract check failed")
        }
    }
}

fn print_reports(reports: &[ScanReport], json: bool) -> anyhow::Result<()> {
    if json {
        for r in reports {
            println!("{}", serde_json::to_string_pretty(r)?);
        }
        return Ok(());
    }

    println!(
        "{:>3} | {:<24} | {:<20} | {:<40} | {:>5}",
        "#", "File", "Name", "Date", "Lines"
    );
    println!("{}", "-".repeat(104));

    for (i, r) in reports.iter().enumerate() {
        let file = truncate(&r.file, 24);
        match &r.outcome {
            Outcome::Scanned(s) => println!(
                "{:>3} | {:<24} | {:<20} | {:<40} | {:>5}",
                i + 1,
                file,
                truncate(&s.name, 20),
                truncate(&s.date, 40),
                s.lines.len()
            ),
            Outcome::Failed { error } => {
                println!("{:>3} | {:<24} | ERROR: {}", i + 1, file, truncate(error, 70))
            }
        }
    }

    let failed = reports.iter().filter(|r| r.is_failed()).count();
    println!("\n{} scanned | {} failed", reports.len() - failed, failed);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
