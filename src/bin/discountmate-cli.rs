use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use discountmate_api::observability::sink::{read_records, MODEL_LOG, QUERY_LOG, REQUEST_LOG};
use discountmate_api::observability::summary::summarize;

#[derive(Parser)]
#[command(name = "discountmate-cli")]
#[command(about = "Inspect a DiscountMate API server and its logs", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Status,
    /// Print the most recent records of a log file
    Logs {
        #[arg(value_enum)]
        kind: LogKind,
        /// Log directory
        #[arg(short, long, default_value = "logs")]
        dir: PathBuf,
        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Summarise slow operations by model hook and collection method
    Slow {
        /// Log directory
        #[arg(short, long, default_value = "logs")]
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogKind {
    Requests,
    Models,
    Queries,
}

impl LogKind {
    fn file(self) -> &'static str {
        match self {
            LogKind::Requests => REQUEST_LOG,
            LogKind::Models => MODEL_LOG,
            LogKind::Queries => QUERY_LOG,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => {
            let res = reqwest::Client::new()
                .get(format!("{}/health", cli.url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Logs { kind, dir, limit } => {
            let records = load(&dir, kind.file())?;
            let skip = records.len().saturating_sub(limit);
            for record in &records[skip..] {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
        }
        Commands::Slow { dir } => {
            for file in [MODEL_LOG, QUERY_LOG] {
                let records = load(&dir, file)?;
                println!("{} ({} records)", file, records.len());
                println!("{:<40} {:>7} {:>7} {:>10} {:>10}", "operation", "count", "errors", "max_ms", "mean_ms");
                for row in summarize(&records) {
                    println!(
                        "{:<40} {:>7} {:>7} {:>10.2} {:>10.2}",
                        row.operation, row.count, row.errors, row.max_ms, row.mean_ms
                    );
                }
                println!();
            }
        }
    }

    Ok(())
}

/// Records of one log file; a file that does not exist yet reads as empty.
fn load(dir: &Path, file: &str) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let path = dir.join(file);
    match read_records(&path) {
        Ok(records) => Ok(records),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(format!("{}: {}", path.display(), e).into()),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
