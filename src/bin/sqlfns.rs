//! sqlfns — call SQL files as functions
//!
//! # Usage
//!
//! ```bash
//! # What would be generated from ./sql
//! sqlfns list
//!
//! # Print one statement
//! sqlfns show findOnePersonById
//!
//! # Run one
//! sqlfns call findOnePersonById --bind 12345 --database-url postgres://localhost/app
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use sqlfns::prelude::*;
use sqlfns::registry::StatementRegistry;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlfns")]
#[command(version)]
#[command(about = "Call a directory of SQL files as functions", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlfns list --dir sql
    sqlfns show createOnePerson
    sqlfns call findAllPersonsByFirstName --bind John --format json")]
struct Cli {
    /// Statement directory (defaults to the config file's statements_dir)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Configuration file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, global = true, env = "SQLFNS_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List statements and their resolved policy
    List,
    /// Print the text of one statement
    Show {
        /// Statement name
        name: String,
    },
    /// Execute one generated function
    Call {
        /// Statement name
        name: String,

        /// Parameter bindings ($1, $2, etc.)
        #[arg(short, long, value_delimiter = ',')]
        bind: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlfns=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SqlFnsConfig::load(path)?,
        None => SqlFnsConfig::load_default()?,
    };
    let dir = cli.dir.clone().unwrap_or_else(|| config.statements_dir.clone());
    let policy = config.policy();

    match &cli.command {
        Commands::List => list_statements(&dir, &policy),
        Commands::Show { name } => {
            let registry = StatementRegistry::load(&dir)?;
            let stmt = registry
                .get(name)
                .ok_or_else(|| SqlFnError::UnknownStatement(name.clone()))?;
            println!("{}", stmt.text.trim_end());
            Ok(())
        }
        Commands::Call { name, bind, format } => {
            let url = cli
                .database_url
                .clone()
                .or_else(|| config.database_url.clone())
                .context("No database URL. Use --database-url, set SQLFNS_DATABASE_URL, or add database_url to the config file")?;

            let session = SessionManager::connect(&url, &config.pool).await?;
            let fns = generate(&session, &dir, &policy)?;
            let params: Vec<SqlValue> = bind.iter().map(|b| SqlValue::parse_literal(b)).collect();

            let output = fns.call(name, params).await?;
            format_output(output, format);
            Ok(())
        }
    }
}

fn list_statements(dir: &Path, policy: &PolicyConfig) -> anyhow::Result<()> {
    let registry = StatementRegistry::load(dir)?;
    if registry.is_empty() {
        println!("{}", format!("(no .sql files in {})", dir.display()).dimmed());
        return Ok(());
    }

    let width = registry.iter().map(|s| s.name.len()).max().unwrap_or(0);
    println!(
        "{:width$}  {:6}  {}",
        "Statement".white().bold(),
        "Tx".white().bold(),
        "Returns".white().bold(),
        width = width
    );
    println!("{}", "─".repeat(width + 18).dimmed());

    for stmt in registry.iter() {
        let p = policy.resolve(&stmt.name, &stmt.text);
        let tx = if p.transactional { "yes".yellow() } else { "no".normal() };
        let shape = if p.single_result { "one".cyan() } else { "many".normal() };
        println!("{:width$}  {:6}  {}", stmt.name, tx, shape, width = width);
    }
    Ok(())
}

fn format_output(output: Output, format: &OutputFormat) {
    let results = match output {
        Output::Single(None) => {
            println!("{}", "(no result)".dimmed());
            return;
        }
        other => other.into_many(),
    };

    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results).unwrap_or_default());
        }
        OutputFormat::Table => {
            // Union of column names, sorted for a stable layout
            let columns: Vec<&String> = results
                .iter()
                .flat_map(|row| row.keys())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let widths: Vec<usize> = columns
                .iter()
                .map(|c| {
                    results
                        .iter()
                        .filter_map(|row| row.get(*c))
                        .map(|v| val_to_string(v).len())
                        .fold(c.len(), usize::max)
                })
                .collect();

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = *w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in &results {
                let cells: Vec<String> = columns
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| {
                        let val = row.get(*c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = *w)
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}
