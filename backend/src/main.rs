//! Carteira CLI - Normalize brokerage position workbooks
//!
//! # Main Commands
//!
//! ```bash
//! carteira normalize posicao.xlsx          # Normalize to JSON records
//! carteira normalize posicao.xlsx --export .  # ...and write posicao-processada-<date>.xlsx
//! carteira export records.json             # JSON records -> workbook
//! carteira serve                           # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! carteira parse posicao.xlsx              # Raw sheets/rows as JSON
//! carteira routes                          # Print the built-in routing table
//! carteira routes --validate routes.json   # Check a routing table file
//! ```

use carteira::server::{DEFAULT_PORT, PORT_ENV};
use carteira::{
    default_routing_table, export_as, normalize_file, parse_workbook_file, ExportFormat,
    ExportOutcome, NormalizeOptions, PositionRecord, RoutingTable,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "carteira")]
#[command(about = "Normalize brokerage position workbooks for portfolio import", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a brokerage workbook into position records
    Normalize {
        /// Input workbook (.xlsx or .xls)
        input: PathBuf,

        /// Routing table JSON (default: built-in, or CARTEIRA_ROUTES)
        #[arg(short, long)]
        routes: Option<PathBuf>,

        /// Output file for JSON records (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the dated export file into this directory
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Xlsx)]
        format: ExportFormat,
    },

    /// Export JSON records (as produced by `normalize`) to a workbook
    Export {
        /// Input JSON file (array of records)
        input: PathBuf,

        /// Output file (default: posicao-processada-<date>.<ext> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Xlsx)]
        format: ExportFormat,
    },

    /// Parse a workbook and output its sheets as JSON
    Parse {
        /// Input workbook
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the built-in routing table, or validate a table file
    Routes {
        /// Routing table JSON to validate
        #[arg(long)]
        validate: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: CARTEIRA_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Routing table JSON (default: built-in, or CARTEIRA_ROUTES)
        #[arg(short, long)]
        routes: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Normalize {
            input,
            routes,
            output,
            export,
            format,
        } => {
            cmd_normalize(
                &input,
                options_with(routes),
                output.as_deref(),
                export.as_deref(),
                format,
            )
            .await
        }

        Commands::Export {
            input,
            output,
            format,
        } => cmd_export(&input, output.as_deref(), format),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Routes { validate } => cmd_routes(validate.as_deref()),

        Commands::Serve { port, routes } => cmd_serve(port, options_with(routes)).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// `--routes` wins over `CARTEIRA_ROUTES`.
fn options_with(routes: Option<PathBuf>) -> NormalizeOptions {
    match routes {
        Some(path) => NormalizeOptions {
            routes_path: Some(path.to_string_lossy().to_string()),
        },
        None => NormalizeOptions::from_env(),
    }
}

async fn cmd_normalize(
    input: &Path,
    options: NormalizeOptions,
    output: Option<&Path>,
    export_dir: Option<&Path>,
    format: ExportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let result = normalize_file(input, options).await?;

    eprintln!("\n⚙️  Normalized: {} position records", result.count);

    if let Some(dir) = export_dir {
        write_export(&result.records, format, dir, None)?;
    }

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_export(
    input: &Path,
    output: Option<&Path>,
    format: ExportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📦 Exporting: {}", input.display());

    let content = fs::read_to_string(input)?;
    let records: Vec<PositionRecord> = serde_json::from_str(&content)?;
    eprintln!("   {} records", records.len());

    write_export(&records, format, Path::new("."), output)
}

/// Export records; `file` overrides the dated name inside `dir`.
fn write_export(
    records: &[PositionRecord],
    format: ExportFormat,
    dir: &Path,
    file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = chrono::Local::now().date_naive();

    match export_as(records, format, today)? {
        ExportOutcome::NothingToExport => {
            eprintln!("ℹ️  Nothing to export");
        }
        ExportOutcome::Exported(artifact) => {
            let path = match file {
                Some(p) => p.to_path_buf(),
                None => dir.join(&artifact.file_name),
            };
            fs::write(&path, &artifact.bytes)?;
            eprintln!("💾 Export written to: {}", path.display());
        }
    }

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing workbook: {}", input.display());

    let result = parse_workbook_file(input)?;

    eprintln!("   Format: {}", result.format);
    for sheet in &result.workbook.sheets {
        eprintln!("   Sheet '{}': {} rows", sheet.name, sheet.rows.len());
        eprintln!("      Columns: {}", sheet.headers.join(", "));
    }

    let json = serde_json::to_string_pretty(&result.workbook)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_routes(validate: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match validate {
        Some(path) => {
            eprintln!("✔️  Validating: {}", path.display());
            let table = RoutingTable::load(path)?;
            eprintln!("✅ Valid routing table with {} rules", table.rules.len());
            for rule in &table.rules {
                eprintln!(
                    "   [{}] → {} (value: {})",
                    rule.sheets.join(" | "),
                    rule.asset_type,
                    rule.value_columns.join(" → ")
                );
            }
        }
        None => {
            println!("{}", default_routing_table().to_json()?);
        }
    }
    Ok(())
}

async fn cmd_serve(
    port: Option<u16>,
    options: NormalizeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = match port {
        Some(p) => p,
        None => match std::env::var(PORT_ENV) {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| format!("{} is not a valid port: {}", PORT_ENV, v))?,
            Err(_) => DEFAULT_PORT,
        },
    };

    carteira::server::start_server(port, options).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
