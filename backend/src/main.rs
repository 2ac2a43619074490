//! nfadjust CLI - Validate invoice line CSVs and apply decimal adjustments
//!
//! # Main Commands
//!
//! ```bash
//! nfadjust serve                               # Start HTTP server (port 3000)
//! nfadjust adjust notas.csv --value 0,50       # Full run, writes the export file
//! nfadjust ingest notas.csv                    # Validate a CSV, print rows as JSON
//! ```
//!
//! # Helpers
//!
//! ```bash
//! nfadjust check-input 3 3,5 3,50              # Run the adjustment field validator
//! nfadjust columns                             # Show the export schema
//! ```

use clap::{Parser, Subcommand};
use nfadjust::config::Settings;
use nfadjust::decimal::input::{DecimalInput, InputCheck};
use nfadjust::export::{CsvSheetWriter, EXPORT_COLUMNS, SHEET_NAME, SHEET_TITLE};
use nfadjust::lookup::{ConfiguredLookup, LookupSource};
use nfadjust::models::AdjustmentMode;
use nfadjust::parser::{IngestReport, ReportLevel, FORMAT_HELP, FORMAT_HELP_TITLE};
use nfadjust::session::{Session, RESET_MESSAGE};
use nfadjust::transform::pipeline::{export_to_dir, ingest_file, run_adjustment};
use nfadjust::transform::Adjustment;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nfadjust")]
#[command(about = "Validate invoice line CSVs and apply decimal adjustments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a CSV file and output the valid rows as JSON
    Ingest {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full run: CSV → lookup join → adjusted values → export file
    Adjust {
        /// Input CSV file
        input: PathBuf,

        /// Adjustment value, format 0,00
        #[arg(short, long)]
        value: String,

        /// Subtract the value instead of adding it
        #[arg(long)]
        decrease: bool,

        /// Lookup file or http(s) URL (default: NFADJUST_LOOKUP)
        #[arg(short, long)]
        lookup: Option<String>,

        /// Directory for the export file (default: NFADJUST_EXPORT_DIR)
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Also write the adjusted rows as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run the simulated save after exporting
        #[arg(long)]
        save: bool,
    },

    /// Feed successive field contents through the adjustment field validator
    CheckInput {
        /// Field content after each keystroke
        keystrokes: Vec<String>,

        /// Treat each argument as typed text appended to the field
        #[arg(long)]
        append: bool,
    },

    /// Show the export columns and the input file format
    Columns,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: NFADJUST_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    nfadjust::logging::init();
    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Err(e) => Err(e.into()),
        Ok(settings) => run(cli, settings).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Ingest { input, output } => cmd_ingest(&input, output.as_deref()).await,

        Commands::Adjust {
            input,
            value,
            decrease,
            lookup,
            export_dir,
            output,
            save,
        } => {
            let settings = Settings {
                lookup: lookup.unwrap_or(settings.lookup),
                export_dir: export_dir.unwrap_or(settings.export_dir),
                ..settings
            };
            let mode = AdjustmentMode::from_increase(!decrease);
            cmd_adjust(&input, &value, mode, &settings, output.as_deref(), save).await
        }

        Commands::CheckInput { keystrokes, append } => cmd_check_input(&keystrokes, append),

        Commands::Columns => cmd_columns(),

        Commands::Serve { port } => {
            let settings = Settings {
                port: port.unwrap_or(settings.port),
                ..settings
            };
            nfadjust::api::start_server(settings).await
        }
    }
}

async fn cmd_ingest(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Reading CSV: {}", input.display());

    let result = ingest_file(input).await?;
    print_report(&result.report());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_adjust(
    input: &Path,
    value: &str,
    mode: AdjustmentMode,
    settings: &Settings,
    output: Option<&Path>,
    save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let parsed = ingest_file(input).await?;
    print_report(&parsed.report());

    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let session = Session::load(file_name, &parsed);

    let lookup = ConfiguredLookup::from_location(&settings.lookup);
    eprintln!("   Lookup: {}", lookup.describe());

    let adjustment = Adjustment::from_input(value, mode)?;
    eprintln!("\n{}", adjustment.progress_message());

    let run = run_adjustment(&session.rows, value, mode, &lookup).await?;
    eprintln!("\n✅ {}", run.summary());

    let session = session.with_adjustment(run.result);

    let now = chrono::Local::now().naive_local();
    match export_to_dir(&session.rows, &settings.export_dir, &CsvSheetWriter::default(), now).await {
        Ok(path) => eprintln!("\n📊 Arquivo exportado com sucesso! {}", path.display()),
        Err(e) => eprintln!("\n⚠️  {}", e),
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&session.rows)?;
        write_output(&json, Some(path))?;
    }

    if save {
        eprintln!("\n💾 Salvando dados no banco...");
        let receipt = session.save(settings.save_delay).await?;
        eprintln!("{}", receipt.message());
        eprintln!("{}", RESET_MESSAGE);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_check_input(keystrokes: &[String], append: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut field = DecimalInput::new();

    for keystroke in keystrokes {
        let check = if append {
            field.type_str(keystroke)
        } else {
            field.change(keystroke)
        };
        print_check(keystroke, check);
    }

    Ok(())
}

fn print_check(raw: &str, check: &InputCheck) {
    let hint = check.hint().map(|h| format!("  ({})", h)).unwrap_or_default();
    println!("{:<8} → {:<6} {:?}{}", raw, check.value, check.state, hint);
}

fn cmd_columns() -> Result<(), Box<dyn std::error::Error>> {
    println!("📋 {} - {}\n", SHEET_NAME, SHEET_TITLE);
    for (i, column) in EXPORT_COLUMNS.iter().enumerate() {
        println!("  [{:2}] {:<20} {:<18} {:?}", i + 1, column.label, column.property, column.cell_type);
    }
    println!("\n{}\n\n{}", FORMAT_HELP_TITLE, FORMAT_HELP);
    Ok(())
}

fn print_report(report: &IngestReport) {
    match report.level {
        ReportLevel::Success => eprintln!("   ✅ {}", report.message),
        ReportLevel::Warning => eprintln!("   ⚠️  {}", report.message),
    }
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
