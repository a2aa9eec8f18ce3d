//! Fishload CLI - aggregate fish-trade spreadsheets and deliver reports
//!
//! # Main Commands
//!
//! ```bash
//! fishload process source.xlsx -o intermediate.xlsx   # transform pipeline
//! fishload copy-reports -r reports/ -d out/ --from intermediate.xlsx
//! fishload run source.xlsx -o intermediate.xlsx -r reports/ -d out/
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! fishload parse source.csv        # dump parsed rows as JSON
//! fishload licenses source.xlsx    # print canonical license ids
//! ```

use clap::{Parser, Subcommand};
use fishload::{
    canonical_license, copy_reports, load_table_file, process, CopyOutcome, CopyResult,
    ProcessResult,
};
use fishload::models::{cell_to_string, field, COL_LICENSE};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fishload")]
#[command(about = "Aggregate fish-trade transaction spreadsheets and collect per-license reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the transform pipeline: filter, convert to kg, group, write
    Process {
        /// Input table files (CSV or Excel), concatenated in the given order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output table file (.csv or .xlsx)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the full result (groups + diagnostics) as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Locate per-license report files and copy them to a delivery folder
    CopyReports {
        /// Directory tree to search for report files
        #[arg(short = 'r', long)]
        search_root: PathBuf,

        /// Delivery directory (created if absent)
        #[arg(short, long)]
        dest: PathBuf,

        /// Comma-separated license identifiers
        #[arg(short, long, value_delimiter = ',')]
        licenses: Vec<String>,

        /// Read license identifiers from a table file instead
        #[arg(long, conflicts_with = "licenses")]
        from: Option<PathBuf>,

        /// Also write the copy result as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Full workflow: process, then copy reports for the produced licenses
    Run {
        /// Input table files (CSV or Excel)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output table file (.csv or .xlsx)
        #[arg(short, long)]
        output: PathBuf,

        /// Directory tree to search for report files
        #[arg(short = 'r', long)]
        search_root: PathBuf,

        /// Delivery directory (created if absent)
        #[arg(short, long)]
        dest: PathBuf,
    },

    /// Parse a table file and output its rows as JSON
    Parse {
        /// Input table file (CSV or Excel)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the canonical license identifiers found in a table file
    Licenses {
        /// Input table file (CSV or Excel)
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process { inputs, output, json } => cmd_process(&inputs, &output, json.as_deref()),

        Commands::CopyReports {
            search_root,
            dest,
            licenses,
            from,
            json,
        } => cmd_copy_reports(&search_root, &dest, licenses, from.as_deref(), json.as_deref()),

        Commands::Run {
            inputs,
            output,
            search_root,
            dest,
        } => cmd_run(&inputs, &output, &search_root, &dest),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Licenses { input } => cmd_licenses(&input),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_process(
    inputs: &[PathBuf],
    output: &Path,
    json: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing {} input file(s)", inputs.len());

    let result = process(inputs, output)?;
    print_process_summary(&result, output);

    if let Some(json_path) = json {
        let payload = serde_json::to_string_pretty(&result)?;
        fs::write(json_path, payload)?;
        eprintln!("💾 Result JSON written to: {}", json_path.display());
    }

    Ok(())
}

fn cmd_copy_reports(
    search_root: &Path,
    dest: &Path,
    licenses: Vec<String>,
    from: Option<&Path>,
    json: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ids = match from {
        Some(table) => licenses_from_table(table)?,
        None => licenses,
    };
    if ids.is_empty() {
        return Err("no license identifiers given (use --licenses or --from)".into());
    }

    eprintln!("📄 Copying reports for {} license(s)", ids.len());
    let result = copy_reports(&ids, search_root, dest)?;
    print_copy_summary(&result);

    if let Some(json_path) = json {
        let payload = serde_json::to_string_pretty(&result)?;
        fs::write(json_path, payload)?;
        eprintln!("💾 Result JSON written to: {}", json_path.display());
    }

    Ok(())
}

fn cmd_run(
    inputs: &[PathBuf],
    output: &Path,
    search_root: &Path,
    dest: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing {} input file(s)", inputs.len());
    let result = process(inputs, output)?;
    print_process_summary(&result, output);

    let ids = result.license_ids();
    if ids.is_empty() {
        eprintln!("⚠️  No license identifiers in the output; skipping report copy");
        return Ok(());
    }

    eprintln!("\n📄 Copying reports for {} license(s)", ids.len());
    let sweep = copy_reports(&ids, search_root, dest)?;
    print_copy_summary(&sweep);

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let result = load_table_file(input)?;
    eprintln!("   Format: {}", result.format);
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_licenses(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ids = licenses_from_table(input)?;
    eprintln!("✅ {} unique license(s)", ids.len());
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

/// Unique canonical license ids from a table's license column,
/// in first-seen order.
fn licenses_from_table(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let parsed = load_table_file(path)?;
    let mut seen = std::collections::HashSet::new();
    let mut ids = Vec::new();

    for row in &parsed.records {
        let raw = cell_to_string(field(row, COL_LICENSE));
        if let Some(id) = canonical_license(&raw) {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }

    if ids.is_empty() {
        return Err(format!("no license identifiers found in {}", path.display()).into());
    }
    Ok(ids)
}

fn print_process_summary(result: &ProcessResult, output: &Path) {
    let s = &result.summary;
    eprintln!("\n📊 Summary:");
    eprintln!("   Rows loaded: {}", s.rows_loaded);
    eprintln!("   Rows dropped: {}", s.rows_dropped);
    eprintln!("   Groups: {}", s.group_count);
    eprintln!("   Total weight: {} kg", s.total_weight_kg);
    eprintln!("   Total packages: {}", s.total_packages);
    eprintln!("   Licenses: {}", s.unique_licenses);
    eprintln!("💾 Intermediate file: {}", output.display());
}

fn print_copy_summary(result: &CopyResult) {
    eprintln!("\n📊 Copy result ({} file(s) scanned):", result.scanned_files);
    eprintln!("   ✅ Copied: {}", result.copied());
    if result.not_found() > 0 {
        eprintln!("   ⚠️  Not found: {}", result.not_found());
    }
    if result.ambiguous() > 0 {
        eprintln!("   ⚠️  Ambiguous: {}", result.ambiguous());
        for report in &result.reports {
            if let CopyOutcome::Ambiguous { candidates } = &report.outcome {
                eprintln!("      {} matches {} files:", report.license, candidates.len());
                for path in candidates.iter().take(3) {
                    eprintln!("        - {}", path.display());
                }
            }
        }
    }
    if result.failed() > 0 {
        eprintln!("   ❌ Failed: {}", result.failed());
        for report in &result.reports {
            if let CopyOutcome::Failed { error } = &report.outcome {
                eprintln!("      {}: {}", report.license, error);
            }
        }
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
