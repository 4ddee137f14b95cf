use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use taxmed_core::{RosterContext, aggregate, filter_year};
use taxmed_ingest::scan_directory;
use tracing::error;

mod report;

#[derive(Parser, Debug)]
#[command(
    name = "taxmed",
    version,
    about = "Extract and aggregate medical expenses from insurer exports"
)]
struct Cli {
    /// Directory to search for claim exports (default: current directory)
    dir_path: Option<PathBuf>,

    /// Write the aggregated report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep only expenses from this calendar year
    #[arg(short, long)]
    year: Option<i32>,

    /// Household member name; repeat once per person
    #[arg(short = 'p', long = "person")]
    person: Vec<String>,

    /// File with one household member name per line
    #[arg(long)]
    roster_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let ctx = RosterContext::new(roster(&cli)?);

    let dir = match cli.dir_path {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving current directory")?,
    };

    let report = scan_directory(&dir, &ctx)
        .with_context(|| format!("scanning {}", dir.display()))?;

    for failure in &report.failures {
        error!(
            file = %failure.path.display(),
            format = failure.format.name(),
            "excluded from report: {}",
            failure.error
        );
    }

    let mut items = report.items;
    if let Some(year) = cli.year {
        items = filter_year(items, year);
    }
    let rows = aggregate(items);

    match &cli.output {
        Some(path) => {
            let file =
                fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            report::write_report(file, &rows)?;
            println!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => {
            report::write_report(std::io::stdout().lock(), &rows)?;
        }
    }

    if !report.failures.is_empty() {
        eprintln!(
            "{} file(s) failed to parse and were excluded from the report",
            report.failures.len()
        );
    }

    Ok(())
}

/// Roster from repeated --person flags plus an optional one-name-per-line
/// file; parsing never starts without at least one member.
fn roster(cli: &Cli) -> Result<Vec<String>> {
    let mut people = cli.person.clone();

    if let Some(path) = &cli.roster_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading roster {}", path.display()))?;
        people.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
    }

    if people.is_empty() {
        bail!("no roster configured; pass --person at least once or --roster-file <path>");
    }

    Ok(people)
}
