// import + classify commands

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use resale_config::{resolve_csv_path, CsvSource, Settings};
use resale_feed::{detect_report, import_csv, ImportSummary, ReportKind};

use crate::exit_codes::EXIT_ROWS_SKIPPED;
use crate::{print_json, CliError};

/// Warnings printed before the rest are summarized as a count.
const MAX_WARNINGS_SHOWN: usize = 20;

pub fn cmd_import(
    conn: &mut Connection,
    settings: &Settings,
    path: Option<PathBuf>,
    kind: Option<ReportKind>,
    json: bool,
    strict: bool,
) -> Result<(), CliError> {
    let jobs: Vec<(PathBuf, Option<ReportKind>)> = match path {
        Some(p) => vec![(p, kind)],
        None => default_jobs(settings)?,
    };

    let mut summaries = Vec::new();
    for (path, kind) in jobs {
        let summary = import_csv(conn, &path, kind)?;
        if !json {
            print_summary(&path, &summary);
        }
        summaries.push(summary);
    }

    if json {
        print_json(&summaries)?;
    }

    let skipped: usize = summaries.iter().map(skipped_rows).sum();
    if strict && skipped > 0 {
        return Err(CliError {
            code: EXIT_ROWS_SKIPPED,
            message: format!("{skipped} row(s) skipped"),
            hint: None,
        });
    }
    Ok(())
}

fn default_jobs(settings: &Settings) -> Result<Vec<(PathBuf, Option<ReportKind>)>, CliError> {
    let jobs: Vec<_> = [
        (CsvSource::Inventory, ReportKind::ActiveListings),
        (CsvSource::Orders, ReportKind::Orders),
    ]
    .into_iter()
    .filter_map(|(source, kind)| resolve_csv_path(source, settings).map(|p| (p, Some(kind))))
    .collect();

    if jobs.is_empty() {
        return Err(CliError::args("no CSV path given and none configured").with_hint(format!(
            "pass a path, set INVENTORY_CSV_PATH / ORDERS_CSV_PATH, or edit {}",
            Settings::config_path_display()
        )));
    }
    Ok(jobs)
}

fn skipped_rows(summary: &ImportSummary) -> usize {
    match summary {
        ImportSummary::ActiveListings(s) => s.skipped,
        ImportSummary::Orders(s) => s.skipped,
    }
}

fn print_summary(path: &Path, summary: &ImportSummary) {
    match summary {
        ImportSummary::ActiveListings(s) => println!(
            "{}: active listings, {} rows, {} inserted, {} updated, {} skipped",
            path.display(),
            s.rows_read,
            s.inserted,
            s.updated,
            s.skipped
        ),
        ImportSummary::Orders(s) => println!(
            "{}: orders, {} rows, {} orders, {} lines, {} shipments, {} skipped",
            path.display(),
            s.rows_read,
            s.orders_upserted,
            s.order_items_upserted,
            s.shipments_upserted,
            s.skipped
        ),
    }

    let warnings = summary.warnings();
    for issue in warnings.iter().take(MAX_WARNINGS_SHOWN) {
        eprintln!("warning: {issue}");
    }
    if warnings.len() > MAX_WARNINGS_SHOWN {
        eprintln!("warning: ... and {} more", warnings.len() - MAX_WARNINGS_SHOWN);
    }
}

pub fn cmd_classify(conn: &Connection, path: &Path) -> Result<(), CliError> {
    let kind = detect_report(conn, path)?;
    println!("{kind}");
    Ok(())
}
