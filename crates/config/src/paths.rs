// Locating the CSV exports to import

use std::env;
use std::path::{Path, PathBuf};

use crate::settings::Settings;

/// Which export a path is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvSource {
    Inventory,
    Orders,
}

impl CsvSource {
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Inventory => "INVENTORY_CSV_PATH",
            Self::Orders => "ORDERS_CSV_PATH",
        }
    }

    /// Fixed file name under `<data_dir>/data/`.
    pub fn default_file(&self) -> &'static str {
        match self {
            Self::Inventory => "active_listings.csv",
            Self::Orders => "completed_orders.csv",
        }
    }

    /// Name pattern of a raw marketplace download.
    pub fn download_pattern(&self) -> &'static str {
        match self {
            Self::Inventory => "*active-listings*.csv",
            Self::Orders => "*all-orders-report*.csv",
        }
    }
}

/// Resolve the CSV to import using the process environment and the
/// default data directory.
pub fn resolve_csv_path(source: CsvSource, settings: &Settings) -> Option<PathBuf> {
    resolve_csv_path_with(source, settings, |k| env::var(k).ok(), &Settings::data_dir())
}

/// Resolution order: environment variable, settings entry,
/// `<data_dir>/data/<default_file>`, then the first download in
/// `data_dir` whose name matches the source pattern (case-insensitive,
/// sorted by name). Env and settings paths are returned even if missing
/// so the caller can report them; fallbacks must exist.
pub fn resolve_csv_path_with(
    source: CsvSource,
    settings: &Settings,
    env_lookup: impl Fn(&str) -> Option<String>,
    data_dir: &Path,
) -> Option<PathBuf> {
    if let Some(p) = env_lookup(source.env_var()).filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(p.trim()));
    }

    let configured = match source {
        CsvSource::Inventory => settings.inventory_csv_path.as_deref(),
        CsvSource::Orders => settings.orders_csv_path.as_deref(),
    };
    if let Some(p) = configured.map(str::trim).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(p));
    }

    let fixed = data_dir.join("data").join(source.default_file());
    if fixed.is_file() {
        return Some(fixed);
    }

    find_download(data_dir, source.download_pattern())
}

fn find_download(dir: &Path, pattern: &str) -> Option<PathBuf> {
    let pattern = glob::Pattern::new(pattern).ok()?;
    let match_opts = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| pattern.matches_with(n, match_opts))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}
