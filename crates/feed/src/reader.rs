// CSV file loading for marketplace reports

use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::{FeedError, Result};

/// A report file split into its header row and data rows.
#[derive(Debug)]
pub struct FeedFile {
    pub path: PathBuf,
    pub headers: Vec<String>,
    /// Data rows in file order. A row the CSV reader rejects is kept as
    /// its error message so the importer can report it and move on.
    pub rows: Vec<std::result::Result<StringRecord, String>>,
}

/// Read a report from disk.
///
/// File-level failures (missing file, non-UTF-8 bytes, no header row) are
/// errors; nothing about individual rows is.
pub fn read_feed(path: &Path) -> Result<FeedFile> {
    let bytes = std::fs::read(path).map_err(|e| FeedError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let content = String::from_utf8(bytes).map_err(|_| FeedError::Encoding {
        path: path.to_path_buf(),
    })?;
    parse_feed(path, &content)
}

/// Parse already-loaded report text. `path` is only used in errors.
pub fn parse_feed(path: &Path, content: &str) -> Result<FeedFile> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let body = skip_blank_lines(content);
    if body.is_empty() {
        return Err(FeedError::NoHeader { path: path.to_path_buf() });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(Ok(rec)) => rec.iter().map(|h| h.trim().to_string()).collect(),
        Some(Err(e)) => return Err(FeedError::Csv(e.to_string())),
        None => return Err(FeedError::NoHeader { path: path.to_path_buf() }),
    };
    if headers.iter().all(|h| h.is_empty()) {
        return Err(FeedError::NoHeader { path: path.to_path_buf() });
    }

    let rows = records.map(|r| r.map_err(|e| e.to_string())).collect();

    Ok(FeedFile {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Drop leading lines that hold only whitespace. Some order exports start
/// with an empty line before the header.
fn skip_blank_lines(content: &str) -> &str {
    let mut rest = content;
    loop {
        match rest.find('\n') {
            Some(end) if rest[..end].trim().is_empty() => rest = &rest[end + 1..],
            Some(_) => return rest,
            None => return if rest.trim().is_empty() { "" } else { rest },
        }
    }
}
