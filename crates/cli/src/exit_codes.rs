//! CLI Exit Code Registry
//!
//! Single source of truth for `resale` exit codes. Scripts that run the
//! nightly import rely on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | General error (unspecified)                         |
//! | 2    | Usage error (bad args, unknown field name)          |
//! | 3    | File is neither a listings nor an orders report     |
//! | 4    | Input file unreadable (missing, not UTF-8, empty)   |
//! | 5    | Database error                                      |
//! | 6    | Entity not found                                    |
//! | 7    | Import finished but some rows were skipped          |

use resale_feed::FeedError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unparseable `--set`, unknown field.
pub const EXIT_USAGE: u8 = 2;

/// Header row matched no known report; nothing was written.
pub const EXIT_UNKNOWN_REPORT: u8 = 3;

/// Input file missing, not UTF-8, or without a header row.
pub const EXIT_INPUT: u8 = 4;

/// SQLite failure (open, schema, query or write).
pub const EXIT_DATABASE: u8 = 5;

/// Item, order line or order does not exist.
pub const EXIT_NOT_FOUND: u8 = 6;

/// Only with `import --strict`: the file imported but rows were skipped.
pub const EXIT_ROWS_SKIPPED: u8 = 7;

/// Map a core error to its exit code.
pub fn feed_exit_code(err: &FeedError) -> u8 {
    match err {
        FeedError::UnknownReport { .. } => EXIT_UNKNOWN_REPORT,
        FeedError::Io { .. } | FeedError::Encoding { .. } | FeedError::NoHeader { .. } | FeedError::Csv(_) => {
            EXIT_INPUT
        }
        FeedError::Sqlite(_) => EXIT_DATABASE,
        FeedError::UnknownField { .. } | FeedError::Validation(_) => EXIT_USAGE,
        FeedError::Json(_) => EXIT_ERROR,
    }
}
