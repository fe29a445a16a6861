// Configuration loading

pub mod paths;
pub mod settings;

pub use paths::{resolve_csv_path, CsvSource};
pub use settings::Settings;
