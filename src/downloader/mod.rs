// Downloader module - format table parsing, audio pairing and the yt-dlp process seam

pub mod diagnostics;
pub mod errors;
pub mod format_selector;
pub mod format_table;
pub mod models;
pub mod size;
pub mod tools;
pub mod traits;
pub mod utils;

#[cfg(test)]
pub mod testing;

pub use errors::DownloadError;
pub use models::{CommandStatus, DownloadReport, FormatKind, FormatRecord};
pub use traits::LineSource;
