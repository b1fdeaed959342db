// IPO Allotment Checker - Core Library
// Shared by the terminal UI and the web server

pub mod allotment;
pub mod cache;
pub mod catalog;
pub mod checker;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod notice;
pub mod pan;
pub mod presenter;
pub mod selection;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use allotment::{AllotmentDecision, AllotmentLookup};
pub use cache::{Clock, SystemClock, TtlCache};
pub use catalog::{CatalogLoader, Ipo};
pub use checker::{
    Access, AllotmentChecker, CheckError, CheckObserver, CheckRequest, CollectingObserver,
};
pub use config::{AppConfig, ConfigError};
pub use fetcher::{fetch_or_notify, FetchError, HttpFetcher, JsonFetcher};
pub use notice::{Level, Notice, Notifier};
pub use pan::{is_valid_identifier, parse_identifiers};
pub use presenter::{
    row_style, AllotmentResult, IdentifierReport, ReportOutcome, ResultTable, RowStyle, TableRow,
};
pub use selection::{IpoChoice, Selection};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
