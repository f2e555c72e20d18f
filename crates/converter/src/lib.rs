//! CurseForge to Modrinth converter
//!
//! This library turns a CurseForge `modlist.html` export into a Modrinth
//! `modrinth.index.json`. Each reference is searched on Modrinth, confirmed by the
//! operator, resolved to a concrete release file and written into the manifest. References
//! that cannot be resolved stay in the manifest as placeholders so they can be filled in
//! by hand later.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use converter::{read_source_list, Conversion, ConvertConfigBuilder, Converter};
//! use std::path::Path;
//!
//! # async fn example() -> converter::Result<()> {
//! let config = ConvertConfigBuilder::new()
//!     .loader("forge", "47.2.20")
//!     .output_path("./modrinth.index.json")
//!     .build()
//!     .with_env_overrides();
//!
//! let references = read_source_list(Path::new("modlist.html")).await?;
//! let converter = Converter::builder(config).build()?;
//!
//! if let Conversion::Finished(report) = converter.run(references).await? {
//!     println!("{} of {} resolved", report.resolved_count(), report.outcomes.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Rate-limit aware batching**: fixed cooldowns or pacing from the API's rate-limit headers
//! - **Automatic matching**: exact author and title matches are preselected
//! - **Interactive fallback**: the operator picks hits, releases and files when needed
//! - **Placeholders**: unresolved references keep a link back to their source page
//! - **Manual back-fill**: hash a downloaded file into a placeholder entry

pub mod api;
pub mod backfill;
pub mod batch;
pub mod config;
pub mod core;
pub mod manifest;
pub mod matcher;
pub mod pipeline;
pub mod prompt;
pub mod resolver;
pub mod selector;
pub mod source_list;

// Re-export commonly used types for convenience
pub use api::{ModrinthApi, ProjectIndex, QuotaSource, RateLimitStatus, VersionFilter};
pub use backfill::{backfill_entry, load_manifest, pending_entries, save_manifest, PendingEntry};
pub use batch::{BatchScheduler, Pacing};
pub use config::{ConvertConfig, ConvertConfigBuilder, FailurePolicy, PacingMode};
pub use crate::core::{
    BatchEvent, ConsoleProgressReporter, ConvertError, IntoBatchCallback, Resolution, Result,
    SourceReference, UnresolvedReason,
};
pub use manifest::{Manifest, ManifestAssembler, ManifestFile};
pub use pipeline::{Conversion, ConversionReport, Converter, ConverterBuilder};
pub use prompt::{AutoConfirmPrompter, CliPrompter, Prompter};
pub use source_list::{parse_source_list, read_source_list};

#[cfg(test)]
mod tests;
