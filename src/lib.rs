//! # citeflex
//!
//! Resolve free-text bibliographic queries ("Loving v. Virginia", a DOI, a newspaper URL,
//! "Caplan 2018 case against education") into a normalized record and a formatted
//! citation in Chicago, APA 7, MLA 9, Bluebook or OSCOLA.
//!
//! ## Architecture
//!
//! - [`detect`]: pattern-based reference type detection
//! - [`router`]: escalates low-confidence detections to an optional [`classifier`]
//! - [`sources`]: metadata providers behind one trait, plus the offline famous-case table
//! - [`cascade`]: tries providers in per-type order until one gives an acceptable match
//! - [`normalize`]: helpers providers use to build canonical records
//! - [`formatters`]: one module per citation style
//! - [`pipeline`]: `resolve` / `resolve_many`, the entry points tying it all together
//! - [`mcp`]: MCP server exposing the pipeline as tools
//! - [`config`]: configuration loading and static lookup tables
//!
//! ```rust,no_run
//! use citeflex::{Config, Resolver};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let resolver = Resolver::from_config(&Config::default())?;
//! let resolution = resolver.resolve("Loving v. Virginia", "Bluebook").await?;
//! println!("{}", resolution.citation.plain_text());
//! # Ok(())
//! # }
//! ```

pub mod cascade;
pub mod classifier;
pub mod config;
pub mod detect;
pub mod formatters;
pub mod mcp;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod router;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use cascade::{AttemptOutcome, CascadeOrchestrator, ProviderAttempt};
pub use config::Config;
pub use models::{CanonicalRecord, Citation, CitationStyle, ReferenceType};
pub use pipeline::{BatchItem, ResolveError, Resolution, Resolver};
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
