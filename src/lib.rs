//! dnstemple - a templating engine for DNS zone files.
//!
//! Templates are ordinary zone files with a few additions:
//!
//! - `{name}` placeholders, filled from the `variables` section of the
//!   configuration (plus `_domain`, `_serial` and `_config`)
//! - `$ADDRESS <group> <owner>`, expanded into `A`/`AAAA` records from the
//!   (possibly nested) `addresses` groups
//! - `$INCLUDE <file> [<var>=<value>...]`, processed recursively with its
//!   own variable scope
//! - `$DEFAULT <var> <value>`, setting a variable that is unset or empty
//!
//! ## Pipeline
//!
//! ```text
//!  example.com.in ──▶ TemplateProcessor ──▶ example.com.zone (only if changed)
//!                        │     │
//!           variables ◀──┘     └──▶ AddressResolver
//!                        ▲
//!   SerialProvider ──────┘ _serial (unixtime | dateserial | online | fixed)
//!        │
//!        └──▶ Resolve (hickory-resolver, live SOA/NS/A/AAAA lookups)
//!
//!  all processed domains ──▶ CatalogMaintainer ──▶ catalog zone (PTR per zone)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use dnstemple::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("dnstemple.yaml".as_ref())?;
//!     let outcome = Pipeline::new(&config)
//!         .run(&["example.com.in".into()])
//!         .await?;
//!     for domain in outcome.modified {
//!         println!("{domain}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod address;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod serial;
pub mod telemetry;
pub mod template;
pub mod variables;
pub mod writer;

// Re-export main types
pub use address::AddressResolver;
pub use catalog::CatalogMaintainer;
pub use crate::config::{CatalogConfig, Config, Extensions, Options, Skip, TelemetryConfig};
pub use error::{Result, TempleError};
pub use pipeline::{Outcome, Pipeline};
pub use resolver::{HickoryResolver, LookupFailure, Resolve};
pub use serial::{SerialMode, SerialProvider};
pub use template::TemplateProcessor;
pub use variables::Variables;
