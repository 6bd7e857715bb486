//! Error types for dnstemple.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = TempleError> = std::result::Result<T, E>;

/// Fatal conditions that abort a run.
///
/// Non-fatal conditions (DNS lookup failures during serial computation, a
/// missing catalog file, indented lines where an owner name was expected)
/// never surface as a `TempleError`; they are logged and handled locally.
#[derive(Debug, Error)]
pub enum TempleError {
    /// IO error (reading templates, writing zone files).
    #[error("{}: {source}", path.display())]
    Io {
        /// File the operation was performed on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// No template was given.
    #[error("No zone file provided")]
    NoInput,

    /// The configuration document was loaded but is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `config.serial` is neither a known mode nor an integer.
    #[error("Unknown value for config.serial: {0}")]
    UnknownSerialMode(String),

    /// A `{name}` placeholder has no value in the current scope.
    #[error("Unknown variable '{key}' in {file}: {line}")]
    UnknownVariable {
        /// The placeholder name.
        key: String,
        /// Template the line came from.
        file: String,
        /// The offending line.
        line: String,
    },

    /// A directive or placeholder is malformed.
    #[error("Format mismatch `{expected}` in {file}: {line}")]
    Format {
        /// The expected syntax.
        expected: &'static str,
        /// Template the line came from.
        file: String,
        /// The offending line.
        line: String,
    },

    /// An address group references a group that does not exist.
    #[error("Address \"{name}\" unknown{}", trail(chain))]
    UnknownAddress {
        /// The unresolvable token.
        name: String,
        /// Groups being expanded, outermost first.
        chain: Vec<String>,
    },

    /// Address group expansion revisited a group or went past the depth bound.
    #[error("Address expansion too deep{}", trail(chain))]
    AddressTooDeep {
        /// Groups being expanded, outermost first.
        chain: Vec<String>,
    },

    /// A template includes itself, directly or indirectly.
    #[error("Template {file} included recursively")]
    IncludeLoop {
        /// Template that was about to be processed again.
        file: String,
    },

    /// Neither the SOA master nor any NS target had a usable address.
    #[error("No NS addresses found for {domain}, {mname}")]
    NoNameservers {
        /// Zone being looked up.
        domain: String,
        /// MNAME from the zone's SOA record.
        mname: String,
    },

    /// A resolver could not be constructed.
    #[error("Resolver setup failed: {0}")]
    Resolve(String),

    /// An error raised while expanding a directive, annotated with its origin.
    #[error("{source} in {file}: {line}")]
    InTemplate {
        /// Template the line came from.
        file: String,
        /// The offending line.
        line: String,
        /// Underlying error.
        #[source]
        source: Box<TempleError>,
    },
}

impl TempleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render an expansion chain as ` expanding "z" (expanded from address "y" (...))`.
fn trail(chain: &[String]) -> String {
    let Some((innermost, outer)) = chain.split_last() else {
        return String::new();
    };
    let mut out = format!(" expanding \"{innermost}\"");
    for group in outer.iter().rev() {
        out.push_str(&format!(" (expanded from address \"{group}\""));
    }
    out.push_str(&")".repeat(outer.len()));
    out
}
