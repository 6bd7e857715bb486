//! Processing a list of templates into zone files and the catalog.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::catalog::CatalogMaintainer;
use crate::config::Config;
use crate::error::{Result, TempleError};
use crate::resolver::{HickoryResolver, Resolve};
use crate::serial::{SerialMode, SerialProvider};
use crate::template::TemplateProcessor;
use crate::writer::write_if_changed;

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Every processed domain, in argument order.
    pub domains: Vec<String>,
    /// Domains whose zone file was (re)written, in argument order.
    pub modified: Vec<String>,
    /// The catalog zone name, if the catalog file was rewritten.
    pub catalog: Option<String>,
}

/// One input template and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Template path.
    pub input: PathBuf,
    /// Zone name: the template file name without the input suffix.
    pub domain: String,
    /// Generated zone file, next to the template.
    pub output: PathBuf,
}

impl Target {
    /// Derive the domain and output path for `input`.
    pub fn new(input: &Path, ext_in: &str, ext_out: &str) -> Self {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        let domain = name.strip_suffix(ext_in).unwrap_or(&name).to_string();
        let output = input.with_file_name(format!("{domain}{ext_out}"));
        Self {
            input: input.to_path_buf(),
            domain,
            output,
        }
    }
}

/// Runs templates through processing, serial computation, change-aware
/// writing and catalog maintenance.
pub struct Pipeline<'a> {
    config: &'a Config,
    resolver: Option<Box<dyn Resolve>>,
    system_resolver: fn() -> Result<HickoryResolver>,
    catalog_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    /// Pipeline for `config`. The catalog is written to the current
    /// directory; `online` serials use the system resolver, falling back to
    /// the date serial when none is configured.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            resolver: None,
            system_resolver: HickoryResolver::system,
            catalog_dir: PathBuf::new(),
        }
    }

    /// Use `resolver` for `online` serials.
    pub fn with_resolver(mut self, resolver: Box<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Store the catalog zone file in `dir`.
    pub fn with_catalog_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.catalog_dir = dir.into();
        self
    }

    /// Process `files` strictly in order, then reconcile the catalog.
    pub async fn run(&self, files: &[PathBuf]) -> Result<Outcome> {
        if files.is_empty() {
            return Err(TempleError::NoInput);
        }
        self.config.validate()?;
        let (ext_in, ext_out) = self.config.io_extensions()?;
        let mode = self.config.serial_mode()?;

        let targets: Vec<Target> = files
            .iter()
            .map(|f| Target::new(f, ext_in, ext_out))
            .collect();
        let mut outcome = Outcome::default();
        for target in &targets {
            if !outcome.domains.contains(&target.domain) {
                outcome.domains.push(target.domain.clone());
            }
        }

        let catalog = match &self.config.catalog {
            Some(catalog) if catalog.should_maintain(outcome.domains.len()) => {
                let (domain, extension) = self.config.catalog_target()?;
                Some(CatalogMaintainer::in_dir(&self.catalog_dir, domain, extension))
            }
            _ => None,
        };

        let system;
        let resolver: Option<&dyn Resolve> = match (&self.resolver, mode) {
            (Some(resolver), _) => Some(resolver.as_ref()),
            (None, SerialMode::Online) => match (self.system_resolver)() {
                Ok(resolver) => {
                    system = resolver;
                    Some(&system)
                }
                Err(e) => {
                    warn!("No usable system resolver ({e}), online serials fall back to the date");
                    None
                }
            },
            (None, _) => None,
        };
        let serials = resolver.map_or_else(SerialProvider::offline, SerialProvider::new);
        let processor = TemplateProcessor::new(self.config);

        for target in &targets {
            let serial = serials.serial(&target.domain, mode).await?;
            let mut variables = self.config.variables.clone();
            variables.insert("_domain".to_string(), target.domain.clone());
            variables.insert("_serial".to_string(), serial.to_string());

            let lines = processor.process(&target.input, &mut variables)?;
            let mut contents = lines.join("\n");
            contents.push('\n');

            let written = write_if_changed(&target.output, &contents)?;
            debug!(
                domain = %target.domain,
                serial,
                lines = lines.len(),
                written,
                "processed template"
            );
            if written && !outcome.modified.contains(&target.domain) {
                info!(domain = %target.domain, output = %target.output.display(), "zone updated");
                outcome.modified.push(target.domain.clone());
            }
        }

        if let Some(catalog) = catalog {
            let domains: BTreeSet<String> = outcome.domains.iter().cloned().collect();
            if catalog.reconcile(&domains)? {
                info!(path = %catalog.path().display(), "catalog updated");
                outcome.catalog = self
                    .config
                    .catalog
                    .as_ref()
                    .and_then(|c| c.domain.clone());
            }
        }

        Ok(outcome)
    }
}
