//! Catalog zone maintenance.
//!
//! The catalog lists every managed zone as `<id>.zones 0 PTR <zone>.`. Ids
//! are random and assigned once; existing entries are kept as they are so
//! reconciliation is idempotent.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, TempleError};
use crate::writer::write_atomic;

/// A catalog zone file on disk.
#[derive(Debug, Clone)]
pub struct CatalogMaintainer {
    domain: String,
    path: PathBuf,
}

impl CatalogMaintainer {
    /// Catalog `domain` stored as `<domain><extension>` in the current directory.
    pub fn new(domain: &str, extension: &str) -> Self {
        Self::in_dir(Path::new(""), domain, extension)
    }

    /// Catalog `domain` stored as `<dir>/<domain><extension>`.
    pub fn in_dir(dir: &Path, domain: &str, extension: &str) -> Self {
        Self {
            domain: domain.to_string(),
            path: dir.join(format!("{domain}{extension}")),
        }
    }

    /// Path of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make the catalog list exactly `domains`, rewriting the file only if
    /// an entry was added or removed. Returns whether it was rewritten.
    pub fn reconcile(&self, domains: &BTreeSet<String>) -> Result<bool> {
        let mut changed = false;
        let mut contents = String::new();
        let mut present = BTreeSet::new();

        match std::fs::read_to_string(&self.path) {
            Ok(existing) => {
                // Kept lines are copied with their original line endings.
                for raw in existing.split_inclusive('\n') {
                    match ptr_target(raw.trim_end_matches(['\n', '\r'])) {
                        Some(target) if domains.contains(target) => {
                            present.insert(target.to_string());
                            contents.push_str(raw);
                        }
                        Some(target) => {
                            debug!(catalog = %self.domain, zone = target, "removing catalog entry");
                            changed = true;
                        }
                        None => contents.push_str(raw),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "creating catalog");
                for line in default_header(&self.domain) {
                    contents.push_str(&line);
                    contents.push('\n');
                }
                changed = true;
            }
            Err(e) => return Err(TempleError::io(&self.path, e)),
        }

        for domain in domains.difference(&present) {
            debug!(catalog = %self.domain, zone = %domain, "adding catalog entry");
            if !contents.is_empty() && !contents.ends_with('\n') {
                contents.push('\n');
            }
            contents.push_str(&format!("{}.zones\t0\tPTR\t{domain}.\n", Uuid::new_v4()));
            changed = true;
        }

        if changed {
            write_atomic(&self.path, &contents)?;
        }
        Ok(changed)
    }
}

/// Target of a `PTR` record line, without the trailing dot.
fn ptr_target(line: &str) -> Option<&str> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts[..] {
        [_, .., rtype, target] if rtype.eq_ignore_ascii_case("PTR") => {
            Some(target.strip_suffix('.').unwrap_or(target))
        }
        _ => None,
    }
}

fn default_header(domain: &str) -> [String; 3] {
    [
        format!("@\t0\tSOA\tns.{domain}. hostmaster.{domain}. 1 1h 30m 1w 5m"),
        format!("\t0\tNS\tns.{domain}."),
        "version\t0\tTXT\t\"2\"".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn domains(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ptr_target() {
        assert_eq!(ptr_target("abc.zones\t0\tPTR\texample.com."), Some("example.com"));
        assert_eq!(ptr_target("abc.zones 0 IN ptr example.org."), Some("example.org"));
        assert_eq!(ptr_target("version\t0\tTXT\t\"2\""), None);
        assert_eq!(ptr_target("PTR example.com."), None);
        assert_eq!(ptr_target(""), None);
    }

    #[test]
    fn test_creates_catalog_with_header() {
        let dir = TempDir::new().unwrap();
        let catalog = CatalogMaintainer::in_dir(dir.path(), "catalog.example", ".zone");

        assert!(catalog.reconcile(&domains(&["a.example", "b.example"])).unwrap());

        let contents = std::fs::read_to_string(catalog.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "@\t0\tSOA\tns.catalog.example. hostmaster.catalog.example. 1 1h 30m 1w 5m"
        );
        assert_eq!(lines[1], "\t0\tNS\tns.catalog.example.");
        assert_eq!(lines[2], "version\t0\tTXT\t\"2\"");
        assert!(lines[3].ends_with(".zones\t0\tPTR\ta.example."));
        assert!(lines[4].ends_with(".zones\t0\tPTR\tb.example."));
    }

    #[test]
    fn test_reconcile_idempotent() {
        let dir = TempDir::new().unwrap();
        let catalog = CatalogMaintainer::in_dir(dir.path(), "catalog.example", ".zone");
        let set = domains(&["a.example", "b.example"]);

        assert!(catalog.reconcile(&set).unwrap());
        let first = std::fs::read_to_string(catalog.path()).unwrap();
        assert!(!catalog.reconcile(&set).unwrap());
        assert_eq!(std::fs::read_to_string(catalog.path()).unwrap(), first);
    }

    #[test]
    fn test_removes_stale_entry_and_keeps_ids() {
        let dir = TempDir::new().unwrap();
        let catalog = CatalogMaintainer::in_dir(dir.path(), "catalog.example", ".zone");
        std::fs::write(
            catalog.path(),
            "; managed\n\
             @\t0\tSOA\tns.catalog.example. hostmaster.catalog.example. 1 1h 30m 1w 5m\n\
             id-a.zones\t0\tPTR\ta.example.\n\
             id-b.zones\t0\tPTR\tb.example.\n",
        )
        .unwrap();

        assert!(catalog.reconcile(&domains(&["a.example"])).unwrap());
        assert_eq!(
            std::fs::read_to_string(catalog.path()).unwrap(),
            "; managed\n\
             @\t0\tSOA\tns.catalog.example. hostmaster.catalog.example. 1 1h 30m 1w 5m\n\
             id-a.zones\t0\tPTR\ta.example.\n"
        );
    }

    #[test]
    fn test_rewrite_keeps_other_lines_verbatim() {
        let dir = TempDir::new().unwrap();
        let catalog = CatalogMaintainer::in_dir(dir.path(), "catalog.example", ".zone");
        std::fs::write(
            catalog.path(),
            "; managed\r\n\
             id-a.zones\t0\tPTR\ta.example.\r\n\
             id-b.zones\t0\tPTR\tb.example.\n\
             version\t0\tTXT\t\"2\"",
        )
        .unwrap();

        assert!(catalog.reconcile(&domains(&["a.example"])).unwrap());
        assert_eq!(
            std::fs::read_to_string(catalog.path()).unwrap(),
            "; managed\r\nid-a.zones\t0\tPTR\ta.example.\r\nversion\t0\tTXT\t\"2\""
        );

        assert!(catalog.reconcile(&domains(&["a.example", "c.example"])).unwrap());
        let contents = std::fs::read_to_string(catalog.path()).unwrap();
        assert!(
            contents.starts_with("; managed\r\nid-a.zones\t0\tPTR\ta.example.\r\nversion\t0\tTXT\t\"2\"\n"),
            "{contents:?}"
        );
        assert!(contents.ends_with(".zones\t0\tPTR\tc.example.\n"), "{contents:?}");
    }

    #[test]
    fn test_adds_new_entry_after_existing() {
        let dir = TempDir::new().unwrap();
        let catalog = CatalogMaintainer::in_dir(dir.path(), "catalog.example", ".zone");
        std::fs::write(catalog.path(), "id-a.zones\t0\tPTR\ta.example.\n").unwrap();

        assert!(catalog.reconcile(&domains(&["a.example", "c.example"])).unwrap());
        let contents = std::fs::read_to_string(catalog.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "id-a.zones\t0\tPTR\ta.example.");
        assert_eq!(lines.len(), 2);

        let id = lines[1].split('\t').next().unwrap();
        let uuid = id.strip_suffix(".zones").unwrap();
        assert!(Uuid::parse_str(uuid).is_ok(), "{id}");
        assert!(lines[1].ends_with("\tPTR\tc.example."));
    }
}
