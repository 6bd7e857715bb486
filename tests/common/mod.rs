//! Shared test infrastructure: a table-driven resolver and fixture helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hickory_proto::rr::rdata::{A, AAAA, NS, SOA};
use hickory_proto::rr::{Name, RData, RecordType};
use tempfile::TempDir;

use dnstemple::resolver::absolute;
use dnstemple::{Config, LookupFailure, Resolve};

// --- FakeResolver ---

/// Answers lookups from a fixed table. Anything not in the table fails.
///
/// `restricted_to` hands out the `authoritative` table (empty if unset) and
/// records the nameserver addresses it was asked for.
#[derive(Clone, Default)]
pub struct FakeResolver {
    answers: HashMap<(String, RecordType), Vec<RData>>,
    authoritative: Option<Box<FakeResolver>>,
    restricted_calls: Arc<Mutex<Vec<Vec<IpAddr>>>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(mut self, name: &str, rtype: RecordType, rdata: RData) -> Self {
        self.answers
            .entry((absolute(name), rtype))
            .or_default()
            .push(rdata);
        self
    }

    pub fn soa(self, zone: &str, mname: &str, serial: u32) -> Self {
        let soa = SOA::new(
            Name::from_ascii(absolute(mname)).unwrap(),
            Name::from_ascii(format!("hostmaster.{}", absolute(zone))).unwrap(),
            serial,
            3600,
            600,
            604800,
            60,
        );
        self.add(zone, RecordType::SOA, RData::SOA(soa))
    }

    pub fn ns(self, zone: &str, target: &str) -> Self {
        let ns = NS(Name::from_ascii(absolute(target)).unwrap());
        self.add(zone, RecordType::NS, RData::NS(ns))
    }

    pub fn a(self, name: &str, ip: &str) -> Self {
        self.add(name, RecordType::A, RData::A(A(ip.parse().unwrap())))
    }

    pub fn aaaa(self, name: &str, ip: &str) -> Self {
        self.add(name, RecordType::AAAA, RData::AAAA(AAAA(ip.parse().unwrap())))
    }

    pub fn authoritative(mut self, resolver: FakeResolver) -> Self {
        self.authoritative = Some(Box::new(resolver));
        self
    }

    /// Nameserver sets passed to `restricted_to`, in call order.
    pub fn restricted_calls(&self) -> Vec<Vec<IpAddr>> {
        self.restricted_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Resolve for FakeResolver {
    async fn resolve(&self, name: &str, rtype: RecordType) -> Result<Vec<RData>, LookupFailure> {
        self.answers
            .get(&(absolute(name), rtype))
            .cloned()
            .ok_or_else(|| LookupFailure::new(name, rtype, "NXDOMAIN"))
    }

    fn restricted_to(&self, nameservers: &[IpAddr]) -> dnstemple::Result<Box<dyn Resolve>> {
        self.restricted_calls
            .lock()
            .unwrap()
            .push(nameservers.to_vec());
        let authoritative = self.authoritative.as_deref().cloned().unwrap_or_default();
        Ok(Box::new(authoritative))
    }
}

// --- Time ---

/// 2021-11-18 11:21:17 UTC; its date serial is 2021111800.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 11, 18, 11, 21, 17).unwrap()
}

// --- Fixtures ---

/// A scratch directory holding templates, generated zones and the catalog.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `name`, replacing `@DIR@` with the workspace path
    /// so `$INCLUDE` can use absolute paths.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        let contents = contents.replace("@DIR@", &self.dir.path().display().to_string());
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Write `yaml` as the configuration file and load it.
    pub fn config(&self, yaml: &str) -> Config {
        let path = self.write("dnstemple.yaml", yaml);
        Config::load(&path).unwrap()
    }
}
