//! DNS lookup capability used for `online` serials.
//!
//! All network access goes through [`Resolve`], so serial computation can be
//! driven by a fixed table of answers in tests.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use hickory_proto::rr::{RData, RecordType};
use hickory_proto::xfer::Protocol;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use thiserror::Error;
use tracing::{debug, trace};

use crate::error::{Result, TempleError};

/// A failed lookup. Never fatal on its own.
#[derive(Debug, Clone, Error)]
#[error("{name} {rtype}: {reason}")]
pub struct LookupFailure {
    /// Name that was queried.
    pub name: String,
    /// Record type that was queried.
    pub rtype: RecordType,
    /// Resolver message.
    pub reason: String,
}

impl LookupFailure {
    /// Build a failure for `name`/`rtype`.
    pub fn new(name: &str, rtype: RecordType, reason: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            rtype,
            reason: reason.to_string(),
        }
    }
}

/// Resolve names to record data.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Look up `name` (always treated as absolute) for `rtype`.
    async fn resolve(
        &self,
        name: &str,
        rtype: RecordType,
    ) -> std::result::Result<Vec<RData>, LookupFailure>;

    /// A resolver that only asks the given nameservers.
    fn restricted_to(&self, nameservers: &[IpAddr]) -> Result<Box<dyn Resolve>>;
}

/// [`Resolve`] implementation backed by hickory-resolver.
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    /// Resolver using the system configuration (`/etc/resolv.conf` on Unix).
    pub fn system() -> Result<Self> {
        let (config, opts) = hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| TempleError::Resolve(e.to_string()))?;
        Ok(Self::build(config, opts))
    }

    /// Resolver asking only `nameservers` on port 53, over UDP and TCP.
    pub fn with_nameservers(nameservers: &[IpAddr]) -> Result<Self> {
        if nameservers.is_empty() {
            return Err(TempleError::Resolve("No nameservers configured".to_string()));
        }
        let mut config = ResolverConfig::new();
        for ip in nameservers {
            let addr = SocketAddr::new(*ip, 53);
            config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));
            config.add_name_server(NameServerConfig::new(addr, Protocol::Tcp));
        }
        Ok(Self::build(config, ResolverOpts::default()))
    }

    fn build(config: ResolverConfig, opts: ResolverOpts) -> Self {
        let resolver = Resolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Self { resolver }
    }
}

#[async_trait]
impl Resolve for HickoryResolver {
    async fn resolve(
        &self,
        name: &str,
        rtype: RecordType,
    ) -> std::result::Result<Vec<RData>, LookupFailure> {
        let fqdn = absolute(name);
        trace!(name = %fqdn, ?rtype, "DNS lookup");
        let lookup = self
            .resolver
            .lookup(fqdn.as_str(), rtype)
            .await
            .map_err(|e| LookupFailure::new(name, rtype, e))?;
        Ok(lookup.iter().cloned().collect())
    }

    fn restricted_to(&self, nameservers: &[IpAddr]) -> Result<Box<dyn Resolve>> {
        Ok(Box::new(Self::with_nameservers(nameservers)?))
    }
}

/// `name` with a trailing dot, so no search list applies.
pub fn absolute(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Append the first address of `name`'s answer for `rtype`, ignoring failures.
async fn push_first_address(
    resolver: &dyn Resolve,
    name: &str,
    rtype: RecordType,
    addresses: &mut Vec<IpAddr>,
) {
    match resolver.resolve(name, rtype).await {
        Ok(answers) => {
            if let Some(ip) = answers.iter().find_map(rdata_ip) {
                addresses.push(ip);
            }
        }
        Err(failure) => debug!(%failure, "ignoring failed address lookup"),
    }
}

fn rdata_ip(rdata: &RData) -> Option<IpAddr> {
    match rdata {
        RData::A(a) => Some(IpAddr::V4(a.0)),
        RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
        _ => None,
    }
}

/// Collect nameserver addresses for `domain`: the SOA master first (it is
/// most likely to be current), then every NS target. `AAAA` is tried before
/// `A` for each name.
///
/// Failed address lookups are skipped. A failed `NS` lookup is returned.
pub async fn nameserver_addresses(
    resolver: &dyn Resolve,
    domain: &str,
    mname: &str,
) -> std::result::Result<Vec<IpAddr>, LookupFailure> {
    let mut addresses = Vec::new();
    push_first_address(resolver, mname, RecordType::AAAA, &mut addresses).await;
    push_first_address(resolver, mname, RecordType::A, &mut addresses).await;

    let answers = resolver.resolve(domain, RecordType::NS).await?;
    for rdata in &answers {
        if let RData::NS(ns) = rdata {
            let target = ns.0.to_string();
            push_first_address(resolver, &target, RecordType::AAAA, &mut addresses).await;
            push_first_address(resolver, &target, RecordType::A, &mut addresses).await;
        }
    }
    Ok(addresses)
}
