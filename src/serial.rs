//! SOA serial computation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use hickory_proto::rr::{RData, RecordType};
use tracing::{debug, warn};

use crate::error::{Result, TempleError};
use crate::resolver::{nameserver_addresses, LookupFailure, Resolve};

/// How `_serial` is computed, from `config.serial`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerialMode {
    /// Seconds since the epoch.
    #[default]
    UnixTime,
    /// `YYYYMMDD00` for the current UTC date.
    DateSerial,
    /// One more than the highest of the live serial and yesterday's date serial.
    Online,
    /// A fixed value.
    Fixed(u32),
}

impl FromStr for SerialMode {
    type Err = TempleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unixtime" => Ok(Self::UnixTime),
            "dateserial" => Ok(Self::DateSerial),
            "online" => Ok(Self::Online),
            other => other
                .trim()
                .parse()
                .map(Self::Fixed)
                .map_err(|_| TempleError::UnknownSerialMode(other.to_string())),
        }
    }
}

impl fmt::Display for SerialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnixTime => f.write_str("unixtime"),
            Self::DateSerial => f.write_str("dateserial"),
            Self::Online => f.write_str("online"),
            Self::Fixed(serial) => write!(f, "{serial}"),
        }
    }
}

/// `YYYYMMDD00` for `date`.
pub fn serial_for_date(date: NaiveDate) -> u32 {
    date.year() as u32 * 1_000_000 + date.month() * 10_000 + date.day() * 100
}

/// Seconds since the epoch at `now`.
pub fn serial_for_time(now: DateTime<Utc>) -> u32 {
    now.timestamp() as u32
}

enum OnlineError {
    Lookup(LookupFailure),
    Fatal(TempleError),
}

impl From<LookupFailure> for OnlineError {
    fn from(failure: LookupFailure) -> Self {
        Self::Lookup(failure)
    }
}

impl From<TempleError> for OnlineError {
    fn from(err: TempleError) -> Self {
        Self::Fatal(err)
    }
}

/// Computes serials, querying DNS through `resolver` in [`SerialMode::Online`].
pub struct SerialProvider<'a> {
    resolver: Option<&'a dyn Resolve>,
}

impl<'a> SerialProvider<'a> {
    /// Provider without DNS access. [`SerialMode::Online`] falls back to the
    /// date serial.
    pub fn offline() -> Self {
        Self { resolver: None }
    }

    /// Provider that queries `resolver` in online mode.
    pub fn new(resolver: &'a dyn Resolve) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    /// Serial for `domain` right now.
    pub async fn serial(&self, domain: &str, mode: SerialMode) -> Result<u32> {
        self.serial_at(domain, mode, Utc::now()).await
    }

    /// Serial for `domain` as if the current time were `now`.
    pub async fn serial_at(&self, domain: &str, mode: SerialMode, now: DateTime<Utc>) -> Result<u32> {
        match mode {
            SerialMode::UnixTime => Ok(serial_for_time(now)),
            SerialMode::DateSerial => Ok(serial_for_date(now.date_naive())),
            SerialMode::Fixed(serial) => Ok(serial),
            SerialMode::Online => self.online_serial(domain, now).await,
        }
    }

    async fn online_serial(&self, domain: &str, now: DateTime<Utc>) -> Result<u32> {
        let mut floor = serial_for_date(now.date_naive()) - 1;
        let outcome = match self.resolver {
            Some(resolver) => raise_from_dns(resolver, domain, &mut floor).await,
            None => Err(OnlineError::Lookup(LookupFailure::new(
                domain,
                RecordType::SOA,
                "no resolver available",
            ))),
        };
        match outcome {
            Ok(()) => {}
            Err(OnlineError::Lookup(failure)) => {
                warn!(
                    "Could not obtain current SOA serial for {domain} ({failure}), falling back to {}",
                    floor.wrapping_add(1)
                );
            }
            Err(OnlineError::Fatal(err)) => return Err(err),
        }
        Ok(floor.wrapping_add(1))
    }
}

/// Raise `floor` to the serial seen by the default resolver, then to the
/// serial seen by the zone's own nameservers.
async fn raise_from_dns(
    resolver: &dyn Resolve,
    domain: &str,
    floor: &mut u32,
) -> std::result::Result<(), OnlineError> {
    let (serial, mname) = query_soa(resolver, domain).await?;
    debug!(domain, serial, %mname, "SOA from default resolver");
    *floor = (*floor).max(serial);

    let addresses = nameserver_addresses(resolver, domain, &mname).await?;
    if addresses.is_empty() {
        return Err(TempleError::NoNameservers {
            domain: domain.to_string(),
            mname,
        }
        .into());
    }
    debug!(domain, ?addresses, "asking zone nameservers");
    let authoritative = resolver.restricted_to(&addresses)?;
    let (serial, _) = query_soa(authoritative.as_ref(), domain).await?;
    debug!(domain, serial, "SOA from zone nameservers");
    *floor = (*floor).max(serial);
    Ok(())
}

async fn query_soa(
    resolver: &dyn Resolve,
    domain: &str,
) -> std::result::Result<(u32, String), LookupFailure> {
    let answers = resolver.resolve(domain, RecordType::SOA).await?;
    answers
        .iter()
        .find_map(|rdata| match rdata {
            RData::SOA(soa) => Some((soa.serial(), soa.mname().to_string())),
            _ => None,
        })
        .ok_or_else(|| LookupFailure::new(domain, RecordType::SOA, "no SOA record in answer"))
}
