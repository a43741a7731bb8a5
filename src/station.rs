//! Station identity shared by every remote dispatch in one workflow run.
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Where the station id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StationOrigin {
    /// Supplied by the caller as the run/session/thread identity.
    RunIdentity,
    /// Fell back to the configured default.
    Default,
}

impl StationOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationOrigin::RunIdentity => "run_identity",
            StationOrigin::Default => "default",
        }
    }
}

impl fmt::Display for StationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronization scope for one run. Computed once, then only cloned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationContext {
    station_id: String,
    shared_variable_names: BTreeSet<String>,
    origin: StationOrigin,
}

impl StationContext {
    /// Derive the station from the run identity, falling back to
    /// `default_station_id` when the identity is missing or blank.
    pub fn derive<I, S>(run_id: Option<&str>, default_station_id: &str, shared: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (station_id, origin) = match run_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => (id.to_string(), StationOrigin::RunIdentity),
            None => (default_station_id.to_string(), StationOrigin::Default),
        };
        let shared_variable_names = shared
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| !name.trim().is_empty())
            .collect();
        tracing::debug!(%station_id, %origin, "station derived");
        Self {
            station_id,
            shared_variable_names,
            origin,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn shared_variable_names(&self) -> &BTreeSet<String> {
        &self.shared_variable_names
    }

    pub fn origin(&self) -> StationOrigin {
        self.origin
    }

    /// The caller-supplied run identity, if the station was derived from one.
    pub fn run_identity(&self) -> Option<&str> {
        match self.origin {
            StationOrigin::RunIdentity => Some(&self.station_id),
            StationOrigin::Default => None,
        }
    }
}
