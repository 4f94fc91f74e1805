//! Process-wide store settings.
//!
//! The hosting application may declare a default host, port and call timeout once at
//! startup with [`configure`]. Attachments re-read these values on every access, so a
//! change made before first use is always honoured.
//!
//! Resolution order for the endpoint is: explicit per-attachment value, then the
//! process-wide default, then the built-in fallback (`localhost:27017`).
//!
//! ```ignore
//! use docattach::settings::{self, StoreSettings};
//!
//! settings::configure(StoreSettings::from_env()?);
//! ```

use std::{
    env,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    binding::Endpoint,
    error::{AttachError, AttachResult},
};

/// Built-in fallback host.
pub const DEFAULT_HOST: &str = "localhost";
/// Built-in fallback port.
pub const DEFAULT_PORT: u16 = 27017;
/// Built-in bound for a single store call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const HOST_ENV: &str = "MONGO_DEFAULT_HOST";
pub const PORT_ENV: &str = "MONGO_DEFAULT_PORT";
pub const TIMEOUT_ENV: &str = "MONGO_TIMEOUT_SECS";

static SETTINGS: RwLock<StoreSettings> = RwLock::new(StoreSettings::empty());

/// Defaults declared by the hosting application.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StoreSettings {
    /// Host used when an attachment does not name one.
    pub default_host: Option<String>,
    /// Port used when an attachment does not name one.
    pub default_port: Option<u16>,
    /// Upper bound for a single store call.
    #[serde(with = "optional_secs")]
    pub timeout: Option<Duration>,
}

impl StoreSettings {
    const fn empty() -> Self {
        Self {
            default_host: None,
            default_port: None,
            timeout: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.default_port = Some(port);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reads `MONGO_DEFAULT_HOST`, `MONGO_DEFAULT_PORT` and `MONGO_TIMEOUT_SECS`.
    ///
    /// Unset variables leave the corresponding setting empty.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::Configuration`] if the port or timeout is not a number.
    pub fn from_env() -> AttachResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AttachResult<Self> {
        let default_port = lookup(PORT_ENV)
            .map(|port| {
                port.trim().parse::<u16>().map_err(|e| {
                    AttachError::Configuration(format!("{PORT_ENV}={port:?}: {e}"))
                })
            })
            .transpose()?;
        let timeout = lookup(TIMEOUT_ENV)
            .map(|secs| {
                secs.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| AttachError::Configuration(format!("{TIMEOUT_ENV}={secs:?}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            default_host: lookup(HOST_ENV).filter(|host| !host.trim().is_empty()),
            default_port,
            timeout,
        })
    }

    /// The call bound, falling back to [`DEFAULT_TIMEOUT`].
    pub fn timeout_or_default(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

/// Replaces the process-wide settings.
pub fn configure(settings: StoreSettings) {
    *SETTINGS.write().unwrap_or_else(PoisonError::into_inner) = settings;
}

/// Returns a snapshot of the process-wide settings.
pub fn current() -> StoreSettings {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Clears the process-wide settings back to the built-in fallbacks.
pub fn reset() {
    configure(StoreSettings::empty());
}

/// Resolves the endpoint for an attachment.
pub fn resolve_endpoint(host: Option<&str>, port: Option<u16>) -> Endpoint {
    let settings = current();

    Endpoint::new(
        host.map(str::to_string)
            .or(settings.default_host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port.or(settings.default_port).unwrap_or(DEFAULT_PORT),
    )
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
