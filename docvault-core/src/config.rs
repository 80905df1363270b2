//! Connection and crypto configuration for record types.
//!
//! A [`ConnectionConfig`] is supplied per record type through
//! [`Record::db_config`](crate::record::Record::db_config). It names the servers to dial, the
//! database to use and, optionally, the key used by the field crypto pass.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use docvault::config::{ConnectionConfig, CryptoConfig};
//!
//! let config = ConnectionConfig::new("localhost:27017", "app")
//!     .with_timeout(Duration::from_secs(5))
//!     .with_crypto(CryptoConfig::new(b"7E892875A52C59A3B588306B13C31FBD".to_vec()));
//! ```

use std::{env, fmt, time::Duration};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{RecordStoreError, RecordStoreResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const SCHEMES: [&str; 2] = ["mongodb+srv://", "mongodb://"];

/// Configuration keys for field encryption and decryption.
///
/// The key is zeroized when the configuration is dropped and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CryptoConfig {
    aes_secret: Vec<u8>,
}

impl CryptoConfig {
    /// Creates a crypto configuration from raw AES key bytes (16, 24 or 32 bytes).
    pub fn new(aes_secret: impl Into<Vec<u8>>) -> Self {
        Self { aes_secret: aes_secret.into() }
    }

    /// Returns the AES key bytes.
    pub fn aes_secret(&self) -> &[u8] {
        &self.aes_secret
    }
}

impl fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoConfig")
            .field("aes_secret", &"[REDACTED]")
            .finish()
    }
}

/// Determines how a record type connects to its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Comma separated list of servers, optionally prefixed with a `mongodb://` scheme.
    /// This exact string is the connection registry key.
    pub servers: String,
    /// Name of the database the record type is stored in.
    pub database: String,
    /// Upper bound for establishing a connection.
    pub timeout: Duration,
    /// Whether the connection must be made over TLS.
    pub tls: bool,
    /// Key material for fields marked for encryption.
    pub crypto: Option<CryptoConfig>,
}

impl ConnectionConfig {
    pub fn new(servers: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            servers: servers.into(),
            database: database.into(),
            timeout: DEFAULT_TIMEOUT,
            tls: false,
            crypto: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_crypto(mut self, crypto: CryptoConfig) -> Self {
        self.crypto = Some(crypto);
        self
    }

    /// Loads a configuration from the process environment.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `MONGODB_SERVERS` | server list (required) |
    /// | `MONGODB_NAME` | database name (required) |
    /// | `MONGODB_TIMEOUT` | connect timeout in milliseconds (default 10000) |
    /// | `MONGODB_SSL` | `true` or `1` to require TLS |
    /// | `MONGODB_AES_SECRET` | AES key for encrypted fields |
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Configuration`] if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> RecordStoreResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> RecordStoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| RecordStoreError::Configuration(format!("{key} is not set")))
        };

        let mut config = Self::new(required("MONGODB_SERVERS")?, required("MONGODB_NAME")?);

        if let Some(timeout) = lookup("MONGODB_TIMEOUT") {
            let millis = timeout.trim().parse::<u64>().map_err(|e| {
                RecordStoreError::Configuration(format!("MONGODB_TIMEOUT: {e}"))
            })?;
            config.timeout = Duration::from_millis(millis);
        }

        if let Some(tls) = lookup("MONGODB_SSL") {
            config.tls = matches!(tls.trim().to_ascii_lowercase().as_str(), "true" | "1");
        }

        if let Some(secret) = lookup("MONGODB_AES_SECRET").filter(|s| !s.is_empty()) {
            config.crypto = Some(CryptoConfig::new(secret.into_bytes()));
        }

        Ok(config)
    }

    /// Splits [`servers`](Self::servers) into individual `host[:port]` entries.
    ///
    /// A leading `mongodb://` or `mongodb+srv://` scheme, credentials and any trailing
    /// `/database?options` section are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidAddress`] if the list is empty or a host is malformed.
    pub fn server_list(&self) -> RecordStoreResult<Vec<String>> {
        let mut rest = self.servers.trim();
        for scheme in SCHEMES {
            if let Some(stripped) = rest.strip_prefix(scheme) {
                rest = stripped;
                break;
            }
        }
        if let Some((_, hosts)) = rest.rsplit_once('@') {
            rest = hosts;
        }
        if let Some((hosts, _)) = rest.split_once('/') {
            rest = hosts;
        }

        if rest.is_empty() {
            return Err(RecordStoreError::InvalidAddress(format!(
                "no servers in {:?}",
                self.servers
            )));
        }

        rest.split(',')
            .map(|host| {
                let host = host.trim();
                let valid_port = match host.rsplit_once(':') {
                    Some((name, port)) => !name.is_empty() && port.parse::<u16>().is_ok(),
                    None => true,
                };
                if host.is_empty() || host.contains(char::is_whitespace) || !valid_port {
                    Err(RecordStoreError::InvalidAddress(format!(
                        "malformed server {host:?} in {:?}",
                        self.servers
                    )))
                } else {
                    Ok(host.to_string())
                }
            })
            .collect()
    }

    /// Returns `true` if [`servers`](Self::servers) already carries a connection string scheme.
    pub fn has_scheme(&self) -> bool {
        SCHEMES
            .iter()
            .any(|scheme| self.servers.trim().starts_with(scheme))
    }
}
