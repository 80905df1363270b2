//! Connection registry: one master session per server set.
//!
//! The registry lazily dials a master session the first time a given
//! [`ConnectionConfig::servers`] string is requested and hands out copies of it afterwards.
//! The servers string is matched exactly; two spellings of the same cluster get two masters.
//!
//! Lookups of an existing master take the shared read lock only. Creating a master takes the
//! write lock and repeats the lookup, so concurrent first requests for the same servers dial
//! exactly once.

use mea::rwlock::RwLock;
use std::{
    collections::HashMap,
    fmt,
    ops::{Deref, DerefMut},
};
use tracing::{debug, info, warn};

use crate::{
    backend::{Connector, SessionBackend},
    config::ConnectionConfig,
    error::RecordStoreResult,
};

/// Caches one master session per server set and hands out per-operation copies.
pub struct ConnectionRegistry<C: Connector> {
    connector: C,
    masters: RwLock<HashMap<String, C::Session>>,
}

impl<C: Connector> ConnectionRegistry<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            masters: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the connector used to dial new masters.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns a session copy for `config.servers`, dialing a master first if none exists.
    ///
    /// # Errors
    ///
    /// Dial errors are returned unchanged. A failed dial caches nothing, so the next call dials
    /// again.
    pub async fn acquire(&self, config: &ConnectionConfig) -> RecordStoreResult<Session<C::Session>> {
        if let Some(master) = self.masters.read().await.get(&config.servers) {
            debug!(servers = %config.servers, "reusing master session");
            return Ok(Session::new(master.copy()));
        }

        let mut masters = self.masters.write().await;

        // Another task may have dialed while we waited for the write lock.
        if let Some(master) = masters.get(&config.servers) {
            debug!(servers = %config.servers, "master session created concurrently");
            return Ok(Session::new(master.copy()));
        }

        let master = self.connector.dial(config).await.inspect_err(|e| {
            warn!(servers = %config.servers, error = %e, "dial failed");
        })?;
        info!(servers = %config.servers, tls = config.tls, "dialed new master session");

        let session = Session::new(master.copy());
        masters.insert(config.servers.clone(), master);

        Ok(session)
    }

    /// Returns the number of cached master sessions.
    pub async fn len(&self) -> usize {
        self.masters.read().await.len()
    }

    /// Returns `true` if no master session has been created yet.
    pub async fn is_empty(&self) -> bool {
        self.masters.read().await.is_empty()
    }

    /// Returns `true` if a master session exists for exactly `servers`.
    pub async fn contains(&self, servers: &str) -> bool {
        self.masters.read().await.contains_key(servers)
    }
}

impl<C: Connector> fmt::Debug for ConnectionRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}

/// A per-operation session copy, closed when dropped.
#[derive(Debug)]
pub struct Session<S: SessionBackend> {
    inner: S,
}

impl<S: SessionBackend> Session<S> {
    fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: SessionBackend> Deref for Session<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<S: SessionBackend> DerefMut for Session<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<S: SessionBackend> Drop for Session<S> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
