use async_trait::async_trait;
use bson::doc;
use mongodb::{
    Client,
    options::{ClientOptions, Tls, TlsOptions},
};
use tracing::debug;

use docvault_core::{
    backend::{Connector, ConnectorBuilder},
    config::ConnectionConfig,
    error::{RecordStoreError, RecordStoreResult},
};

use crate::session::{MongoSession, map_driver_error};


/// Dials MongoDB deployments with the official driver.
#[derive(Debug, Default, Clone)]
pub struct MongoConnector {
    app_name: Option<String>,
}

impl MongoConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MongoConnectorBuilder {
        MongoConnectorBuilder::default()
    }

    async fn client_options(&self, config: &ConnectionConfig) -> RecordStoreResult<ClientOptions> {
        config.server_list()?;

        let uri = connection_uri(config);
        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| RecordStoreError::InvalidAddress(e.to_string()))?;

        options.connect_timeout = Some(config.timeout);
        options.server_selection_timeout = Some(config.timeout);

        if config.tls {
            options.tls = Some(Tls::Enabled(TlsOptions::default()));
        }
        if self.app_name.is_some() {
            options.app_name = self.app_name.clone();
        }

        Ok(options)
    }
}

/// Builds the connection string for `config`, adding the `mongodb://` scheme when the servers
/// string is a bare host list.
pub(crate) fn connection_uri(config: &ConnectionConfig) -> String {
    let servers = config.servers.trim();

    if config.has_scheme() {
        servers.to_string()
    } else {
        format!("mongodb://{servers}")
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Session = MongoSession;

    async fn dial(&self, config: &ConnectionConfig) -> RecordStoreResult<Self::Session> {
        let options = self.client_options(config).await?;
        let client = Client::with_options(options)
            .map_err(|e| RecordStoreError::Configuration(e.to_string()))?;

        // The driver connects lazily; a ping surfaces unreachable servers now.
        client
            .database(&config.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(map_driver_error)?;

        debug!(servers = %config.servers, tls = config.tls, "connected to mongodb");

        Ok(MongoSession::new(client))
    }
}


/// Builder for constructing [`MongoConnector`] instances.
///
/// # Example
///
/// ```ignore
/// use docvault::{backend::ConnectorBuilder, mongodb::MongoConnector};
///
/// let connector = MongoConnector::builder()
///     .app_name("billing")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct MongoConnectorBuilder {
    app_name: Option<String>,
}

impl MongoConnectorBuilder {
    /// Sets the application name reported to the server.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }
}

#[async_trait]
impl ConnectorBuilder for MongoConnectorBuilder {
    type Connector = MongoConnector;

    async fn build(self) -> RecordStoreResult<Self::Connector> {
        Ok(MongoConnector {
            app_name: self.app_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn bare_hosts_get_a_scheme() {
        let config = ConnectionConfig::new("db1:27017,db2:27017", "app");
        assert_eq!(connection_uri(&config), "mongodb://db1:27017,db2:27017");

        let config = ConnectionConfig::new("mongodb+srv://cluster.example.com", "app");
        assert_eq!(connection_uri(&config), "mongodb+srv://cluster.example.com");
    }

    #[tokio::test]
    async fn options_carry_timeout_tls_and_app_name() {
        let connector = MongoConnector::builder().app_name("billing").build().await.unwrap();
        let config = ConnectionConfig::new("localhost:27017", "app")
            .with_timeout(Duration::from_millis(250))
            .with_tls(true);

        let options = connector.client_options(&config).await.unwrap();

        assert_eq!(options.connect_timeout, Some(Duration::from_millis(250)));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_millis(250)));
        assert!(matches!(options.tls, Some(Tls::Enabled(_))));
        assert_eq!(options.app_name.as_deref(), Some("billing"));
    }

    #[tokio::test]
    async fn malformed_servers_are_rejected_before_dialing() {
        let err = MongoConnector::new()
            .dial(&ConnectionConfig::new("bad host", "app"))
            .await
            .unwrap_err();

        assert!(matches!(err, RecordStoreError::InvalidAddress(_)));
    }
}
