//! MongoDB session handle built from a `StoreConfig`

use bson::{doc, Document as BsonDocument};
use mangrove_common::Result;
use mongodb::{options::ClientOptions, Client, Collection, Database};
use tracing::{info, instrument};

use crate::config::StoreConfig;
use crate::validation::ValidatedCollectionName;

/// Shared session: a driver client plus the database queries run against
///
/// Cloning is cheap; the driver client is reference counted and owns the pool.
#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    database: Database,
}

impl Connection {
    /// Connect using the default configuration
    pub async fn new() -> Result<Self> {
        Self::with_config(&StoreConfig::default()).await
    }

    /// Connect using the given configuration
    #[instrument(skip(config), fields(database = %config.database, hosts = ?config.hosts))]
    pub async fn with_config(config: &StoreConfig) -> Result<Self> {
        let uri = config.connection_string()?;
        let mut client_options = ClientOptions::parse(uri.as_str()).await?;

        client_options.connect_timeout = Some(config.connect_timeout());
        client_options.server_selection_timeout = Some(config.connect_timeout());
        if let Some(min) = config.min_pool_size {
            client_options.min_pool_size = Some(min);
        }
        if let Some(max) = config.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(app) = &config.app_name {
            client_options.app_name = Some(app.clone());
        }

        let database_name = match (&config.uri, &client_options.default_database) {
            (Some(_), Some(name)) => name.clone(),
            _ => config.database.clone(),
        };

        let client = Client::with_options(client_options)?;
        let database = client.database(&database_name);

        info!(database = %database_name, "MongoDB client created");
        Ok(Self { client, database })
    }

    /// Wrap an existing driver client
    pub fn from_client(client: Client, database_name: &str) -> Self {
        let database = client.database(database_name);
        Self { client, database }
    }

    /// A handle on another database sharing this client
    pub fn with_database(&self, name: &str) -> Self {
        Self {
            client: self.client.clone(),
            database: self.client.database(name),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Untyped collection handle after validating the name
    pub fn collection(&self, name: &str) -> Result<Collection<BsonDocument>> {
        let name = ValidatedCollectionName::new(name)?;
        Ok(self.database.collection(name.as_str()))
    }

    /// Check the server is reachable
    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// List all collection names in the current database
    pub async fn list_collection_names(&self) -> Result<Vec<String>> {
        let names = self.database.list_collection_names().await?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangrove_common::MangroveError;

    // Nothing listens on port 1; building a client does not connect
    fn offline_config() -> StoreConfig {
        StoreConfig {
            uri: Some("mongodb://127.0.0.1:1/".to_string()),
            connect_timeout_secs: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_with_config_uses_configured_database() {
        let conn = Connection::with_config(&offline_config()).await.unwrap();
        assert_eq!(conn.database_name(), "targetdb");
    }

    #[tokio::test]
    async fn test_uri_database_takes_precedence() {
        let config = StoreConfig {
            uri: Some("mongodb://127.0.0.1:1/reports".to_string()),
            ..offline_config()
        };
        let conn = Connection::with_config(&config).await.unwrap();
        assert_eq!(conn.database_name(), "reports");
    }

    #[tokio::test]
    async fn test_test_database_selected() {
        let conn = Connection::with_config(&offline_config().use_test_database())
            .await
            .unwrap();
        assert_eq!(conn.database_name(), "testdb");
    }

    #[tokio::test]
    async fn test_with_database_shares_client() {
        let conn = Connection::with_config(&offline_config()).await.unwrap();
        let audit = conn.with_database("audit");

        assert_eq!(audit.database_name(), "audit");
        assert_eq!(conn.database_name(), "targetdb");
        assert_eq!(audit.collection("events").unwrap().namespace().db, "audit");
    }

    #[tokio::test]
    async fn test_collection_rejects_invalid_name() {
        let conn = Connection::with_config(&offline_config()).await.unwrap();
        assert!(matches!(conn.collection("bad$name"), Err(MangroveError::Validation(_))));
        assert!(matches!(conn.collection(""), Err(MangroveError::Validation(_))));
    }
}
