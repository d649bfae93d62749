//! # zapbot-catalog
//!
//! Read-only business content backed by SQLite: the services list and the
//! about/audience snippets the bot answers directly, without a provider
//! round-trip. The operator seeds rows out of band; the bot only reads.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;
use zapbot_core::{config::CatalogConfig, error::ZapError, shellexpand};

/// Snippet topic for the "sobre" reply.
pub const TOPIC_ABOUT: &str = "about";
/// Snippet topic for audience/positioning content.
pub const TOPIC_AUDIENCE: &str = "audience";

/// One offered service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub description: String,
}

/// SQLite-backed content catalog.
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Open (or create) the catalog database and apply the schema.
    pub async fn new(config: &CatalogConfig) -> Result<Self, ZapError> {
        let db_path = shellexpand(&config.db_path);

        if db_path != ":memory:" {
            if let Some(parent) = std::path::Path::new(&db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ZapError::Catalog(format!("failed to create data dir: {e}"))
                    })?;
                }
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| ZapError::Catalog(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Single connection: catalog traffic is tiny, and it keeps
        // `:memory:` databases (one per connection) coherent in tests.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| ZapError::Catalog(format!("failed to connect to sqlite: {e}")))?;

        Self::init_schema(&pool).await?;

        info!("Catalog initialized at {db_path}");

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), ZapError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS snippets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                content TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_snippets_topic ON snippets(topic);",
        )
        .execute(pool)
        .await
        .map_err(|e| ZapError::Catalog(format!("failed to apply schema: {e}")))?;

        Ok(())
    }

    /// List all offered services, in insertion order.
    pub async fn list_services(&self) -> Result<Vec<Service>, ZapError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, description FROM services ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ZapError::Catalog(format!("query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(name, description)| Service { name, description })
            .collect())
    }

    /// List snippets for a topic (e.g. [`TOPIC_ABOUT`]), in insertion order.
    pub async fn snippets(&self, topic: &str) -> Result<Vec<String>, ZapError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT content FROM snippets WHERE topic = ? ORDER BY id")
                .bind(topic)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ZapError::Catalog(format!("query failed: {e}")))?;

        Ok(rows.into_iter().map(|(content,)| content).collect())
    }

    /// Add a service. Used by seeding and tests.
    pub async fn add_service(&self, name: &str, description: &str) -> Result<(), ZapError> {
        sqlx::query("INSERT INTO services (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(|e| ZapError::Catalog(format!("insert failed: {e}")))?;
        Ok(())
    }

    /// Add a snippet under a topic. Used by seeding and tests.
    pub async fn add_snippet(&self, topic: &str, content: &str) -> Result<(), ZapError> {
        sqlx::query("INSERT INTO snippets (topic, content) VALUES (?, ?)")
            .bind(topic)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(|e| ZapError::Catalog(format!("insert failed: {e}")))?;
        Ok(())
    }
}

/// Render the service list as a WhatsApp reply.
pub fn format_services(services: &[Service]) -> String {
    if services.is_empty() {
        return "⚠️ Nenhum serviço encontrado.".to_string();
    }

    let lines: Vec<String> = services
        .iter()
        .map(|s| format!("• {} — {}", s.name, s.description))
        .collect();

    format!("🛒 Serviços disponíveis:\n\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_catalog() -> Catalog {
        Catalog::new(&CatalogConfig {
            db_path: ":memory:".into(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_catalog_lists_nothing() {
        let catalog = memory_catalog().await;
        assert!(catalog.list_services().await.unwrap().is_empty());
        assert!(catalog.snippets(TOPIC_ABOUT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_services_round_trip_in_order() {
        let catalog = memory_catalog().await;
        catalog
            .add_service("Site institucional", "presença digital completa")
            .await
            .unwrap();
        catalog
            .add_service("Identidade visual", "logo e materiais")
            .await
            .unwrap();

        let services = catalog.list_services().await.unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "Site institucional");
        assert_eq!(services[1].name, "Identidade visual");
    }

    #[tokio::test]
    async fn test_snippets_filtered_by_topic() {
        let catalog = memory_catalog().await;
        catalog
            .add_snippet(TOPIC_ABOUT, "Somos a Criaté.")
            .await
            .unwrap();
        catalog
            .add_snippet(TOPIC_AUDIENCE, "Pequenos negócios locais.")
            .await
            .unwrap();

        let about = catalog.snippets(TOPIC_ABOUT).await.unwrap();
        assert_eq!(about, vec!["Somos a Criaté.".to_string()]);
    }

    #[test]
    fn test_format_services_empty() {
        assert_eq!(format_services(&[]), "⚠️ Nenhum serviço encontrado.");
    }

    #[test]
    fn test_format_services_listing() {
        let services = vec![Service {
            name: "Site".into(),
            description: "institucional".into(),
        }];
        let reply = format_services(&services);
        assert!(reply.starts_with("🛒 Serviços disponíveis:"));
        assert!(reply.contains("• Site — institucional"));
    }
}
