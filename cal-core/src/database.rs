use crate::common::error::{EtlError, Result};
use libsql::{Builder, Connection, Database};
use std::env;
use tracing::info;

pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    /// Create a new database manager with connection to Turso
    pub async fn new() -> Result<Self> {
        let url = env::var("LIBSQL_URL").map_err(|_| EtlError::Database {
            message: "LIBSQL_URL environment variable not set".to_string(),
        })?;

        let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| EtlError::Database {
            message: "LIBSQL_AUTH_TOKEN environment variable not set".to_string(),
        })?;

        info!("Connecting to Turso database at {}", url);

        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| EtlError::Database {
                message: format!("Failed to connect to database: {e}"),
            })?;

        Ok(Self { db })
    }

    /// Get a connection to the database
    pub async fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| EtlError::Database {
            message: format!("Failed to get database connection: {e}"),
        })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_connection().await?;

        // Apply base schema
        let migration_sql_001 = include_str!("../migrations/001_create_nodes.sql");
        conn.execute_batch(migration_sql_001)
            .await
            .map_err(|e| EtlError::Database {
                message: format!("Failed to run base migration: {e}"),
            })?;

        // Apply indexes and PRAGMAs
        let migration_sql_002 = include_str!("../migrations/002_indexes_and_pragmas.sql");
        conn.execute_batch(migration_sql_002)
            .await
            .map_err(|e| EtlError::Database {
                message: format!("Failed to run index migration: {e}"),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Create or update a node in the database (upsert)
    pub async fn create_node(&self, id: &str, label: &str, data: &str) -> Result<()> {
        let conn = self.get_connection().await?;

        // Use explicit ON CONFLICT(id) DO UPDATE to avoid destructive REPLACE semantics
        conn.execute(
            "INSERT INTO nodes (id, label, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, COALESCE((SELECT created_at FROM nodes WHERE id = ?1), datetime('now')), datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
               data = excluded.data,
               updated_at = excluded.updated_at",
            libsql::params![id, label, data],
        )
        .await
        .map_err(|e| EtlError::Database {
            message: format!("Failed to upsert node: {e}"),
        })?;

        Ok(())
    }

    /// Get all nodes by label
    pub async fn get_nodes_by_label(&self, label: &str) -> Result<Vec<(String, String, String)>> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT id, label, data FROM nodes WHERE label = ?",
                libsql::params![label],
            )
            .await
            .map_err(|e| EtlError::Database {
                message: format!("Failed to query nodes: {e}"),
            })?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| EtlError::Database {
            message: format!("Failed to read row: {e}"),
        })? {
            let id: String = row.get(0).map_err(|e| EtlError::Database {
                message: format!("Failed to get id: {e}"),
            })?;
            let label: String = row.get(1).map_err(|e| EtlError::Database {
                message: format!("Failed to get label: {e}"),
            })?;
            let data: String = row.get(2).map_err(|e| EtlError::Database {
                message: format!("Failed to get data: {e}"),
            })?;

            results.push((id, label, data));
        }

        Ok(results)
    }

    /// Count nodes carrying a label
    pub async fn count_nodes_by_label(&self, label: &str) -> Result<i64> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM nodes WHERE label = ?",
                libsql::params![label],
            )
            .await
            .map_err(|e| EtlError::Database {
                message: format!("Failed to count nodes: {e}"),
            })?;

        if let Some(row) = rows.next().await.map_err(|e| EtlError::Database {
            message: format!("Failed to read row: {e}"),
        })? {
            let count: i64 = row.get(0).map_err(|e| EtlError::Database {
                message: format!("Failed to get count: {e}"),
            })?;
            Ok(count)
        } else {
            Ok(0)
        }
    }

    /// Delete a node by ID
    pub async fn delete_node(&self, id: &str) -> Result<()> {
        let conn = self.get_connection().await?;

        conn.execute("DELETE FROM nodes WHERE id = ?", libsql::params![id])
            .await
            .map_err(|e| EtlError::Database {
                message: format!("Failed to delete node: {e}"),
            })?;

        Ok(())
    }
}
