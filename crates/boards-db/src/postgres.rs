//! Postgres-backed store: blocks, system settings, workspace teams and the
//! outbound message queue.

use anyhow::Context;
use boards_core::constants::CARD_LIMIT_TIMESTAMP_SETTING;
use boards_core::models::{Block, BlockType, Container, License, Team};
use boards_core::{AppError, Config};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::store::BoardsStore;

/// Connect to Postgres and apply pending migrations.
pub async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to use the Postgres store")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Row type for the blocks table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct BlockRow {
    pub id: String,
    pub workspace_id: String,
    pub parent_id: String,
    pub root_id: String,
    pub created_by: String,
    pub modified_by: String,
    pub schema: i64,
    #[sqlx(rename = "type")]
    pub block_type: String,
    pub title: String,
    pub fields: Option<Json<Map<String, Value>>>,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
}

impl BlockRow {
    pub fn to_block(self) -> Block {
        Block {
            id: self.id,
            parent_id: self.parent_id,
            root_id: self.root_id,
            created_by: self.created_by,
            modified_by: self.modified_by,
            schema: self.schema,
            block_type: BlockType::parse(&self.block_type),
            title: self.title,
            fields: self.fields.map(|Json(fields)| fields),
            create_at: self.create_at,
            update_at: self.update_at,
            delete_at: self.delete_at,
            workspace_id: self.workspace_id,
            limited: false,
        }
    }
}

// Live cards whose board is not a template. A missing board counts as a
// regular board.
const COUNTED_CARDS: &str = r#"
    FROM blocks c
    LEFT JOIN blocks b ON b.id = c.root_id AND b.workspace_id = c.workspace_id
    WHERE c.type = 'card'
      AND c.delete_at = 0
      AND NOT COALESCE(b.fields -> 'isTemplate' = 'true'::jsonb, false)
"#;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    license: Option<License>,
}

impl PostgresStore {
    /// The license belongs to the host, so it is handed in rather than queried.
    pub fn new(pool: PgPool, license: Option<License>) -> Self {
        Self { pool, license }
    }

    #[tracing::instrument(skip(self), fields(db.table = "system_settings"))]
    async fn set_system_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO system_settings (id, value)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BoardsStore for PostgresStore {
    async fn get_license(&self) -> Option<License> {
        self.license.clone()
    }

    #[tracing::instrument(skip(self), fields(db.table = "system_settings"))]
    async fn get_card_limit_timestamp(&self) -> Result<i64, AppError> {
        let value: Option<String> =
            sqlx::query_scalar::<Postgres, String>("SELECT value FROM system_settings WHERE id = $1")
                .bind(CARD_LIMIT_TIMESTAMP_SETTING)
                .fetch_optional(&self.pool)
                .await?;

        match value {
            None => Ok(0),
            Some(value) => value.parse::<i64>().map_err(|e| {
                AppError::Internal(format!(
                    "invalid card limit timestamp '{}': {}",
                    value, e
                ))
            }),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "blocks"))]
    async fn update_card_limit_timestamp(&self, card_limit: i32) -> Result<i64, AppError> {
        let timestamp = if card_limit <= 0 {
            0
        } else {
            let query = format!(
                "SELECT c.update_at {} ORDER BY c.update_at DESC LIMIT 1 OFFSET $1",
                COUNTED_CARDS
            );
            sqlx::query_scalar::<Postgres, i64>(&query)
                .bind(i64::from(card_limit) - 1)
                .fetch_optional(&self.pool)
                .await?
                .unwrap_or(0)
        };

        self.set_system_setting(CARD_LIMIT_TIMESTAMP_SETTING, &timestamp.to_string())
            .await?;

        tracing::debug!(card_limit, timestamp, "Card limit timestamp stored");
        Ok(timestamp)
    }

    #[tracing::instrument(skip(self), fields(db.table = "blocks"))]
    async fn get_used_cards_count(&self) -> Result<i64, AppError> {
        let query = format!("SELECT COUNT(*) {}", COUNTED_CARDS);
        let count = sqlx::query_scalar::<Postgres, i64>(&query)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "blocks", workspace_id = %container.workspace_id, count = ids.len()))]
    async fn get_blocks_by_ids(
        &self,
        container: &Container,
        ids: &[String],
    ) -> Result<Vec<Block>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<BlockRow> = sqlx::query_as::<Postgres, BlockRow>(
            r#"
            SELECT id, workspace_id, parent_id, root_id, created_by, modified_by,
                   schema, type, title, fields, create_at, update_at, delete_at
            FROM blocks
            WHERE workspace_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(&container.workspace_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BlockRow::to_block).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "workspace_teams"))]
    async fn get_workspace_team(&self, workspace_id: &str) -> Result<Option<Team>, AppError> {
        let row: Option<(String, String)> = sqlx::query_as::<Postgres, (String, String)>(
            "SELECT team_id, display_name FROM workspace_teams WHERE workspace_id = $1",
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, display_name)| Team { id, display_name }))
    }

    #[tracing::instrument(skip(self, message, recipients), fields(db.table = "outbound_messages", count = recipients.len()))]
    async fn send_message(
        &self,
        message: &str,
        post_type: &str,
        recipients: &[String],
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO outbound_messages (id, message, post_type, recipients, create_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message)
        .bind(post_type)
        .bind(recipients)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
