//! SQLite-backed project and screen persistence.
//!
//! Projects live in `projects`; each analyzed screen is a row in `screens`
//! carrying its upload `position`, the validated analysis as JSON text, the
//! image reference, and the id of the context document written for it.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use reqforge_core::models::{ImageRef, Project, Screen};
use reqforge_core::store::ProjectStore;

/// Project listing entry for the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub screen_count: i64,
    /// ISO8601
    pub created_at: String,
}

pub struct SqliteProjectStore {
    pool: SqlitePool,
}

impl SqliteProjectStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            bail!("project name must not be empty");
        }

        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO projects (id, name, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(description)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(Project {
            id,
            name: name.to_string(),
            description: description.to_string(),
            screens: Vec::new(),
        })
    }

    /// All projects, newest first.
    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.description, p.created_at,
                   (SELECT COUNT(*) FROM screens s WHERE s.project_id = p.id) AS screen_count
            FROM projects p
            ORDER BY p.created_at DESC, p.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let created_at: i64 = row.get("created_at");
                ProjectSummary {
                    id: row.get("id"),
                    name: row.get("name"),
                    description: row.get("description"),
                    screen_count: row.get("screen_count"),
                    created_at: format_ts_iso(created_at),
                }
            })
            .collect())
    }

    async fn load_screens(&self, project_id: &str) -> Result<Vec<Screen>> {
        let rows = sqlx::query(
            r#"
            SELECT id, analysis_json, image_identifier, image_url, image_created_at, context_id
            FROM screens
            WHERE project_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(screen_from_row).collect())
    }
}

fn screen_from_row(row: &SqliteRow) -> Screen {
    Screen {
        id: row.get("id"),
        screen: row.get("analysis_json"),
        image: ImageRef {
            identifier: row.get("image_identifier"),
            url: row.get("image_url"),
            created_at: row.get("image_created_at"),
        },
        context_id: row.get("context_id"),
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}

#[async_trait]
impl ProjectStore for SqliteProjectStore {
    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT id, name, description FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Project {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            screens: self.load_screens(id).await?,
        }))
    }

    async fn append_screen(&self, project_id: &str, screen: &Screen) -> Result<Project> {
        // Position is computed inside the write so concurrent appends
        // serialize on the write lock.
        let result = sqlx::query(
            r#"
            INSERT INTO screens
                (id, project_id, position, analysis_json, image_identifier, image_url, image_created_at, context_id)
            SELECT ?, p.id,
                   (SELECT COALESCE(MAX(s.position) + 1, 0) FROM screens s WHERE s.project_id = p.id),
                   ?, ?, ?, ?, ?
            FROM projects p
            WHERE p.id = ?
            "#,
        )
        .bind(&screen.id)
        .bind(&screen.screen)
        .bind(&screen.image.identifier)
        .bind(&screen.image.url)
        .bind(&screen.image.created_at)
        .bind(&screen.context_id)
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("project not found: {}", project_id);
        }

        match self.get_project(project_id).await? {
            Some(project) => Ok(project),
            None => bail!("project not found: {}", project_id),
        }
    }
}
