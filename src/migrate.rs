use anyhow::Result;
use sqlx::SqlitePool;

/// Create the `projects` and `screens` tables. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per analyzed screen; `position` is the upload order within a project.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS screens (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            analysis_json TEXT NOT NULL,
            image_identifier TEXT NOT NULL,
            image_url TEXT NOT NULL,
            image_created_at TEXT NOT NULL,
            context_id TEXT NOT NULL,
            UNIQUE(project_id, position),
            FOREIGN KEY (project_id) REFERENCES projects(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_screens_project_id ON screens(project_id, position)")
        .execute(pool)
        .await?;

    Ok(())
}
