use rusqlite::Connection;

use crate::error::FmsError;

pub fn run_migrations(conn: &Connection) -> Result<(), FmsError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            email TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS templates (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            shift_weekend INTEGER NOT NULL DEFAULT 0,
            approver TEXT,
            steps TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            template_id TEXT NOT NULL REFERENCES templates(id),
            spawned_from TEXT,
            approver TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'completed')),
            has_pending_objections INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1,
            document TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS score_logs (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            task_seq INTEGER NOT NULL,
            assignee TEXT NOT NULL,
            planned_days INTEGER NOT NULL,
            actual_days INTEGER NOT NULL,
            score REAL NOT NULL,
            on_time INTEGER NOT NULL,
            score_impacted INTEGER NOT NULL,
            reason TEXT NOT NULL,
            logged_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS outbox_events (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            topic TEXT NOT NULL CHECK (topic IN ('score_log', 'trigger')),
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'done', 'failed')),
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_projects_approver ON projects(approver, has_pending_objections);
        CREATE INDEX IF NOT EXISTS idx_projects_template ON projects(template_id);
        CREATE INDEX IF NOT EXISTS idx_score_logs_project ON score_logs(project_id, task_seq);
        CREATE INDEX IF NOT EXISTS idx_outbox_pending ON outbox_events(status, created_at)
            WHERE status = 'pending';
        ",
    )?;
    Ok(())
}
