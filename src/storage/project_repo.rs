//! Project repository scoped by account

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::project::Coordinate;
use crate::models::summary::{tag_summaries, GradeCount, SendsSummary, TagKind, TagSummary};
use crate::models::Project;

const PROJECT_COLUMNS: &str = "id, created_at, sent_at, image_path, is_sent, attempts, grade, \
                               is_active, coordinates_json, style_json, holds_json";

/// Repository for projects and uploaded assets
pub struct ProjectRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ProjectRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Projects of an account, oldest first. `active` restricts to one side
    /// of the active/inactive split.
    pub fn list(&self, account_id: &str, active: Option<bool>) -> Result<Vec<Project>, DatabaseError> {
        let mut projects = Vec::new();
        match active {
            Some(active) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects
                     WHERE account_id = ? AND is_active = ?
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt.query_map(params![account_id, active as i64], row_to_raw)?;
                for row in rows {
                    projects.push(raw_to_project(row?)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects
                     WHERE account_id = ?
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt.query_map([account_id], row_to_raw)?;
                for row in rows {
                    projects.push(raw_to_project(row?)?);
                }
            }
        }
        Ok(projects)
    }

    /// Get a project by ID
    pub fn get(&self, id: &str) -> Result<Option<Project>, DatabaseError> {
        let result = self.conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
            [id],
            row_to_raw,
        );

        match result {
            Ok(raw) => Ok(Some(raw_to_project(raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Insert a pending project and return its new id
    pub fn insert(&self, account_id: &str, project: &Project) -> Result<String, DatabaseError> {
        let id = new_project_id();
        self.conn.execute(
            "INSERT INTO projects (id, account_id, created_at, sent_at, image_path, is_sent,
                                   attempts, grade, is_active, coordinates_json, style_json, holds_json)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                account_id,
                project.created_at.timestamp_millis(),
                sent_at_millis(project.sent_at),
                project.image_path,
                project.is_sent as i64,
                project.attempts,
                project.grade,
                project.is_active as i64,
                serde_json::to_string(&project.coordinates)?,
                serde_json::to_string(&project.style)?,
                serde_json::to_string(&project.holds)?,
            ],
        )?;
        Ok(id)
    }

    /// Overwrite every stored field of a persisted project
    /// Overwrite a project owned by `account_id`. A row that belongs to
    /// another account is left alone and reported like a missing one.
    pub fn update(&self, account_id: &str, id: &str, project: &Project) -> Result<bool, DatabaseError> {
        let count = self.conn.execute(
            "UPDATE projects SET created_at = ?, sent_at = ?, image_path = ?, is_sent = ?,
                    attempts = ?, grade = ?, is_active = ?, coordinates_json = ?,
                    style_json = ?, holds_json = ?
             WHERE id = ? AND account_id = ?",
            params![
                project.created_at.timestamp_millis(),
                sent_at_millis(project.sent_at),
                project.image_path,
                project.is_sent as i64,
                project.attempts,
                project.grade,
                project.is_active as i64,
                serde_json::to_string(&project.coordinates)?,
                serde_json::to_string(&project.style)?,
                serde_json::to_string(&project.holds)?,
                id,
                account_id,
            ],
        )?;
        Ok(count > 0)
    }

    /// Replace the whole annotation set of a project
    pub fn set_coordinates(&self, id: &str, coordinates: &[Coordinate]) -> Result<bool, DatabaseError> {
        let count = self.conn.execute(
            "UPDATE projects SET coordinates_json = ? WHERE id = ?",
            params![serde_json::to_string(coordinates)?, id],
        )?;
        Ok(count > 0)
    }

    pub fn delete(&self, id: &str) -> Result<bool, DatabaseError> {
        let count = self.conn.execute("DELETE FROM projects WHERE id = ?", [id])?;
        Ok(count > 0)
    }

    pub fn sends_summary(&self, account_id: &str) -> Result<SendsSummary, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT grade, COUNT(*) FROM projects
             WHERE account_id = ? AND is_sent = 1
             GROUP BY grade",
        )?;
        let rows = stmt.query_map([account_id], |row| {
            Ok(GradeCount {
                grade: row.get(0)?,
                count: row.get::<_, i64>(1)?.max(0) as u64,
            })
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(SendsSummary::from_counts(counts))
    }

    pub fn tag_summary(&self, account_id: &str, kind: TagKind) -> Result<Vec<TagSummary>, DatabaseError> {
        let projects = self.list(account_id, None)?;
        Ok(tag_summaries(&projects, kind))
    }

    /// Store an uploaded asset and return its reference
    pub fn insert_asset(&self, name: &str, bytes: &[u8]) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO assets (id, name, bytes, uploaded_at) VALUES (?, ?, ?, ?)",
            params![id, name, bytes, Utc::now().to_rfc3339()],
        )?;
        Ok(format!("asset://{}/{}", id, name))
    }

    pub fn asset_bytes(&self, id: &str) -> Result<Option<Vec<u8>>, DatabaseError> {
        match self
            .conn
            .query_row("SELECT bytes FROM assets WHERE id = ?", [id], |row| row.get(0))
        {
            Ok(bytes) => Ok(Some(bytes)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }
}

/// 24 hex characters, the same width as a document-store object id
fn new_project_id() -> String {
    Uuid::new_v4().simple().to_string()[..24].to_string()
}

fn sent_at_millis(sent_at: Option<DateTime<Utc>>) -> i64 {
    sent_at.map(|t| t.timestamp_millis()).unwrap_or(0)
}

struct RawProject {
    id: String,
    created_at: i64,
    sent_at: i64,
    image_path: String,
    is_sent: i64,
    attempts: i64,
    grade: String,
    is_active: i64,
    coordinates_json: String,
    style_json: String,
    holds_json: String,
}

fn row_to_raw(row: &Row<'_>) -> Result<RawProject, rusqlite::Error> {
    Ok(RawProject {
        id: row.get(0)?,
        created_at: row.get(1)?,
        sent_at: row.get(2)?,
        image_path: row.get(3)?,
        is_sent: row.get(4)?,
        attempts: row.get(5)?,
        grade: row.get(6)?,
        is_active: row.get(7)?,
        coordinates_json: row.get(8)?,
        style_json: row.get(9)?,
        holds_json: row.get(10)?,
    })
}

fn raw_to_project(raw: RawProject) -> Result<Project, DatabaseError> {
    let created_at = DateTime::<Utc>::from_timestamp_millis(raw.created_at).unwrap_or_else(Utc::now);
    let sent_at = if raw.sent_at > 0 {
        DateTime::<Utc>::from_timestamp_millis(raw.sent_at)
    } else {
        None
    };

    let mut project = Project::new(raw.grade)
        .with_id(raw.id)
        .with_attempts(raw.attempts.clamp(0, u32::MAX as i64) as u32)
        .with_image_path(raw.image_path)
        .with_active(raw.is_active == 1)
        .with_coordinates(serde_json::from_str(&raw.coordinates_json)?)
        .with_style(serde_json::from_str(&raw.style_json)?)
        .with_holds(serde_json::from_str(&raw.holds_json)?);
    project.created_at = created_at;
    project.is_sent = raw.is_sent == 1;
    project.sent_at = sent_at;
    Ok(project)
}
