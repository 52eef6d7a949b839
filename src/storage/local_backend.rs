//! In-process backend answering every gateway command from SQLite

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::db::{open_database, open_in_memory, Database};
use super::{DatabaseError, ProjectRepo};
use crate::adapters::{args, Command, CommandGateway, GatewayError};
use crate::models::project::{normalize, parse_coordinates};
use crate::models::{FilterCriteria, Partition, SentStatus, TagKind};

pub struct LocalBackend {
    db: Mutex<Database>,
}

impl LocalBackend {
    pub fn open(data_dir: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_database(open_database(data_dir)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_database(open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, GatewayError> {
        self.db.lock().map_err(|e| GatewayError::rejected(e.to_string()))
    }

    fn dispatch(&self, command: Command, args: &Value) -> Result<Value, GatewayError> {
        let db = self.lock()?;
        let repo = ProjectRepo::new(&db.conn);

        match command {
            Command::GetAllProjects => {
                let account_id = require_str(args, args::ACCOUNT_ID)?;
                documents(repo.list(account_id, None).map_err(rejected)?)
            }
            Command::GetActiveProjects | Command::GetInactiveProjects => {
                let account_id = require_str(args, args::ACCOUNT_ID)?;
                let active = command == Command::GetActiveProjects;
                documents(repo.list(account_id, Some(active)).map_err(rejected)?)
            }
            Command::GetActiveFilteredProjects | Command::GetInactiveFilteredProjects => {
                let account_id = require_str(args, args::ACCOUNT_ID)?;
                let partition = if command == Command::GetActiveFilteredProjects {
                    Partition::Active
                } else {
                    Partition::Inactive
                };
                let criteria = criteria_from_args(args);
                let projects = repo
                    .list(account_id, Some(partition.is_active()))
                    .map_err(rejected)?
                    .into_iter()
                    .filter(|p| criteria.matches(p))
                    .collect();
                documents(projects)
            }
            Command::GetProjectById => {
                let id = require_str(args, args::PROJECT_ID)?;
                Ok(repo
                    .get(id)
                    .map_err(rejected)?
                    .map(|p| p.to_wire())
                    .unwrap_or(Value::Null))
            }
            Command::InsertProject => {
                let account_id = require_str(args, args::ACCOUNT_ID)?;
                let doc = args
                    .get(args::PROJECT)
                    .ok_or_else(|| missing(args::PROJECT))?;
                let project = normalize(doc);
                if !project.is_pending() {
                    return Err(GatewayError::rejected("insert_project must not carry an id"));
                }
                let id = repo.insert(account_id, &project).map_err(rejected)?;
                info!("Inserted project {} for account {}", id, account_id);
                Ok(json!(id))
            }
            Command::UpdateProject => {
                let account_id = require_str(args, args::ACCOUNT_ID)?;
                let doc = args
                    .get(args::PROJECT)
                    .ok_or_else(|| missing(args::PROJECT))?;
                let project = normalize(doc);
                let id = project
                    .id()
                    .ok_or_else(|| GatewayError::rejected("update_project requires an id"))?;
                if !repo.update(account_id, id, &project).map_err(rejected)? {
                    return Err(not_found(id));
                }
                info!("Updated project {}", id);
                Ok(Value::Null)
            }
            Command::DeleteProject => {
                let id = require_str(args, args::ID)?;
                let deleted = repo.delete(id).map_err(rejected)?;
                info!("Deleted project {} (existed: {})", id, deleted);
                Ok(json!(deleted))
            }
            Command::GetSendsSummary => {
                let account_id = require_str(args, args::ACCOUNT_ID)?;
                let summary = repo.sends_summary(account_id).map_err(rejected)?;
                let pairs: Vec<(String, u64)> = summary
                    .by_grade
                    .into_iter()
                    .map(|g| (g.grade, g.count))
                    .collect();
                Ok(json!([summary.total, pairs]))
            }
            Command::GetStylesSummary | Command::GetHoldsSummary => {
                let account_id = require_str(args, args::ACCOUNT_ID)?;
                let kind = if command == Command::GetStylesSummary {
                    TagKind::Style
                } else {
                    TagKind::Hold
                };
                let triples: Vec<(String, u64, u64)> = repo
                    .tag_summary(account_id, kind)
                    .map_err(rejected)?
                    .into_iter()
                    .map(|s| (s.tag, s.done, s.practicing))
                    .collect();
                Ok(json!(triples))
            }
            Command::SaveAnnotations => {
                let id = require_str(args, args::PROJECT_ID)?;
                let points = args.get(args::POINTS).ok_or_else(|| missing(args::POINTS))?;
                if !points.is_array() {
                    return Err(GatewayError::rejected("points must be an array"));
                }
                let coordinates = parse_coordinates(points);
                if !repo.set_coordinates(id, &coordinates).map_err(rejected)? {
                    return Err(not_found(id));
                }
                info!("Saved {} annotations for project {}", coordinates.len(), id);
                Ok(Value::Null)
            }
            Command::UploadImage => {
                let name = require_str(args, args::NAME)?;
                let bytes: Vec<u8> = args
                    .get(args::BYTES)
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| GatewayError::rejected(format!("bytes: {}", e)))?
                    .ok_or_else(|| missing(args::BYTES))?;
                if bytes.is_empty() {
                    return Err(GatewayError::rejected("asset is empty"));
                }
                let reference = repo.insert_asset(name, &bytes).map_err(rejected)?;
                info!("Stored asset {} ({} bytes)", reference, bytes.len());
                Ok(json!(reference))
            }
        }
    }
}

#[async_trait]
impl CommandGateway for LocalBackend {
    async fn invoke(&self, command: Command, args: Value) -> Result<Value, GatewayError> {
        debug!("Local backend handling {}", command);
        self.dispatch(command, &args)
    }
}

fn rejected(err: DatabaseError) -> GatewayError {
    GatewayError::rejected(err.to_string())
}

fn missing(key: &str) -> GatewayError {
    GatewayError::rejected(format!("missing argument {}", key))
}

fn not_found(id: &str) -> GatewayError {
    GatewayError::Rejected {
        status: Some(404),
        message: format!("project {} not found", id),
    }
}

fn require_str<'v>(args: &'v Value, key: &str) -> Result<&'v str, GatewayError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(key))
}

fn string_set(args: &Value, key: &str) -> std::collections::BTreeSet<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn criteria_from_args(args: &Value) -> FilterCriteria {
    FilterCriteria {
        grades: string_set(args, args::GRADES),
        sent_status: args
            .get(args::SENT_STATUS)
            .and_then(Value::as_str)
            .map(SentStatus::from_str)
            .unwrap_or_default(),
        styles: string_set(args, args::STYLES),
        holds: string_set(args, args::HOLDS),
    }
}

fn documents(projects: Vec<crate::models::Project>) -> Result<Value, GatewayError> {
    Ok(Value::Array(projects.iter().map(|p| p.to_wire()).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> LocalBackend {
        LocalBackend::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_list() {
        let backend = backend();
        let id = backend
            .invoke(
                Command::InsertProject,
                json!({ "accountId": "acct", "project": { "grade": "V4", "attempts": 3, "is_sent": 0 } }),
            )
            .await
            .unwrap();
        assert!(id.is_string());

        let all = backend
            .invoke(Command::GetAllProjects, json!({ "accountId": "acct" }))
            .await
            .unwrap();
        let docs = all.as_array().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["_id"], id);
        assert_eq!(docs[0]["grade"], json!("V4"));
        assert_eq!(docs[0]["attempts"], json!(3));
    }

    #[tokio::test]
    async fn test_insert_with_id_is_rejected() {
        let result = backend()
            .invoke(
                Command::InsertProject,
                json!({ "accountId": "acct", "project": { "_id": "abc", "grade": "V1" } }),
            )
            .await;
        assert!(matches!(result, Err(GatewayError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_missing_account_is_rejected() {
        let result = backend().invoke(Command::GetAllProjects, json!({})).await;
        assert_eq!(result, Err(GatewayError::rejected("missing argument accountId")));
    }

    #[tokio::test]
    async fn test_update_unknown_project() {
        let result = backend()
            .invoke(
                Command::UpdateProject,
                json!({ "accountId": "acct", "project": { "_id": "nope", "grade": "V1" } }),
            )
            .await;
        assert!(matches!(result, Err(GatewayError::Rejected { status: Some(404), .. })));
    }

    #[tokio::test]
    async fn test_update_of_another_accounts_project() {
        let backend = backend();
        let id = backend
            .invoke(
                Command::InsertProject,
                json!({ "accountId": "owner", "project": { "grade": "V4" } }),
            )
            .await
            .unwrap();
        let id = id.as_str().unwrap();

        let result = backend
            .invoke(
                Command::UpdateProject,
                json!({ "accountId": "intruder", "project": { "_id": id, "grade": "V0" } }),
            )
            .await;
        assert!(matches!(result, Err(GatewayError::Rejected { status: Some(404), .. })));

        let missing_account = backend
            .invoke(Command::UpdateProject, json!({ "project": { "_id": id, "grade": "V0" } }))
            .await;
        assert!(missing_account.is_err());

        let stored = backend
            .invoke(Command::GetProjectById, json!({ "projectId": id }))
            .await
            .unwrap();
        assert_eq!(stored["grade"], "V4");
    }

    #[tokio::test]
    async fn test_filtered_query() {
        let backend = backend();
        for doc in [
            json!({ "grade": "V2", "is_sent": 1, "holds": ["crimp"] }),
            json!({ "grade": "V2", "is_sent": 0, "holds": ["sloper"] }),
            json!({ "grade": "V5", "is_sent": 0, "holds": ["crimp"] }),
            json!({ "grade": "V2", "is_sent": 0, "is_active": 0, "holds": ["crimp"] }),
        ] {
            backend
                .invoke(Command::InsertProject, json!({ "accountId": "acct", "project": doc }))
                .await
                .unwrap();
        }

        let result = backend
            .invoke(
                Command::GetActiveFilteredProjects,
                json!({
                    "accountId": "acct",
                    "grades": ["V2"],
                    "sentStatus": "not_sent",
                    "styles": [],
                    "holds": []
                }),
            )
            .await
            .unwrap();
        let docs = result.as_array().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["holds"], json!(["sloper"]));
    }

    #[tokio::test]
    async fn test_summaries_shape() {
        let backend = backend();
        for doc in [
            json!({ "grade": "V2", "is_sent": 1, "style": ["slab"] }),
            json!({ "grade": "V2", "is_sent": 1, "style": ["slab"] }),
            json!({ "grade": "V4", "is_sent": 1 }),
            json!({ "grade": "V4", "is_sent": 0, "style": ["slab"] }),
        ] {
            backend
                .invoke(Command::InsertProject, json!({ "accountId": "acct", "project": doc }))
                .await
                .unwrap();
        }

        let sends = backend
            .invoke(Command::GetSendsSummary, json!({ "accountId": "acct" }))
            .await
            .unwrap();
        assert_eq!(sends, json!([3, [["V2", 2], ["V4", 1]]]));

        let styles = backend
            .invoke(Command::GetStylesSummary, json!({ "accountId": "acct" }))
            .await
            .unwrap();
        assert_eq!(styles, json!([["slab", 2, 1]]));
    }

    #[tokio::test]
    async fn test_upload_image() {
        let backend = backend();
        let reference = backend
            .invoke(Command::UploadImage, json!({ "name": "boulder.png", "bytes": [1, 2, 3] }))
            .await
            .unwrap();
        assert!(reference.as_str().unwrap().ends_with("/boulder.png"));

        let empty = backend
            .invoke(Command::UploadImage, json!({ "name": "empty.png", "bytes": [] }))
            .await;
        assert!(empty.is_err());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let backend = LocalBackend::open(dir.path()).unwrap();
            backend
                .invoke(Command::InsertProject, json!({ "accountId": "acct", "project": { "grade": "V8" } }))
                .await
                .unwrap();
        });

        let reopened = LocalBackend::open(dir.path()).unwrap();
        let all = runtime
            .block_on(reopened.invoke(Command::GetAllProjects, json!({ "accountId": "acct" })))
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);
    }
}
