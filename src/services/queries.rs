//! Query and filter interface
//!
//! Every read returns a [`FetchOutcome`]. Failures are logged here with the
//! command name; callers that want the old "failure reads as empty" view can
//! use [`FetchOutcome::into_items`].

use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::adapters::{args, Command, CommandGateway};
use crate::error::{ErrorKind, FetchOutcome, SyncError};
use crate::models::{FilterCriteria, Partition, Project, Session};

/// Invoke a command, tagging gateway failures with the command name
pub(crate) async fn call(
    gateway: &dyn CommandGateway,
    command: Command,
    args: Value,
) -> Result<Value, SyncError> {
    gateway
        .invoke(command, args)
        .await
        .map_err(|source| SyncError::Gateway {
            command: command.as_str(),
            source,
        })
}

/// Log a failure the way every read and write reports it
pub(crate) fn report(err: &SyncError) {
    match err.kind() {
        ErrorKind::Gateway => error!("{}", err),
        ErrorKind::Shape | ErrorKind::Precondition => warn!("{}", err),
    }
}

fn outcome<T>(result: Result<Vec<T>, SyncError>) -> FetchOutcome<Vec<T>> {
    if let Err(e) = &result {
        report(e);
    }
    FetchOutcome::from_items(result)
}

async fn fetch_documents(
    gateway: &dyn CommandGateway,
    command: Command,
    args: Value,
) -> Result<Vec<Project>, SyncError> {
    let response = call(gateway, command, args).await?;
    let Value::Array(docs) = response else {
        return Err(SyncError::shape(
            command.as_str(),
            format!("expected an array of projects, got {}", kind_of(&response)),
        ));
    };

    let projects: Vec<Project> = docs.iter().map(Project::from_wire).collect();
    debug!("{} returned {} projects", command, projects.len());
    Ok(projects)
}

fn account_args(session: &Session) -> Result<Value, SyncError> {
    let account_id = session.require_account()?;
    Ok(json!({ args::ACCOUNT_ID: account_id }))
}

async fn fetch_for_account(
    gateway: &dyn CommandGateway,
    session: &Session,
    command: Command,
) -> FetchOutcome<Vec<Project>> {
    let result = match account_args(session) {
        Ok(args) => fetch_documents(gateway, command, args).await,
        Err(e) => Err(e),
    };
    outcome(result)
}

pub async fn fetch_all(gateway: &dyn CommandGateway, session: &Session) -> FetchOutcome<Vec<Project>> {
    fetch_for_account(gateway, session, Command::GetAllProjects).await
}

pub async fn fetch_active(gateway: &dyn CommandGateway, session: &Session) -> FetchOutcome<Vec<Project>> {
    fetch_for_account(gateway, session, Command::GetActiveProjects).await
}

pub async fn fetch_inactive(
    gateway: &dyn CommandGateway,
    session: &Session,
) -> FetchOutcome<Vec<Project>> {
    fetch_for_account(gateway, session, Command::GetInactiveProjects).await
}

pub async fn fetch_partition(
    gateway: &dyn CommandGateway,
    session: &Session,
    partition: Partition,
) -> FetchOutcome<Vec<Project>> {
    match partition {
        Partition::Active => fetch_active(gateway, session).await,
        Partition::Inactive => fetch_inactive(gateway, session).await,
    }
}

/// Fetch one partition narrowed by `criteria`. Criteria that restrict
/// nothing fall through to the plain partition fetch.
pub async fn fetch_filtered(
    gateway: &dyn CommandGateway,
    session: &Session,
    partition: Partition,
    criteria: &FilterCriteria,
) -> FetchOutcome<Vec<Project>> {
    if criteria.is_unrestricted() {
        return fetch_partition(gateway, session, partition).await;
    }

    let command = match partition {
        Partition::Active => Command::GetActiveFilteredProjects,
        Partition::Inactive => Command::GetInactiveFilteredProjects,
    };
    let result = match session.require_account() {
        Ok(account_id) => {
            let args = json!({
                args::ACCOUNT_ID: account_id,
                args::GRADES: criteria.grades,
                args::SENT_STATUS: criteria.sent_status.as_str(),
                args::STYLES: criteria.styles,
                args::HOLDS: criteria.holds,
            });
            fetch_documents(gateway, command, args).await
        }
        Err(e) => Err(e),
    };
    outcome(result)
}

/// Read one project without logging; callers report failures themselves
pub(crate) async fn fetch_document(gateway: &dyn CommandGateway, id: &str) -> Result<Option<Project>, SyncError> {
    if id.is_empty() {
        return Err(SyncError::MissingProjectId);
    }

    let command = Command::GetProjectById;
    match call(gateway, command, json!({ args::PROJECT_ID: id })).await? {
        Value::Null => Ok(None),
        doc @ Value::Object(_) => Ok(Some(Project::from_wire(&doc))),
        other => Err(SyncError::shape(
            command.as_str(),
            format!("expected a project document, got {}", kind_of(&other)),
        )),
    }
}

/// The current persisted state of one project
pub async fn fetch_by_id(gateway: &dyn CommandGateway, id: &str) -> FetchOutcome<Project> {
    let result = fetch_document(gateway, id).await;
    if let Err(e) = &result {
        report(e);
    }
    FetchOutcome::from_option(result)
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
