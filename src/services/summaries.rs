//! Aggregation summaries
//!
//! Two sources feed the store's summary fields: recomputation from a
//! snapshot of the collection, or the backend's summary commands adopted as
//! they arrive. Either way each field is replaced whole.

use serde_json::{json, Value};
use tracing::debug;

use super::project_store::ProjectStore;
use super::queries::{call, kind_of, report};
use crate::adapters::{args, Command, CommandGateway};
use crate::error::{FetchOutcome, SyncError};
use crate::models::summary::{tag_summaries, GradeCount, SendsSummary, TagKind, TagSummary};
use crate::models::Session;

/// Derive all three summaries from the store's current collection
pub fn recompute_from_store(store: &ProjectStore) {
    let token = store.begin_fetch();
    let projects = store.projects();

    store.replace_sends(token, SendsSummary::from_projects(&projects));
    store.replace_styles(token, tag_summaries(&projects, TagKind::Style));
    store.replace_holds(token, tag_summaries(&projects, TagKind::Hold));
    debug!("Recomputed summaries over {} projects", projects.len());
}

fn count(value: &Value, command: Command) -> Result<u64, SyncError> {
    value
        .as_u64()
        .ok_or_else(|| SyncError::shape(command.as_str(), format!("expected a count, got {}", kind_of(value))))
}

fn label(value: &Value, command: Command) -> Result<String, SyncError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SyncError::shape(command.as_str(), format!("expected a label, got {}", kind_of(value))))
}

fn entries<'v>(value: &'v Value, command: Command, width: usize) -> Result<Vec<&'v [Value]>, SyncError> {
    let rows = value
        .as_array()
        .ok_or_else(|| SyncError::shape(command.as_str(), format!("expected an array, got {}", kind_of(value))))?;
    rows.iter()
        .map(|row| match row.as_array() {
            Some(items) if items.len() == width => Ok(items.as_slice()),
            _ => Err(SyncError::shape(
                command.as_str(),
                format!("expected {}-element entries, got {}", width, row),
            )),
        })
        .collect()
}

/// Read `[total, [[grade, count], ...]]`, keeping the order as sent
fn parse_sends(response: &Value) -> Result<SendsSummary, SyncError> {
    let command = Command::GetSendsSummary;
    let (total, pairs) = match response.as_array().map(Vec::as_slice) {
        Some([total, pairs]) => (total, pairs),
        _ => return Err(SyncError::shape(command.as_str(), "expected [total, pairs]")),
    };

    let by_grade = entries(pairs, command, 2)?
        .into_iter()
        .map(|pair| {
            Ok(GradeCount {
                grade: label(&pair[0], command)?,
                count: count(&pair[1], command)?,
            })
        })
        .collect::<Result<Vec<_>, SyncError>>()?;

    Ok(SendsSummary {
        total: count(total, command)?,
        by_grade,
    })
}

/// Read `[[tag, done, practicing], ...]`, keeping the order as sent
fn parse_tags(response: &Value, command: Command) -> Result<Vec<TagSummary>, SyncError> {
    entries(response, command, 3)?
        .into_iter()
        .map(|triple| {
            Ok(TagSummary {
                tag: label(&triple[0], command)?,
                done: count(&triple[1], command)?,
                practicing: count(&triple[2], command)?,
            })
        })
        .collect()
}

async fn sends_from_server(
    gateway: &dyn CommandGateway,
    session: &Session,
) -> Result<Option<SendsSummary>, SyncError> {
    let account_id = session.require_account()?;
    let response = call(gateway, Command::GetSendsSummary, json!({ args::ACCOUNT_ID: account_id })).await?;
    let summary = parse_sends(&response)?;
    if summary.total == 0 && summary.by_grade.is_empty() {
        Ok(None)
    } else {
        Ok(Some(summary))
    }
}

pub async fn fetch_sends_summary(
    gateway: &dyn CommandGateway,
    session: &Session,
) -> FetchOutcome<SendsSummary> {
    let result = sends_from_server(gateway, session).await;
    if let Err(e) = &result {
        report(e);
    }
    FetchOutcome::from_option(result)
}

async fn tags_from_server(
    gateway: &dyn CommandGateway,
    session: &Session,
    kind: TagKind,
) -> Result<Vec<TagSummary>, SyncError> {
    let account_id = session.require_account()?;
    let command = match kind {
        TagKind::Style => Command::GetStylesSummary,
        TagKind::Hold => Command::GetHoldsSummary,
    };
    let response = call(gateway, command, json!({ args::ACCOUNT_ID: account_id })).await?;
    let summaries = parse_tags(&response, command)?;
    debug!("{} summary has {} tags", kind.as_str(), summaries.len());
    Ok(summaries)
}

pub async fn fetch_tag_summary(
    gateway: &dyn CommandGateway,
    session: &Session,
    kind: TagKind,
) -> FetchOutcome<Vec<TagSummary>> {
    let result = tags_from_server(gateway, session, kind).await;
    if let Err(e) = &result {
        report(e);
    }
    FetchOutcome::from_items(result)
}

/// Adopt the backend's summaries. A summary that fails to load is replaced
/// with its empty value so nothing from an earlier scope survives; the first
/// failure is returned.
pub async fn refresh_from_server(
    gateway: &dyn CommandGateway,
    session: &Session,
    store: &ProjectStore,
) -> Result<(), SyncError> {
    let token = store.begin_fetch();
    let sends = fetch_sends_summary(gateway, session).await;
    let styles = fetch_tag_summary(gateway, session, TagKind::Style).await;
    let holds = fetch_tag_summary(gateway, session, TagKind::Hold).await;

    let (sends, sends_err) = split(sends);
    let (styles, styles_err) = split(styles);
    let (holds, holds_err) = split(holds);

    store.replace_sends(token, sends);
    store.replace_styles(token, styles);
    store.replace_holds(token, holds);

    match sends_err.or(styles_err).or(holds_err) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn split<T: Default>(outcome: FetchOutcome<T>) -> (T, Option<SyncError>) {
    match outcome {
        FetchOutcome::Data(value) => (value, None),
        FetchOutcome::Empty => (T::default(), None),
        FetchOutcome::Failed(e) => (T::default(), Some(e)),
    }
}
