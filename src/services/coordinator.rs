//! Edit/create coordinator
//!
//! Uploads always finish before the record write starts. A failed upload
//! aborts the operation before anything is written; a failed write after a
//! successful upload leaves the uploaded asset behind and is not retried.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::queries::{call, fetch_document, kind_of, report};
use crate::adapters::{args, Command, CommandGateway};
use crate::error::SyncError;
use crate::models::project::{coordinates_to_wire, numeric};
use crate::models::{Coordinate, Project, Session};

/// Image file picked for a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Asset {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// A latitude or longitude as entered, either a number or its text form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Number(f64),
    Text(String),
}

impl From<f64> for PointValue {
    fn from(value: f64) -> Self {
        PointValue::Number(value)
    }
}

impl From<&str> for PointValue {
    fn from(value: &str) -> Self {
        PointValue::Text(value.to_string())
    }
}

impl From<String> for PointValue {
    fn from(value: String) -> Self {
        PointValue::Text(value)
    }
}

impl PointValue {
    fn to_number(&self) -> Option<f64> {
        match self {
            PointValue::Number(n) => numeric(&json!(n)),
            PointValue::Text(s) => numeric(&Value::String(s.clone())),
        }
    }
}

/// One annotation as handed over by the overlay editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPoint {
    pub lat: PointValue,
    pub lng: PointValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Vec<String>>,
}

impl AnnotationPoint {
    pub fn new(lat: impl Into<PointValue>, lng: impl Into<PointValue>) -> Self {
        Self {
            lat: lat.into(),
            lng: lng.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: Vec<String>) -> Self {
        self.note = Some(note);
        self
    }

    fn to_coordinate(&self, index: usize) -> Result<Coordinate, SyncError> {
        let invalid = |field: &str, value: &PointValue| SyncError::InvalidAnnotation {
            index,
            message: format!("{} is not a number: {:?}", field, value),
        };
        let lat = self.lat.to_number().ok_or_else(|| invalid("lat", &self.lat))?;
        let lng = self.lng.to_number().ok_or_else(|| invalid("lng", &self.lng))?;
        Ok(Coordinate {
            lat,
            lng,
            note: self.note.clone(),
        })
    }
}

/// Upload an asset and return the hosted reference
pub async fn upload_asset(gateway: &dyn CommandGateway, asset: &Asset) -> Result<String, SyncError> {
    let command = Command::UploadImage;
    let response = call(
        gateway,
        command,
        json!({ args::BYTES: asset.bytes, args::NAME: asset.name }),
    )
    .await?;

    match response {
        Value::String(reference) if !reference.is_empty() => {
            info!("Uploaded {} as {}", asset.name, reference);
            Ok(reference)
        }
        other => Err(SyncError::shape(
            command.as_str(),
            format!("expected an asset reference, got {}", kind_of(&other)),
        )),
    }
}

async fn attach_asset(
    gateway: &dyn CommandGateway,
    project: &mut Project,
    asset: Option<&Asset>,
) -> Result<(), SyncError> {
    if let Some(asset) = asset {
        project.image_path = upload_asset(gateway, asset).await?;
    }
    Ok(())
}

/// Create a project, uploading its image first when one is given.
/// Returns the new id when the backend reports one.
pub async fn create_project(
    gateway: &dyn CommandGateway,
    session: &Session,
    mut project: Project,
    asset: Option<&Asset>,
) -> Result<Option<String>, SyncError> {
    let result: Result<Option<String>, SyncError> = async {
        let account_id = session.require_account()?;
        attach_asset(gateway, &mut project, asset).await?;

        let mut doc = project.to_wire();
        if let Some(map) = doc.as_object_mut() {
            map.remove("_id");
        }

        let response = call(
            gateway,
            Command::InsertProject,
            json!({ args::PROJECT: doc, args::ACCOUNT_ID: account_id }),
        )
        .await?;
        let id = response.as_str().map(str::to_string);
        info!("Created {} project {}", project.grade, id.as_deref().unwrap_or("(no id returned)"));
        Ok(id)
    }
    .await;

    if let Err(e) = &result {
        report(e);
    }
    result
}

/// Write the caller's edited project. The annotations on the outgoing
/// record are always the persisted ones; everything else comes from
/// `project`. The persisted record is read before any upload, so only a
/// failed write can leave an uploaded asset behind. The backend refuses the
/// write unless the project belongs to the session's account.
pub async fn edit_project(
    gateway: &dyn CommandGateway,
    session: &Session,
    mut project: Project,
    asset: Option<&Asset>,
) -> Result<(), SyncError> {
    let result: Result<(), SyncError> = async {
        let account_id = session.require_account()?;
        let id = project.id().ok_or(SyncError::MissingProjectId)?.to_string();
        let persisted = fetch_document(gateway, &id)
            .await?
            .ok_or_else(|| SyncError::NotFound { id: id.clone() })?;
        project.coordinates = persisted.coordinates;

        attach_asset(gateway, &mut project, asset).await?;

        call(
            gateway,
            Command::UpdateProject,
            json!({ args::PROJECT: project.to_wire(), args::ACCOUNT_ID: account_id }),
        )
        .await?;
        info!("Updated project {}", id);
        Ok(())
    }
    .await;

    if let Err(e) = &result {
        report(e);
    }
    result
}

pub async fn delete_project(gateway: &dyn CommandGateway, id: &str) -> Result<(), SyncError> {
    let result: Result<(), SyncError> = async {
        if id.is_empty() {
            return Err(SyncError::MissingProjectId);
        }
        call(gateway, Command::DeleteProject, json!({ args::ID: id })).await?;
        info!("Deleted project {}", id);
        Ok(())
    }
    .await;

    if let Err(e) = &result {
        report(e);
    }
    result
}

/// Replace the whole annotation set of a project. Nothing is sent unless
/// every point has numeric coordinates.
pub async fn update_annotations(
    gateway: &dyn CommandGateway,
    project_id: &str,
    points: &[AnnotationPoint],
) -> Result<Vec<Coordinate>, SyncError> {
    let result: Result<Vec<Coordinate>, SyncError> = async {
        if project_id.is_empty() {
            return Err(SyncError::MissingProjectId);
        }
        let coordinates = points
            .iter()
            .enumerate()
            .map(|(index, point)| point.to_coordinate(index))
            .collect::<Result<Vec<_>, _>>()?;

        call(
            gateway,
            Command::SaveAnnotations,
            json!({ args::PROJECT_ID: project_id, args::POINTS: coordinates_to_wire(&coordinates) }),
        )
        .await?;
        info!("Saved {} annotations for {}", coordinates.len(), project_id);
        Ok(coordinates)
    }
    .await;

    if let Err(e) = &result {
        report(e);
    }
    result
}
