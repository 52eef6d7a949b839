//! Project entity and its wire document mapping
//!
//! Wire documents carry booleans as 0/1 integers and timestamps as epoch
//! milliseconds. [`normalize`] never fails: any field it cannot read falls
//! back to the default for that field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

pub const DEFAULT_IMAGE_PATH: &str = "No Image";
pub const DEFAULT_GRADE: &str = "Unknown";

/// Sent timestamps below this value are read as seconds
const SECONDS_THRESHOLD: f64 = 1e10;

/// A marker placed over the project image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Vec<String>>,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, note: None }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_note(mut self, note: Vec<String>) -> Self {
        self.note = Some(note);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub image_path: String,
    pub is_sent: bool,
    pub attempts: u32,
    pub grade: String,
    pub is_active: bool,
    pub coordinates: Vec<Coordinate>,
    pub style: Vec<String>,
    pub holds: Vec<String>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            sent_at: None,
            image_path: DEFAULT_IMAGE_PATH.to_string(),
            is_sent: false,
            attempts: 0,
            grade: DEFAULT_GRADE.to_string(),
            is_active: true,
            coordinates: Vec::new(),
            style: Vec::new(),
            holds: Vec::new(),
        }
    }
}

impl Project {
    /// A pending project: no id until the backend persists it
    pub fn new(grade: impl Into<String>) -> Self {
        Self {
            grade: grade.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }

    pub(crate) fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_image_path(mut self, image_path: impl Into<String>) -> Self {
        self.image_path = image_path.into();
        self
    }

    /// Mark as sent at the given time
    pub fn sent(mut self, at: DateTime<Utc>) -> Self {
        self.is_sent = true;
        self.sent_at = Some(at);
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Vec<Coordinate>) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_style(mut self, style: Vec<String>) -> Self {
        self.style = dedup_tags(style);
        self
    }

    pub fn with_holds(mut self, holds: Vec<String>) -> Self {
        self.holds = dedup_tags(holds);
        self
    }

    pub fn has_style(&self, tag: &str) -> bool {
        self.style.iter().any(|s| s == tag)
    }

    pub fn has_hold(&self, tag: &str) -> bool {
        self.holds.iter().any(|h| h == tag)
    }

    pub fn formatted_created_at(&self) -> String {
        self.created_at.format("%d-%m-%Y %H:%M:%S").to_string()
    }

    pub fn from_wire(doc: &Value) -> Self {
        normalize(doc)
    }

    pub fn to_wire(&self) -> Value {
        denormalize(self)
    }
}

/// Convert a wire document into a [`Project`], filling defaults for anything
/// missing or malformed.
pub fn normalize(doc: &Value) -> Project {
    let Some(map) = doc.as_object() else {
        warn!("Project document is not an object: {}", doc);
        return Project::default();
    };

    Project {
        id: map.get("_id").or_else(|| map.get("id")).and_then(parse_id),
        created_at: map
            .get("created_at")
            .or_else(|| map.get("date_time"))
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        sent_at: map.get("sent_at").and_then(parse_sent_at),
        image_path: map
            .get("image_path")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_IMAGE_PATH.to_string()),
        is_sent: map.get("is_sent").and_then(parse_flag).unwrap_or(false),
        attempts: map.get("attempts").map(parse_attempts).unwrap_or(0),
        grade: map
            .get("grade")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_GRADE.to_string()),
        is_active: map.get("is_active").and_then(parse_flag).unwrap_or(true),
        coordinates: map.get("coordinates").map(parse_coordinates).unwrap_or_default(),
        style: map.get("style").map(parse_tags).unwrap_or_default(),
        holds: map.get("holds").map(parse_tags).unwrap_or_default(),
    }
}

/// Convert a [`Project`] into its wire document. The `_id` key is omitted for
/// pending projects so inserts and updates stay distinguishable.
pub fn denormalize(project: &Project) -> Value {
    let mut doc = Map::new();
    if let Some(id) = &project.id {
        doc.insert("_id".to_string(), Value::String(id.clone()));
    }
    doc.insert("created_at".to_string(), json!(project.created_at.timestamp_millis()));
    doc.insert(
        "sent_at".to_string(),
        json!(project.sent_at.map(|t| t.timestamp_millis()).unwrap_or(0)),
    );
    doc.insert("image_path".to_string(), json!(project.image_path));
    doc.insert("is_sent".to_string(), json!(u8::from(project.is_sent)));
    doc.insert("attempts".to_string(), json!(project.attempts));
    doc.insert("grade".to_string(), json!(project.grade));
    doc.insert("is_active".to_string(), json!(u8::from(project.is_active)));
    doc.insert("coordinates".to_string(), coordinates_to_wire(&project.coordinates));
    doc.insert("style".to_string(), json!(project.style));
    doc.insert("holds".to_string(), json!(project.holds));
    Value::Object(doc)
}

/// Largest magnitude at which every integer is exactly representable in f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode coordinates for the wire. Whole numbers go out as JSON integers,
/// the form a JavaScript client writes them in.
pub fn coordinates_to_wire(coordinates: &[Coordinate]) -> Value {
    Value::Array(
        coordinates
            .iter()
            .map(|c| {
                let mut entry = Map::new();
                entry.insert("lat".to_string(), wire_number(c.lat));
                entry.insert("lng".to_string(), wire_number(c.lng));
                if let Some(note) = &c.note {
                    entry.insert("note".to_string(), json!(note));
                }
                Value::Object(entry)
            })
            .collect(),
    )
}

fn wire_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
        json!(n as i64)
    } else {
        json!(n)
    }
}

/// Read a `coordinates` value, replacing unreadable entries with the origin
pub fn parse_coordinates(value: &Value) -> Vec<Coordinate> {
    let Some(entries) = value.as_array() else {
        if !value.is_null() {
            warn!("coordinates is not an array: {}", value);
        }
        return Vec::new();
    };

    entries
        .iter()
        .map(|entry| {
            let lat = entry.get("lat").and_then(numeric);
            let lng = entry.get("lng").and_then(numeric);
            match (lat, lng) {
                (Some(lat), Some(lng)) => Coordinate {
                    lat,
                    lng,
                    note: entry.get("note").and_then(parse_note),
                },
                _ => {
                    warn!("Malformed coordinate replaced with origin: {}", entry);
                    Coordinate::origin()
                }
            }
        })
        .collect()
}

/// Read a number from a JSON number or a numeric string
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|n| n.is_finite())
}

fn parse_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(o) => o.get("$oid").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n == 1.0),
        Value::String(s) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_attempts(value: &Value) -> u32 {
    match numeric(value) {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => n.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Read a timestamp given as epoch milliseconds, an RFC 3339 string, or an
/// extended-JSON `{"$date": ...}` wrapper.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(millis) => millis_to_datetime(millis),
            None => n.as_f64().and_then(|f| millis_to_datetime(f.round() as i64)),
        },
        Value::String(s) => {
            let s = s.trim();
            if let Ok(millis) = s.parse::<i64>() {
                return millis_to_datetime(millis);
            }
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
        }
        Value::Object(o) => o
            .get("$date")
            .or_else(|| o.get("$numberLong"))
            .and_then(parse_timestamp),
        _ => None,
    }
}

fn parse_sent_at(value: &Value) -> Option<DateTime<Utc>> {
    match numeric(value) {
        Some(raw) if raw <= 0.0 => None,
        Some(raw) if raw < SECONDS_THRESHOLD => millis_to_datetime((raw * 1000.0).round() as i64),
        Some(raw) => millis_to_datetime(raw.round() as i64),
        None => parse_timestamp(value).filter(|t| t.timestamp_millis() > 0),
    }
}

fn parse_note(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}

fn parse_tags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => dedup_tags(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Null => Vec::new(),
        other => {
            warn!("Tag list is not an array: {}", other);
            Vec::new()
        }
    }
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Value {
        json!({
            "_id": "65a1f0c2e4b0a1b2c3d4e5f6",
            "created_at": 1_700_000_000_123i64,
            "sent_at": 1_700_000_500_000i64,
            "image_path": "https://assets.example.com/wall/1.jpg",
            "is_sent": 1,
            "attempts": 7,
            "grade": "V5",
            "is_active": 0,
            "coordinates": [
                { "lat": 12.5, "lng": -3.25, "note": ["start"] },
                { "lat": 40.125, "lng": 8.75 }
            ],
            "style": ["crimpy", "overhang"],
            "holds": ["crimp", "pinch"]
        })
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let doc = sample_doc();
        assert_eq!(denormalize(&normalize(&doc)), doc);
    }

    #[test]
    fn test_integer_coordinates_round_trip() {
        let doc = json!({
            "_id": "abc123",
            "created_at": 1700000000000i64,
            "sent_at": 0,
            "image_path": "No Image",
            "is_sent": 0,
            "attempts": 2,
            "grade": "V3",
            "is_active": 1,
            "coordinates": [
                { "lat": 12, "lng": 3 },
                { "lat": -4, "lng": 0.5, "note": ["heel"] }
            ],
            "style": [],
            "holds": []
        });
        assert_eq!(denormalize(&normalize(&doc)), doc);
    }

    #[test]
    fn test_boolean_mapping() {
        let project = normalize(&json!({ "is_sent": 1, "is_active": 1 }));
        assert!(project.is_sent);
        assert!(project.is_active);

        let wire = Project::new("V1").with_active(false).sent(Utc::now()).to_wire();
        assert_eq!(wire["is_sent"], json!(1));
        assert_eq!(wire["is_active"], json!(0));

        let wire = Project::new("V1").to_wire();
        assert_eq!(wire["is_sent"], json!(0));
        assert_eq!(wire["is_active"], json!(1));
    }

    #[test]
    fn test_sent_at_seconds_and_millis_agree() {
        let from_seconds = normalize(&json!({ "sent_at": 1_700_000_000i64 }));
        let from_millis = normalize(&json!({ "sent_at": 1_700_000_000_000i64 }));
        assert!(from_seconds.sent_at.is_some());
        assert_eq!(from_seconds.sent_at, from_millis.sent_at);
    }

    #[test]
    fn test_zero_sent_at_means_not_sent() {
        let project = normalize(&json!({ "sent_at": 0 }));
        assert_eq!(project.sent_at, None);
        assert_eq!(project.to_wire()["sent_at"], json!(0));
    }

    #[test]
    fn test_created_at_input_forms() {
        let expected = millis_to_datetime(1_700_000_000_000).unwrap();
        let numeric = normalize(&json!({ "created_at": 1_700_000_000_000i64 }));
        let string = normalize(&json!({ "created_at": "1700000000000" }));
        let rfc3339 = normalize(&json!({ "created_at": "2023-11-14T22:13:20Z" }));
        let extended = normalize(&json!({ "created_at": { "$date": { "$numberLong": "1700000000000" } } }));
        let legacy = normalize(&json!({ "date_time": 1_700_000_000_000i64 }));

        assert_eq!(numeric.created_at, expected);
        assert_eq!(string.created_at, expected);
        assert_eq!(rfc3339.created_at, expected);
        assert_eq!(extended.created_at, expected);
        assert_eq!(legacy.created_at, expected);
    }

    #[test]
    fn test_id_forms() {
        let plain = normalize(&json!({ "_id": "abc123" }));
        let object = normalize(&json!({ "_id": { "$oid": "abc123" } }));
        let empty = normalize(&json!({ "_id": "" }));
        assert_eq!(plain.id(), Some("abc123"));
        assert_eq!(object.id(), Some("abc123"));
        assert_eq!(empty.id(), None);
    }

    #[test]
    fn test_pending_project_omits_id() {
        let wire = Project::new("V3").to_wire();
        assert!(wire.get("_id").is_none());

        let wire = Project::new("V3").with_id("xyz").to_wire();
        assert_eq!(wire["_id"], json!("xyz"));
    }

    #[test]
    fn test_corrupt_coordinate_defaults_to_origin() {
        let project = normalize(&json!({
            "coordinates": [
                { "lat": "x", "lng": 2 },
                { "lat": 1.5, "lng": 2.5, "note": ["crux"] }
            ]
        }));
        assert_eq!(project.coordinates[0], Coordinate::origin());
        assert_eq!(
            project.coordinates[1],
            Coordinate::new(1.5, 2.5).with_note(vec!["crux".to_string()])
        );
    }

    #[test]
    fn test_malformed_document_gets_defaults() {
        let project = normalize(&json!({
            "coordinates": "nope",
            "style": 5,
            "attempts": -2,
            "grade": null
        }));
        assert!(project.coordinates.is_empty());
        assert!(project.style.is_empty());
        assert_eq!(project.attempts, 0);
        assert_eq!(project.grade, DEFAULT_GRADE);
        assert_eq!(project.image_path, DEFAULT_IMAGE_PATH);
        assert!(project.is_active);
        assert!(!project.is_sent);

        let not_an_object = normalize(&json!([1, 2, 3]));
        assert!(not_an_object.is_pending());
    }

    #[test]
    fn test_tags_deduplicate() {
        let project = normalize(&json!({ "holds": ["crimp", "sloper", "crimp"] }));
        assert_eq!(project.holds, vec!["crimp".to_string(), "sloper".to_string()]);
    }

    #[test]
    fn test_formatted_created_at() {
        let project = normalize(&json!({ "created_at": "2024-10-13T10:00:00Z" }));
        assert_eq!(project.formatted_created_at(), "13-10-2024 10:00:00");
    }
}
