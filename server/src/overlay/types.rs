//! Overlay record, request bodies, and error definitions

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur when working with overlays
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field '{0}' must be a string")]
    NotAString(&'static str),

    #[error("Overlay not found")]
    NotFound,

    #[error("{0}")]
    InvalidBody(String),

    #[error("{0}")]
    Storage(String),
}

impl OverlayError {
    /// Whether the failure is caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::NotAString(_) | Self::NotFound
        )
    }
}

/// A visual element rendered on top of the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    /// Store-assigned identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Overlay kind (text, logo, clock, ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
    pub position: Value,
    pub size: Value,
    pub style: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Overlay fields ready to be persisted; the store assigns the identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewOverlay {
    pub kind: String,
    pub content: Value,
    pub position: Value,
    pub size: Value,
    pub style: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewOverlay {
    /// Attach the identifier assigned by the store
    pub fn with_id(self, id: String) -> Overlay {
        Overlay {
            id,
            kind: self.kind,
            content: self.content,
            position: self.position,
            size: self.size,
            style: self.style,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Body of `POST /api/overlays`
///
/// Every field is optional at the parsing layer so a missing field can be
/// reported by name instead of as a generic deserialization error. A field
/// explicitly set to `null` counts as present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOverlayRequest {
    #[serde(rename = "type", default, deserialize_with = "present")]
    pub kind: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub position: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub size: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub style: Option<Value>,
}

impl CreateOverlayRequest {
    /// Check required fields in order and build the record to insert.
    ///
    /// Fails on the first missing field of `type`, `content`, `position`, `size`.
    pub fn into_new_overlay(self, now: DateTime<Utc>) -> Result<NewOverlay, OverlayError> {
        let kind = self.kind.ok_or(OverlayError::MissingField("type"))?;
        let kind = kind_string(kind)?;
        let content = self.content.ok_or(OverlayError::MissingField("content"))?;
        let position = self
            .position
            .ok_or(OverlayError::MissingField("position"))?;
        let size = self.size.ok_or(OverlayError::MissingField("size"))?;

        Ok(NewOverlay {
            kind,
            content,
            position,
            size,
            style: self.style.unwrap_or_else(|| Value::Object(Map::new())),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of `PUT /api/overlays/:id`; unrecognized keys are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOverlayRequest {
    #[serde(rename = "type", default, deserialize_with = "present")]
    pub kind: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub position: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub size: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub style: Option<Value>,
}

impl UpdateOverlayRequest {
    pub fn into_patch(self) -> Result<OverlayPatch, OverlayError> {
        Ok(OverlayPatch {
            kind: self.kind.map(kind_string).transpose()?,
            content: self.content,
            position: self.position,
            size: self.size,
            style: self.style,
        })
    }
}

/// A partial set of fields to overwrite on a stored overlay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPatch {
    pub kind: Option<String>,
    pub content: Option<Value>,
    pub position: Option<Value>,
    pub size: Option<Value>,
    pub style: Option<Value>,
}

impl OverlayPatch {
    /// Overwrite the fields present in this patch and stamp `updated_at`
    pub fn apply(&self, overlay: &mut Overlay, updated_at: DateTime<Utc>) {
        if let Some(kind) = &self.kind {
            overlay.kind = kind.clone();
        }
        if let Some(content) = &self.content {
            overlay.content = content.clone();
        }
        if let Some(position) = &self.position {
            overlay.position = position.clone();
        }
        if let Some(size) = &self.size {
            overlay.size = size.clone();
        }
        if let Some(style) = &self.style {
            overlay.style = style.clone();
        }
        overlay.updated_at = updated_at;
    }
}

/// Response for `DELETE /api/overlays/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Current time at the precision the document store keeps (milliseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn kind_string(value: Value) -> Result<String, OverlayError> {
    match value {
        Value::String(kind) => Ok(kind),
        _ => Err(OverlayError::NotAString("type")),
    }
}

/// Deserialize any present value, including `null`, as `Some`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_create(body: Value) -> CreateOverlayRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_create_defaults_style_and_sets_equal_timestamps() {
        let ts = now();
        let overlay = parse_create(json!({
            "type": "text",
            "content": {"text": "Hi"},
            "position": {"x": 0, "y": 0},
            "size": {"w": 100, "h": 50}
        }))
        .into_new_overlay(ts)
        .unwrap();

        assert_eq!(overlay.kind, "text");
        assert_eq!(overlay.style, json!({}));
        assert_eq!(overlay.created_at, overlay.updated_at);
    }

    #[test]
    fn test_create_reports_first_missing_field() {
        let err = parse_create(json!({"type": "text", "size": {}}))
            .into_new_overlay(now())
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: content");
        assert!(err.is_client_error());

        let err = parse_create(json!({})).into_new_overlay(now()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: type");
    }

    #[test]
    fn test_null_content_counts_as_present() {
        let overlay = parse_create(json!({
            "type": "clock",
            "content": null,
            "position": {},
            "size": {}
        }))
        .into_new_overlay(now())
        .unwrap();
        assert_eq!(overlay.content, Value::Null);
    }

    #[test]
    fn test_present_but_non_string_type_is_not_reported_missing() {
        for kind in [Value::Null, json!(7), json!({"name": "text"})] {
            let err = parse_create(json!({
                "type": kind,
                "content": "hello",
                "position": {},
                "size": {}
            }))
            .into_new_overlay(now())
            .unwrap_err();
            assert!(matches!(err, OverlayError::NotAString("type")));
            assert_eq!(err.to_string(), "Field 'type' must be a string");
            assert!(err.is_client_error());
        }

        let request: UpdateOverlayRequest =
            serde_json::from_value(json!({"type": null})).unwrap();
        assert!(matches!(
            request.into_patch(),
            Err(OverlayError::NotAString("type"))
        ));
    }

    #[test]
    fn test_patch_ignores_unknown_keys_and_merges() {
        let created = now();
        let mut overlay = parse_create(json!({
            "type": "text",
            "content": "hello",
            "position": {"x": 0, "y": 0},
            "size": {"width": 10, "height": 10},
            "style": {"color": "red"}
        }))
        .into_new_overlay(created)
        .unwrap()
        .with_id("abc".to_string());

        let request: UpdateOverlayRequest = serde_json::from_value(json!({
            "position": {"x": 10, "y": 10},
            "_id": "zzz",
            "bogus": 1
        }))
        .unwrap();
        let patch = request.into_patch().unwrap();
        let later = created + chrono::Duration::milliseconds(5);
        patch.apply(&mut overlay, later);

        assert_eq!(overlay.id, "abc");
        assert_eq!(overlay.position, json!({"x": 10, "y": 10}));
        assert_eq!(overlay.content, json!("hello"));
        assert_eq!(overlay.style, json!({"color": "red"}));
        assert_eq!(overlay.created_at, created);
        assert_eq!(overlay.updated_at, later);
    }

    #[test]
    fn test_overlay_serializes_wire_field_names() {
        let ts = now();
        let overlay = parse_create(json!({
            "type": "logo",
            "content": "https://example.com/logo.png",
            "position": {"x": 1, "y": 2},
            "size": {"width": 3, "height": 4}
        }))
        .into_new_overlay(ts)
        .unwrap()
        .with_id("65f0c0ffee0000000000beef".to_string());

        let json = serde_json::to_value(&overlay).unwrap();
        assert_eq!(json["_id"], "65f0c0ffee0000000000beef");
        assert_eq!(json["type"], "logo");
        assert!(json["createdAt"].is_string());
        assert!(json["updatedAt"].is_string());
        assert!(json.get("kind").is_none());
    }
}
