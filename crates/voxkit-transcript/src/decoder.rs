//! Decoder for inbound server action messages.
//!
//! Hand-written over `serde_json::Value` so the action model stays a small,
//! stable tagged union. The decoder is strict: unknown action types, unknown
//! annotation kinds, and missing required fields reject the whole message;
//! nothing is silently dropped.

use serde_json::{Map, Value};
use voxkit_foundation::DecodeError;

use crate::action::{Annotation, AnnotationKind, EntityType, IntentStatus, TranscribeAction};

/// Parses one server text message into its ordered action sequence.
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decode `{"actions": [...]}` preserving action order.
    pub fn decode(text: &str) -> Result<Vec<TranscribeAction>, DecodeError> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
        let actions = root
            .get("actions")
            .ok_or_else(|| DecodeError::MissingField("actions".into()))?
            .as_array()
            .ok_or_else(|| DecodeError::InvalidField {
                path: "actions".into(),
                reason: "expected an array".into(),
            })?;

        actions
            .iter()
            .enumerate()
            .map(|(i, action)| Self::decode_action(action, &format!("actions[{i}]")))
            .collect()
    }

    fn decode_action(value: &Value, path: &str) -> Result<TranscribeAction, DecodeError> {
        let action = expect_object(value, path)?;
        let id = string_field(action, path, "id")?;
        let index = u64_field(action, path, "index")?;
        let kind = string_field(action, path, "type")?;
        let params_path = format!("{path}.parameters");
        let params = expect_object(
            action
                .get("parameters")
                .ok_or_else(|| DecodeError::MissingField(params_path.clone()))?,
            &params_path,
        )?;

        match kind.as_str() {
            "replace_text" => Ok(TranscribeAction::ReplaceText {
                id,
                index,
                start: usize_field(params, &params_path, "start")?,
                end: usize_field(params, &params_path, "end")?,
                text: string_field(params, &params_path, "text")?,
            }),
            "add_annotation" => Ok(TranscribeAction::AddAnnotation {
                id,
                index,
                annotation: Self::decode_annotation(params, &params_path)?,
            }),
            "update_annotation" => Ok(TranscribeAction::UpdateAnnotation {
                id,
                index,
                annotation: Self::decode_annotation(params, &params_path)?,
            }),
            "remove_annotation" => Ok(TranscribeAction::RemoveAnnotation {
                id,
                index,
                annotation_id: string_field(params, &params_path, "annotation_id")?,
            }),
            other => Err(DecodeError::UnknownActionType(other.to_string())),
        }
    }

    fn decode_annotation(
        params: &Map<String, Value>,
        path: &str,
    ) -> Result<Annotation, DecodeError> {
        let id = string_field(params, path, "id")?;
        let start = usize_field(params, path, "start")?;
        let end = usize_field(params, path, "end")?;
        let kind = match string_field(params, path, "type")?.as_str() {
            "transcription_tentative" => AnnotationKind::TranscriptionTentative,
            "intent" => AnnotationKind::Intent {
                status: match string_field(params, path, "status")?.as_str() {
                    "pending" => IntentStatus::Pending,
                    "recognized" => IntentStatus::Recognized,
                    other => {
                        return Err(DecodeError::InvalidField {
                            path: format!("{path}.status"),
                            reason: format!("unknown intent status {other:?}"),
                        })
                    }
                },
            },
            "entity" => AnnotationKind::Entity {
                entity_type: match string_field(params, path, "entity_type")?.as_str() {
                    "name" => EntityType::Name,
                    other => {
                        return Err(DecodeError::InvalidField {
                            path: format!("{path}.entity_type"),
                            reason: format!("unknown entity type {other:?}"),
                        })
                    }
                },
                text: string_field(params, path, "text")?,
            },
            other => return Err(DecodeError::UnknownAnnotationKind(other.to_string())),
        };
        Ok(Annotation {
            id,
            start,
            end,
            kind,
        })
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| DecodeError::InvalidField {
        path: path.to_string(),
        reason: "expected an object".into(),
    })
}

fn string_field(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<String, DecodeError> {
    let value = obj
        .get(key)
        .ok_or_else(|| DecodeError::MissingField(format!("{path}.{key}")))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DecodeError::InvalidField {
            path: format!("{path}.{key}"),
            reason: "expected a string".into(),
        })
}

fn u64_field(obj: &Map<String, Value>, path: &str, key: &str) -> Result<u64, DecodeError> {
    let value = obj
        .get(key)
        .ok_or_else(|| DecodeError::MissingField(format!("{path}.{key}")))?;
    value.as_u64().ok_or_else(|| DecodeError::InvalidField {
        path: format!("{path}.{key}"),
        reason: "expected a non-negative integer".into(),
    })
}

fn usize_field(obj: &Map<String, Value>, path: &str, key: &str) -> Result<usize, DecodeError> {
    Ok(u64_field(obj, path, key)? as usize)
}
