// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! JSON wire format for instruction batches.
//!
//! A batch is an array of objects tagged with `"type"`:
//!
//! ```json
//! [
//!   { "type": "add_component", "id": "api", "componentType": "service", "label": "API" },
//!   { "type": "add_connection", "from": "web", "to": "api", "protocol": "https" }
//! ]
//! ```
//!
//! The single-key form `{ "add_component": { ... } }` is accepted as well. Elements that cannot be
//! decoded turn into [`Instruction::Unknown`] or [`Instruction::Malformed`] so the engine can
//! report them in order while the rest of the batch still applies.

use serde_json::{Map, Value};

use super::Instruction;

#[derive(Debug, thiserror::Error)]
pub enum BatchDecodeError {
    #[error("instruction batch is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("instruction batch must be a JSON array, found {found}")]
    NotAnArray { found: &'static str },
}

/// Decodes a batch from JSON text.
pub fn decode_batch_str(input: &str) -> Result<Vec<Instruction>, BatchDecodeError> {
    let value: Value = serde_json::from_str(input)?;
    decode_batch(value)
}

/// Decodes a batch from an already parsed JSON value.
///
/// Only a non-array input is an error. Individual elements never fail the batch.
pub fn decode_batch(value: Value) -> Result<Vec<Instruction>, BatchDecodeError> {
    let Value::Array(elements) = value else {
        return Err(BatchDecodeError::NotAnArray {
            found: json_kind(&value),
        });
    };
    Ok(elements.into_iter().map(decode_element).collect())
}

fn decode_element(element: Value) -> Instruction {
    let Value::Object(mut object) = element else {
        return Instruction::Malformed {
            tag: None,
            reason: format!("expected an object, found {}", json_kind(&element)),
        };
    };

    let tag = match object.get("type").cloned() {
        Some(Value::String(tag)) => tag,
        Some(other) => {
            return Instruction::Malformed {
                tag: None,
                reason: format!("`type` must be a string, found {}", json_kind(&other)),
            };
        }
        None => match single_key_form(&mut object) {
            Some(tag) => tag,
            None => {
                return Instruction::Malformed {
                    tag: None,
                    reason: "missing `type` tag".to_owned(),
                };
            }
        },
    };

    if !Instruction::KNOWN_TAGS.contains(&tag.as_str()) {
        return Instruction::Unknown { tag };
    }

    match serde_json::from_value::<Instruction>(Value::Object(object)) {
        Ok(instruction) => instruction,
        Err(err) => Instruction::Malformed {
            tag: Some(tag),
            reason: err.to_string(),
        },
    }
}

/// Rewrites `{ "<tag>": { ...payload } }` into `{ "type": "<tag>", ...payload }` in place.
fn single_key_form(object: &mut Map<String, Value>) -> Option<String> {
    if object.len() != 1 {
        return None;
    }
    let (tag, payload) = object.iter().next()?;
    let Value::Object(payload) = payload else {
        return None;
    };
    let tag = tag.clone();
    let mut flattened = payload.clone();
    flattened.insert("type".to_owned(), Value::String(tag.clone()));
    *object = flattened;
    Some(tag)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// JSON Schema for a single batch element, for handing to external instruction generators.
pub fn instruction_batch_schema() -> Value {
    let schema = schemars::schema_for!(Instruction);
    schema.as_value().clone()
}

#[cfg(test)]
mod tests {
    use super::{decode_batch, decode_batch_str, instruction_batch_schema, BatchDecodeError};
    use crate::engine::Instruction;
    use serde_json::json;

    #[test]
    fn decodes_tagged_elements_in_order() {
        let batch = decode_batch(json!([
            { "type": "add_component", "id": "api", "componentType": "service", "x": 10, "y": 20 },
            { "type": "add_connection", "from": "web", "to": "api", "protocol": "https" },
            { "type": "remove_component", "id": "legacy" }
        ]))
        .expect("batch");

        assert_eq!(batch.len(), 3);
        let Instruction::AddComponent(add) = &batch[0] else {
            panic!("expected add_component, got {:?}", batch[0]);
        };
        assert_eq!(add.id.as_deref(), Some("api"));
        assert_eq!(add.component_type, "service");
        assert_eq!(add.x, Some(10.0));
        assert_eq!(batch[1].tag(), "add_connection");
        assert_eq!(batch[2], Instruction::remove_component("legacy"));
    }

    #[test]
    fn accepts_single_key_form() {
        let batch = decode_batch(json!([
            { "update_component": { "id": "api", "label": "Gateway" } }
        ]))
        .expect("batch");

        let Instruction::UpdateComponent(update) = &batch[0] else {
            panic!("expected update_component, got {:?}", batch[0]);
        };
        assert_eq!(update.id, "api");
        assert_eq!(update.patch.label.as_deref(), Some("Gateway"));
    }

    #[test]
    fn unknown_and_malformed_elements_do_not_fail_the_batch() {
        let batch = decode_batch(json!([
            { "type": "teleport_component", "id": "x" },
            { "type": "add_connection", "from": "a" },
            42,
            { "label": "no tag" }
        ]))
        .expect("batch");

        assert_eq!(
            batch[0],
            Instruction::Unknown {
                tag: "teleport_component".to_owned()
            }
        );
        assert!(matches!(
            &batch[1],
            Instruction::Malformed { tag: Some(tag), .. } if tag == "add_connection"
        ));
        assert!(matches!(&batch[2], Instruction::Malformed { tag: None, .. }));
        assert!(matches!(&batch[3], Instruction::Malformed { tag: None, .. }));
    }

    #[test]
    fn non_array_input_is_an_error() {
        let err = decode_batch(json!({ "type": "add_component" })).unwrap_err();
        assert!(matches!(err, BatchDecodeError::NotAnArray { found: "an object" }));

        let err = decode_batch_str("[").unwrap_err();
        assert!(matches!(err, BatchDecodeError::Json(_)));
    }

    #[test]
    fn schema_lists_every_known_tag() {
        let schema = instruction_batch_schema().to_string();
        for tag in Instruction::KNOWN_TAGS {
            assert!(schema.contains(tag), "schema is missing {tag}");
        }
    }
}
