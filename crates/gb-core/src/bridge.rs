use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

pub const WIRE_STATS: &str = "gameStats";
pub const WIRE_COMPLETE: &str = "gameComplete";
pub const WIRE_ERROR: &str = "gameError";
pub const WIRE_HEIGHT: &str = "setHeight";

const WIRE_LOADED_ALIASES: &[&str] = &["game-loaded", "GAME_LOADED"];
const WIRE_ERROR_ALIASES: &[&str] = &["game-error", "GAME_ERROR"];
const WIRE_COMPLETE_ALIASES: &[&str] = &["GAME_COMPLETE"];

/// Event posted by the embedded document to its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum BridgeMessage {
    Stats(JsonValue),
    Complete(CompletionPayload),
    Error(ErrorPayload),
    Height(HeightPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionPayload {
    pub completed: bool,
    pub score: Option<f64>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub source: Option<String>,
    pub line: Option<u64>,
    pub column: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightPayload {
    pub height: f64,
}

/// Result of decoding one cross-document message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Bridge(BridgeMessage),
    Loaded,
    Ignored,
}

impl BridgeMessage {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Stats(_) => "stats",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
            Self::Height(_) => "height",
        }
    }

    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::Stats(_) => WIRE_STATS,
            Self::Complete(_) => WIRE_COMPLETE,
            Self::Error(_) => WIRE_ERROR,
            Self::Height(_) => WIRE_HEIGHT,
        }
    }
}

pub fn encode_wire(message: &BridgeMessage) -> JsonValue {
    let payload = match message {
        BridgeMessage::Stats(stats) => stats.clone(),
        BridgeMessage::Complete(payload) => json!(payload),
        BridgeMessage::Error(payload) => json!(payload),
        BridgeMessage::Height(payload) => json!(payload),
    };
    json!({ "type": message.wire_type(), "payload": payload })
}

/// Decodes a message received from an embedded document.
///
/// Unknown or malformed messages decode to [`Inbound::Ignored`]; nothing here
/// fails, since the sender is untrusted game code.
pub fn decode_wire(value: &JsonValue) -> Inbound {
    let Some(object) = value.as_object() else {
        return Inbound::Ignored;
    };
    let Some(wire_type) = object.get("type").and_then(JsonValue::as_str) else {
        return Inbound::Ignored;
    };
    let payload = object
        .get("payload")
        .or_else(|| object.get("data"))
        .cloned()
        .unwrap_or(JsonValue::Null);

    match wire_type {
        WIRE_STATS => {
            if payload.get("completed").and_then(JsonValue::as_bool) == Some(true) {
                Inbound::Bridge(BridgeMessage::Complete(completion_from(&payload)))
            } else {
                Inbound::Bridge(BridgeMessage::Stats(payload))
            }
        }
        WIRE_COMPLETE => Inbound::Bridge(BridgeMessage::Complete(completion_from(&payload))),
        WIRE_ERROR => Inbound::Bridge(BridgeMessage::Error(error_from(&payload))),
        WIRE_HEIGHT => {
            let height = payload
                .get("height")
                .or_else(|| object.get("height"))
                .and_then(JsonValue::as_f64);
            match height {
                Some(height) if height.is_finite() && height >= 0.0 => {
                    Inbound::Bridge(BridgeMessage::Height(HeightPayload { height }))
                }
                _ => Inbound::Ignored,
            }
        }
        other if WIRE_COMPLETE_ALIASES.contains(&other) => {
            Inbound::Bridge(BridgeMessage::Complete(completion_from(&payload)))
        }
        other if WIRE_ERROR_ALIASES.contains(&other) => {
            Inbound::Bridge(BridgeMessage::Error(error_from(&payload)))
        }
        other if WIRE_LOADED_ALIASES.contains(&other) => Inbound::Loaded,
        _ => Inbound::Ignored,
    }
}

fn completion_from(payload: &JsonValue) -> CompletionPayload {
    let empty = JsonMap::new();
    let object = payload.as_object().unwrap_or(&empty);
    CompletionPayload {
        completed: object
            .get("completed")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true),
        score: object.get("score").and_then(JsonValue::as_f64),
        completed_at: object
            .get("completedAt")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
    }
}

fn error_from(payload: &JsonValue) -> ErrorPayload {
    let empty = JsonMap::new();
    let object = payload.as_object().unwrap_or(&empty);
    ErrorPayload {
        message: object
            .get("message")
            .and_then(JsonValue::as_str)
            .unwrap_or("Unknown error")
            .to_string(),
        source: object
            .get("source")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        line: object.get("line").and_then(JsonValue::as_u64),
        column: object.get("column").and_then(JsonValue::as_u64),
    }
}

#[cfg(test)]
mod bridge_tests {
    use super::*;

    #[test]
    fn decode_wire_maps_primary_types() {
        let stats = decode_wire(&json!({ "type": "gameStats", "payload": { "moves": 3 } }));
        assert_eq!(
            stats,
            Inbound::Bridge(BridgeMessage::Stats(json!({ "moves": 3 })))
        );

        let complete = decode_wire(&json!({
            "type": "gameComplete",
            "payload": { "completed": true, "score": 12, "completedAt": "2026-01-01T00:00:00Z" }
        }));
        assert_eq!(
            complete,
            Inbound::Bridge(BridgeMessage::Complete(CompletionPayload {
                completed: true,
                score: Some(12.0),
                completed_at: Some("2026-01-01T00:00:00Z".to_string()),
            }))
        );

        let error = decode_wire(&json!({
            "type": "gameError",
            "payload": { "message": "boom", "source": "game.js", "line": 4, "column": 9 }
        }));
        let Inbound::Bridge(BridgeMessage::Error(payload)) = error else {
            panic!("error message expected");
        };
        assert_eq!(payload.message, "boom");
        assert_eq!(payload.line, Some(4));
        assert_eq!(payload.column, Some(9));

        let height = decode_wire(&json!({ "type": "setHeight", "payload": { "height": 640 } }));
        assert_eq!(
            height,
            Inbound::Bridge(BridgeMessage::Height(HeightPayload { height: 640.0 }))
        );
    }

    #[test]
    fn decode_wire_accepts_legacy_shapes() {
        let top_level_height = decode_wire(&json!({ "type": "setHeight", "height": 300 }));
        assert_eq!(
            top_level_height,
            Inbound::Bridge(BridgeMessage::Height(HeightPayload { height: 300.0 }))
        );

        let stats_completion = decode_wire(&json!({
            "type": "gameStats",
            "payload": { "completed": true, "score": 5 }
        }));
        assert!(matches!(
            stats_completion,
            Inbound::Bridge(BridgeMessage::Complete(CompletionPayload { score: Some(_), .. }))
        ));

        let legacy_error = decode_wire(&json!({ "type": "GAME_ERROR", "data": { "message": "x" } }));
        assert!(matches!(
            legacy_error,
            Inbound::Bridge(BridgeMessage::Error(ErrorPayload { ref message, .. })) if message == "x"
        ));

        assert_eq!(decode_wire(&json!({ "type": "game-loaded" })), Inbound::Loaded);
        assert_eq!(decode_wire(&json!({ "type": "GAME_LOADED", "success": true })), Inbound::Loaded);
    }

    #[test]
    fn decode_wire_ignores_unknown_and_malformed_messages() {
        assert_eq!(decode_wire(&json!({ "type": "chat" })), Inbound::Ignored);
        assert_eq!(decode_wire(&json!({ "kind": "stats" })), Inbound::Ignored);
        assert_eq!(decode_wire(&json!("setHeight")), Inbound::Ignored);
        assert_eq!(
            decode_wire(&json!({ "type": "setHeight", "payload": { "height": -1 } })),
            Inbound::Ignored
        );
    }

    #[test]
    fn encode_wire_uses_wire_type_and_payload() {
        let encoded = encode_wire(&BridgeMessage::Height(HeightPayload { height: 120.0 }));
        assert_eq!(encoded["type"], "setHeight");
        assert_eq!(encoded["payload"]["height"], 120.0);
        assert_eq!(
            decode_wire(&encoded),
            Inbound::Bridge(BridgeMessage::Height(HeightPayload { height: 120.0 }))
        );
    }
}
