//! The event record published to the broker.

use serde::{Deserialize, Serialize};

/// A synthetic profile action event.
///
/// Serialized as `{"ts": .., "pid": .., "aid": ..}`; a batch goes on the wire
/// as a JSON array of these objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unix seconds at generation time.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Hashed profile identifier.
    #[serde(rename = "pid")]
    pub profile_id: i64,
    /// Action identifier. Always zero for now.
    #[serde(rename = "aid")]
    pub action_id: i32,
}

impl Event {
    pub fn new(timestamp: i64, profile_id: i64) -> Self {
        Self {
            timestamp,
            profile_id,
            action_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let event = Event::new(1_700_000_000, -42);
        let json = serde_json::to_value(event).unwrap();

        assert_eq!(json["ts"], 1_700_000_000);
        assert_eq!(json["pid"], -42);
        assert_eq!(json["aid"], 0);
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_batch_encodes_as_array() {
        let batch = vec![Event::new(1, 2), Event::new(3, 4)];
        let encoded = serde_json::to_string(&batch).unwrap();

        assert_eq!(
            encoded,
            r#"[{"ts":1,"pid":2,"aid":0},{"ts":3,"pid":4,"aid":0}]"#
        );
    }
}
