use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Persisted component state: the selected zone id wrapped around whatever
/// opaque state the host keeps for itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SavedSnapshot {
    pub zone_id: String,
    #[serde(default)]
    pub host_state: Value,
}

impl SavedSnapshot {
    pub fn new(zone_id: impl Into<String>, host_state: Value) -> Self {
        Self {
            zone_id: zone_id.into(),
            host_state,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Recognises a snapshot, handing `value` back unchanged when it is not one.
    pub fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match Self::deserialize(&value) {
            Ok(snapshot) => Ok(snapshot),
            Err(_) => Err(value),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encodes_zone_and_host_state() {
        let snapshot = SavedSnapshot::new("America/New_York", json!({ "scroll": 3 }));
        let bytes = snapshot.encode().unwrap();
        let decoded = SavedSnapshot::decode(&bytes).unwrap();

        assert_eq!(decoded.zone_id, "America/New_York");
        assert_eq!(decoded.host_state, json!({ "scroll": 3 }));
        assert_eq!(SavedSnapshot::from_value(snapshot.to_value().unwrap()), Ok(snapshot));
    }

    #[test]
    fn host_state_is_optional() {
        let snapshot = SavedSnapshot::from_value(json!({ "zone_id": "UTC" })).unwrap();
        assert_eq!(snapshot.host_state, Value::Null);
    }

    #[test]
    fn unexpected_shapes_are_handed_back() {
        for value in [
            json!(null),
            json!("America/New_York"),
            json!({ "zone_id": 7 }),
            json!({ "zone_id": "UTC", "extra": true }),
        ] {
            assert_eq!(SavedSnapshot::from_value(value.clone()), Err(value));
        }
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        assert!(SavedSnapshot::decode(b"{not json").is_err());
    }
}
