//! The schema-free debug event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One debug log entry: an arbitrary JSON object.
///
/// Producers usually send fields such as `file`, `line`, `func`, `dump`
/// and `epochms`, but nothing is required. The event serializes as the
/// bare object, so a snapshot of events is a plain JSON array of objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Create an event with no fields.
    pub fn empty() -> Self {
        Self(Map::new())
    }

    /// Decode an event from a JSON string.
    ///
    /// Fails unless the top-level value is a JSON object.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Look up a single field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of fields in the event.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
