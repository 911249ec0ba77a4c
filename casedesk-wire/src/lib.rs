//! Wire format of the selection endpoint used by the dual-list widget.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data attribute carrying the filter key when none is configured.
pub const DEFAULT_DATA_ATTR: &str = "product-id";
/// Prefix of the query parameter naming the entity being edited, e.g. `for_suite`.
pub const FOR_PARAM_PREFIX: &str = "for_";
pub const JSON_MIME: &str = "application/json";

/// One item as delivered by the endpoint.
///
/// The record is kept as the raw JSON object so that templates see every field the
/// server sent. The accessors only read the handful of fields the client itself needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemRecord(pub Map<String, Value>);

impl ItemRecord {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Scalar field rendered as text. Numbers are formatted, strings returned as is,
    /// anything else is treated as absent.
    pub fn text(&self, field: &str) -> Option<String> {
        scalar_text(self.0.get(field)?)
    }

    pub fn id(&self) -> Option<String> {
        self.text("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn product_id(&self) -> Option<String> {
        self.text("product_id")
            .or_else(|| self.0.get("product").and_then(|p| p.get("id")).and_then(scalar_text))
    }

    /// Position inside the entity being edited. `None` for unselected items.
    pub fn order(&self) -> Option<i64> {
        self.0.get("order").and_then(Value::as_i64)
    }

    /// Username of the creator, if the server knows one.
    pub fn author(&self) -> Option<&str> {
        self.0
            .get("created_by")
            .and_then(|c| c.get("username"))
            .and_then(Value::as_str)
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.0
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The two partitions. `selected` comes in persisted order, `unselected` in no
/// particular order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionObjects {
    #[serde(default)]
    pub selected: Vec<ItemRecord>,
    #[serde(default)]
    pub unselected: Vec<ItemRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub objects: SelectionObjects,
}

pub fn parse_selection_response(body: &str) -> Result<SelectionResponse, serde_json::Error> {
    serde_json::from_str(body)
}
