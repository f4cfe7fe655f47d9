use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Raw record keys every inventory entry must carry to be processed.
pub const REQUIRED_FIELDS: [&str; 4] = ["VIN", "TrimName", "TotalPrice", "OptionCodeList"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// One poll result from the inventory API.
#[derive(Debug, Clone, Default)]
pub struct InventoryResponse {
    pub total_matches_found: u64,
    pub results: Vec<Value>,
}

impl InventoryResponse {
    /// Builds a response from the raw API body. Anything that isn't an object
    /// with a `results` array collapses to an empty response.
    pub fn from_value(body: Value) -> Self {
        let Value::Object(mut map) = body else {
            return Self::default();
        };

        let total_matches_found = map
            .get("total_matches_found")
            .and_then(value_as_u64)
            .unwrap_or(0);

        let results = match map.remove("results") {
            Some(Value::Array(results)) => results,
            _ => Vec::new(),
        };

        Self {
            total_matches_found,
            results,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub vin: String,
    pub trim_name: String,
    pub price: String,
    pub option_codes: String,
    #[serde(default)]
    pub features: ItemFeatures,
}

impl InventoryItem {
    pub fn from_value(record: &Value) -> Result<Self, RecordError> {
        let Value::Object(map) = record else {
            return Err(RecordError::NotAnObject);
        };

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|key| map.get(*key).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(RecordError::MissingFields(missing));
        }

        Ok(Self {
            vin: text_field(&map["VIN"]),
            trim_name: text_field(&map["TrimName"]),
            price: text_field(&map["TotalPrice"]),
            option_codes: text_field(&map["OptionCodeList"]),
            features: ItemFeatures::from_option_specs(map.get("OptionCodeSpecs")),
        })
    }
}

fn text_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Human-readable specs pulled out of `OptionCodeSpecs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFeatures {
    pub range: Option<String>,
    pub top_speed: Option<String>,
    pub acceleration: Option<String>,
    pub paint: Option<String>,
    pub wheels: Option<String>,
    pub interior: Option<String>,
    pub seats: Option<String>,
    pub autopilot: Option<String>,
}

impl ItemFeatures {
    pub fn from_option_specs(specs: Option<&Value>) -> Self {
        let mut features = Self::default();
        let Some(specs) = specs else {
            return features;
        };

        for spec in group_options(specs, "C_SPECS") {
            let name = option_name(spec);
            match spec.get("code").and_then(Value::as_str) {
                Some("SPECS_RANGE") => features.range = name,
                Some("SPECS_TOP_SPEED") => features.top_speed = name,
                Some("SPECS_ACCELERATION") => features.acceleration = name,
                _ => {}
            }
        }

        for option in group_options(specs, "C_OPTS") {
            let group = option
                .get("lexiconGroup")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            let name = option_name(option);
            match group.as_str() {
                "paint" => features.paint = name,
                "wheels" => features.wheels = name,
                "interior" => features.interior = name,
                "rear_seats" => features.seats = name,
                "autopilot" => features.autopilot = name,
                _ => {}
            }
        }

        features
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn group_options<'a>(specs: &'a Value, group: &str) -> impl Iterator<Item = &'a Value> {
    specs
        .get(group)
        .and_then(|g| g.get("options"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn option_name(option: &Value) -> Option<String> {
    option
        .get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Per-identifier tracking state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub notification_count: u32,
}
