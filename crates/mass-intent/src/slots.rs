use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{IntentError, IntentResult};
use crate::intent::SlotValue;

pub const QUERY_SLOT: &str = "query";
pub const NAME_SLOT: &str = "name";
pub const AREA_SLOT: &str = "area";

pub const PLAY_MEDIA_SLOT_SCHEMA: &[&str] = &[QUERY_SLOT, NAME_SLOT, AREA_SLOT];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Validated slots of the play-media intent.
pub struct PlayMediaSlots {
    pub query: Option<String>,
    pub name: Option<String>,
    pub area: Option<String>,
}

impl PlayMediaSlots {
    pub fn from_raw(raw: &BTreeMap<String, SlotValue>) -> IntentResult<Self> {
        let mut validated = validate_slots(PLAY_MEDIA_SLOT_SCHEMA, raw)?;
        Ok(Self {
            query: validated.remove(QUERY_SLOT),
            name: validated.remove(NAME_SLOT),
            area: validated.remove(AREA_SLOT),
        })
    }
}

/// Checks raw slots against `schema` and coerces each value to a string.
pub fn validate_slots(
    schema: &[&str],
    raw: &BTreeMap<String, SlotValue>,
) -> IntentResult<BTreeMap<String, String>> {
    let mut validated = BTreeMap::new();
    for (name, slot) in raw {
        if !schema.contains(&name.as_str()) {
            return Err(IntentError::InvalidSlots(format!(
                "extra keys not allowed @ data['{name}']"
            )));
        }
        let value = coerce_slot_string(&slot.value).ok_or_else(|| {
            IntentError::InvalidSlots(format!("expected str for dictionary value @ data['{name}']"))
        })?;
        validated.insert(name.clone(), value);
    }
    Ok(validated)
}

fn coerce_slot_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
