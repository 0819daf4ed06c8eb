//! Flat attribute mappings, the interchange shape between sources, the
//! merge step, and entity construction.

use serde_json::{Map, Value};

/// One entity's attributes as a flat JSON object.
pub type EntityAttrs = Map<String, Value>;

/// Merge a previously known attribute mapping with a newly observed one.
///
/// Newly observed values win on key collision; previously known keys absent
/// from the new observation survive. Inputs are not modified, so curated
/// fields the observer does not know about carry over from run to run.
pub fn merge(old: &EntityAttrs, new: &EntityAttrs) -> EntityAttrs {
    let mut merged = old.clone();
    for (key, value) in new {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Read a string attribute, if present and actually a string.
pub fn get_str<'a>(attrs: &'a EntityAttrs, key: &str) -> Option<&'a str> {
    attrs.get(key).and_then(Value::as_str)
}
