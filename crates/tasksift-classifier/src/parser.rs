//! Parse and validate raw classifier output

use crate::types::ValidationFailure;
use serde_json::{Map, Value};
use tasksift_domain::{ClassificationResult, Item};
use tracing::{debug, warn};

/// Keys that may hold the result array, in lookup order
const RESULT_KEYS: &[&str] = &["results", "tasks"];

/// Id fields a classifier may use; numeric values are normalised to strings
const ID_KEYS: &[&str] = &["id", "gid", "task_id"];

/// Extra key holding an id that disagreed with the item at its position
pub const REPORTED_ID_KEY: &str = "reported_id";

/// Prefix for extra keys holding a typed field that could not be coerced
const RAW_PREFIX: &str = "raw_";

/// Spellings accepted for the same result field, preferred first
const FIELD_SPELLINGS: &[&[&str]] = &[ID_KEYS, TYPE_KEYS, EFFORT_KEYS];

const TYPE_KEYS: &[&str] = &["type", "ad_type", "kind"];

const EFFORT_KEYS: &[&str] = &["effort_minutes", "minutes", "effort"];

/// Fields deserialized as optional text
const TEXT_KEYS: &[&str] = &["category", "type", "ad_type", "kind"];

/// Validate a response for `batch`: it must parse and carry exactly one
/// result per item.
///
/// Results are correlated positionally: each entry takes the id of the item
/// at the same position, whatever id the classifier reported.
pub fn validate(raw: &str, batch: &[Item]) -> Result<Vec<ClassificationResult>, ValidationFailure> {
    let value = extract_json(raw).ok_or(ValidationFailure::NoStructuredData)?;
    let entries = results_array(value).ok_or(ValidationFailure::MissingResults)?;

    if entries.len() != batch.len() {
        return Err(ValidationFailure::CountMismatch {
            expected: batch.len(),
            actual: entries.len(),
        });
    }

    let mut results = Vec::with_capacity(entries.len());
    for (index, (entry, item)) in entries.into_iter().zip(batch).enumerate() {
        let mut result = parse_entry(entry)
            .map_err(|reason| ValidationFailure::MalformedEntry { index, reason })?;
        if !result.id.trim().is_empty() && result.id != item.id {
            warn!(
                "Entry {} reported id {} for item {}, keeping position",
                index, result.id, item.id
            );
            result
                .extra
                .insert(REPORTED_ID_KEY.to_string(), Value::String(result.id.clone()));
        }
        result.id = item.id.clone();
        results.push(result);
    }
    Ok(results)
}

/// Best-effort recovery: every well-formed entry found, in order.
///
/// Short arrays are accepted as-is; nothing is padded or invented, and
/// entries keep whatever id the classifier gave them.
pub fn salvage(raw: &str) -> Vec<ClassificationResult> {
    let Some(entries) = extract_json(raw).and_then(results_array) else {
        debug!("Nothing to salvage from {} byte response", raw.len());
        return Vec::new();
    };

    let total = entries.len();
    let results: Vec<_> = entries
        .into_iter()
        .filter_map(|entry| parse_entry(entry).ok())
        .collect();
    if results.len() < total {
        warn!("Salvage skipped {} malformed entries", total - results.len());
    }
    results
}

/// Extract the first JSON value from a response.
///
/// Handles markdown code fences and leading commentary.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = strip_code_fence(raw.trim());

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    // Commentary around the payload: the payload starts at the first opening
    // brace or bracket and trailing text is ignored. Inner values of a
    // truncated payload are not considered.
    let start = trimmed.find(['{', '['])?;
    serde_json::Deserializer::from_str(&trimmed[start..])
        .into_iter::<Value>()
        .next()
        .and_then(Result::ok)
}

/// Strip a surrounding ```` ``` ```` or ```` ```json ```` fence
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Locate the result array in a parsed response
fn results_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(entries) => Some(entries),
        Value::Object(mut map) => RESULT_KEYS.iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(entries)) => Some(entries),
            _ => None,
        }),
        _ => None,
    }
}

fn parse_entry(mut entry: Value) -> Result<ClassificationResult, String> {
    let Some(map) = entry.as_object_mut() else {
        return Err(format!("expected an object, got {}", type_name(&entry)));
    };
    // Keep only the preferred spelling when several are present
    for spellings in FIELD_SPELLINGS {
        let mut present = spellings.iter().filter(|k| map.contains_key(**k));
        if present.next().is_some() {
            let extra: Vec<&str> = present.copied().collect();
            for key in extra {
                map.remove(key);
            }
        }
    }
    coerce_fields(map);
    serde_json::from_value(entry).map_err(|e| e.to_string())
}

/// Bring typed fields into shape so one odd value does not reject the entry.
///
/// Text fields accept numbers and booleans, effort accepts numeric strings.
/// Anything else moves to `raw_<field>` in the extra map.
fn coerce_fields(map: &mut Map<String, Value>) {
    for key in ID_KEYS.iter().chain(TEXT_KEYS).chain(EFFORT_KEYS) {
        if map.get(*key).is_some_and(Value::is_null) {
            map.remove(*key);
        }
    }

    for key in ID_KEYS.iter().chain(TEXT_KEYS) {
        let coerced = match map.get(*key) {
            None | Some(Value::String(_)) => continue,
            Some(Value::Number(n)) => Some(Value::String(n.to_string())),
            Some(Value::Bool(b)) => Some(Value::String(b.to_string())),
            Some(_) => None,
        };
        replace_or_stash(map, key, coerced);
    }

    for key in EFFORT_KEYS {
        let coerced = match map.get(*key) {
            None | Some(Value::Number(_)) => continue,
            Some(Value::String(text)) => text
                .trim()
                .trim_end_matches("min")
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            Some(_) => None,
        };
        replace_or_stash(map, key, coerced);
    }
}

fn replace_or_stash(map: &mut Map<String, Value>, key: &str, coerced: Option<Value>) {
    match coerced {
        Some(value) => {
            map.insert(key.to_string(), value);
        }
        None => {
            if let Some(value) = map.remove(key) {
                debug!("Moved uncoercible {} to {}{}", key, RAW_PREFIX, key);
                map.insert(format!("{}{}", RAW_PREFIX, key), value);
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
