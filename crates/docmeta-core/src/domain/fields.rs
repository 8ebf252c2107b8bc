//! Field maps and the empty-field diff
//!
//! Remote list-item fields are a loosely typed JSON object. Graph reports
//! internal column names, which differ from display names in casing and in
//! how spaces are encoded (`Tipo de Documento` becomes
//! `Tipo_x0020_de_x0020_Documento`), so every lookup here is tolerant of
//! both.

use serde_json::{Map, Value};

/// Field name to scalar JSON value
pub type FieldMap = Map<String, Value>;

const ENCODED_SPACE: &str = "_x0020_";

/// Whether a remote value counts as "not filled in".
///
/// Only `null` and blank strings are empty. `0`, `false`, arrays and objects
/// are considered filled.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Looks up `key` in `fields`.
///
/// Tries an exact match, then a case-insensitive match, then (for keys that
/// contain spaces) the `_x0020_` encoded form with the same two steps.
pub fn find_field<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a Value> {
    lookup(fields, key).or_else(|| {
        if key.contains(' ') {
            lookup(fields, &key.replace(' ', ENCODED_SPACE))
        } else {
            None
        }
    })
}

fn lookup<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a Value> {
    fields.get(key).or_else(|| {
        fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Computes the update set for one item.
///
/// With `force_update` every generated field is returned. Otherwise a
/// generated field survives only when the remote item lacks it or holds an
/// empty value. Applying the result and diffing again yields an empty map.
pub fn filter_empty_fields(generated: &FieldMap, existing: &FieldMap, force_update: bool) -> FieldMap {
    if force_update {
        return generated.clone();
    }

    generated
        .iter()
        .filter(|(key, _)| find_field(existing, key).map_or(true, is_empty_value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Restricts `fields` to the names in `include`, keyed by the requested name.
///
/// An empty include-list means "everything". Requested names that are not
/// present are left out.
pub fn restrict_to(fields: &FieldMap, include: &[String]) -> FieldMap {
    if include.is_empty() {
        return fields.clone();
    }

    include
        .iter()
        .filter_map(|name| find_field(fields, name).map(|v| (name.clone(), v.clone())))
        .collect()
}
