// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Recursive merge of descriptor data.
//!
//! Descriptor data is folded across layers by recursively overlaying one
//! structured tree onto another. The rules are applied per key of the
//! overlay:
//!
//! 1. Key missing from base? Insert it.
//! 2. Both sides are mappings? Recurse, __unless__ the overlay mapping is
//!    empty. An empty overlay mapping replaces the base value wholesale. This
//!    is the __explicit-suppression rule__, and is how a layer says "no
//!    footer here, thank you".
//! 3. Both sides are equal? Nothing to do.
//! 4. Anything else replaces the base value.
//!
//! Lists are leaf values. They are never merged element by element.

use serde_json::{Map, Value};

/// Overlay `overlay` onto `base` in place.
///
/// When both sides are mappings, keys are folded in one by one following the
/// module rules. When either side is not a mapping, the overlay replaces the
/// base entirely. An empty top-level overlay mapping is a no-op; suppression
/// only applies to nested keys.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => merge_map(base, overlay),
        (base, overlay) => *base = overlay,
    }
}

/// Merge `overlay` into a copy of `base`, leaving `base` untouched.
pub fn merged(base: &Value, overlay: Value) -> Value {
    let mut result = base.clone();
    merge(&mut result, overlay);
    result
}

fn merge_map(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        let Some(existing) = base.get_mut(&key) else {
            base.insert(key, value);
            continue;
        };

        match (existing, value) {
            // INVARIANT: Empty overlay mapping suppresses the base mapping.
            (Value::Object(existing), Value::Object(nested)) if nested.is_empty() => {
                existing.clear();
            }
            (Value::Object(existing), Value::Object(nested)) => merge_map(existing, nested),
            (existing, value) if *existing == value => {}
            (existing, value) => *existing = value,
        }
    }
}

/// Check if a descriptor section counts as explicitly empty.
///
/// Null, empty mappings, empty lists, and empty strings are all empty.
pub fn is_empty_section(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(list) => list.is_empty(),
        Value::String(text) => text.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
