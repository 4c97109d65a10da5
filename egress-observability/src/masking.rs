//! Partial masking of sensitive request fields.
//!
//! A sensitive value keeps its first and last fifth visible so an operator
//! can still tell two tokens apart, while the middle is replaced with
//! [`MASK_CHAR`]. Short values are masked entirely.
//!
//! ```
//! use egress_observability::masking::{mask_text, SensitiveFields, mask};
//! use serde_json::json;
//!
//! assert_eq!(mask_text("abcdefgh"), "a******h");
//! assert_eq!(mask_text("abcd"), "****");
//!
//! let fields = json!({"token": "abcdefghij", "page": 2});
//! let masked = mask(&SensitiveFields::default(), fields.as_object().unwrap());
//! assert_eq!(masked["token"], "ab******ij");
//! assert_eq!(masked["page"], 2);
//! ```

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Replacement character for masked positions.
pub const MASK_CHAR: char = '*';

/// Field names masked when the caller does not supply its own set.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &["Authorization", "access_token", "token"];

/// Values shorter than this are masked entirely.
const MIN_PARTIAL_LEN: usize = 5;

/// Set of field names whose values must never be stored in clear text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveFields {
    names: BTreeSet<String>,
}

impl SensitiveFields {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact match, used for payload and query-parameter keys.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// ASCII case-insensitive match, used for header names.
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for SensitiveFields {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_FIELDS.iter().copied())
    }
}

impl<S: Into<String>> FromIterator<S> for SensitiveFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// ─────────────────────────────────────────────────────────────
// Field-map masking
// ─────────────────────────────────────────────────────────────

/// Return a copy of `fields` with every sensitive value masked.
///
/// Keys are matched exactly. `null` values and keys outside `sensitive`
/// are copied unchanged.
pub fn mask(sensitive: &SensitiveFields, fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| {
            let value = if sensitive.contains(key) {
                mask_value(value)
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Header variant of [`mask`]: names are matched case-insensitively.
pub fn mask_headers(
    sensitive: &SensitiveFields,
    headers: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if sensitive.contains_ignore_case(name) {
                mask_text(value)
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

/// Mask a single sensitive value.
///
/// Strings are masked by character and arrays by element. Numbers, booleans
/// and nested objects are first rendered as text so that nothing sensitive
/// slips through unmasked.
pub fn mask_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(mask_text(s)),
        Value::Array(items) => Value::Array(mask_items(items)),
        Value::Number(n) => Value::String(mask_text(&n.to_string())),
        Value::Bool(b) => Value::String(mask_text(&b.to_string())),
        Value::Object(_) => Value::String(mask_text(&value.to_string())),
    }
}

/// Mask a string, keeping `len / 5` characters visible at each end.
pub fn mask_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    match visible_cut(chars.len()) {
        None => std::iter::repeat_n(MASK_CHAR, chars.len()).collect(),
        Some(cut) => {
            let len = chars.len();
            let mut out = String::with_capacity(text.len());
            out.extend(&chars[..cut]);
            out.extend(std::iter::repeat_n(MASK_CHAR, len - 2 * cut));
            out.extend(&chars[len - cut..]);
            out
        }
    }
}

fn mask_items(items: &[Value]) -> Vec<Value> {
    let masked = || Value::String(MASK_CHAR.to_string());
    let len = items.len();
    match visible_cut(len) {
        None => (0..len).map(|_| masked()).collect(),
        Some(cut) => items[..cut]
            .iter()
            .cloned()
            .chain((0..len - 2 * cut).map(|_| masked()))
            .chain(items[len - cut..].iter().cloned())
            .collect(),
    }
}

/// Number of elements left visible at each end, or `None` when the whole
/// value must be masked.
fn visible_cut(len: usize) -> Option<usize> {
    // floor(len * 0.2)
    let cut = len / 5;
    if len < MIN_PARTIAL_LEN || cut * 2 >= len {
        None
    } else {
        Some(cut)
    }
}

// ─────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────
