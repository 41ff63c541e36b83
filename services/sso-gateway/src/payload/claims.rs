//! Claim extraction from session attributes.

use super::{Claims, SessionAttributes};
use serde_json::Value;

/// Suffix requesting every value of an attribute as an array.
pub const ARRAY_SUFFIX: &str = "[]";

/// Pull the named claims out of `attributes`, in the order given.
///
/// `name` takes the first value, `name[]` takes all values as an array and
/// stores them under `name`. Absent attributes are skipped.
#[must_use]
pub fn extract_claims(names: &[String], attributes: &SessionAttributes) -> Claims {
    let mut claims = Claims::new();
    for name in names {
        if let Some(base) = name.strip_suffix(ARRAY_SUFFIX) {
            if let Some(values) = attributes.get(base) {
                claims.insert(base.to_string(), Value::Array(values.to_vec()));
            }
        } else if let Some(first) = attributes.get(name).and_then(<[Value]>::first) {
            claims.insert(name.clone(), first.clone());
        }
    }
    claims
}
