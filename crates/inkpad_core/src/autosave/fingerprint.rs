//! Canonical structural fingerprints for document snapshots.
//!
//! # Responsibility
//! - Serialize `(normalized title, content)` into one canonical string.
//! - Hash the canonical form into a short, comparable fingerprint.
//!
//! # Invariants
//! - Object keys are emitted in byte-wise sorted order; array order is kept.
//! - Keys in the transient set are dropped at every depth.
//! - Equal fingerprints imply equal persisted meaning for the same kind.

use crate::model::document::{DocumentKind, DocumentSnapshot};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Hex-encoded BLAKE3 digest of a canonical snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, enough to correlate log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalization rule for one document kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalizer {
    transient_keys: BTreeSet<String>,
}

impl Canonicalizer {
    /// Rule with no transient keys.
    pub fn strict() -> Self {
        Self {
            transient_keys: BTreeSet::new(),
        }
    }

    /// Rule with the default transient keys for `kind`.
    pub fn for_kind(kind: DocumentKind) -> Self {
        Self::strict().with_transient_keys(kind.transient_keys().iter().copied())
    }

    /// Adds more keys to drop before hashing.
    pub fn with_transient_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transient_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn is_transient(&self, key: &str) -> bool {
        self.transient_keys.contains(key)
    }

    /// Canonical JSON text for a snapshot: `[title, content]`.
    pub fn canonical_form(&self, snapshot: &DocumentSnapshot) -> String {
        let mut out = String::with_capacity(64);
        out.push('[');
        write_json_string(&mut out, snapshot.normalized_title());
        out.push(',');
        self.write_value(&mut out, &snapshot.content);
        out.push(']');
        out
    }

    pub fn fingerprint(&self, snapshot: &DocumentSnapshot) -> Fingerprint {
        let canonical = self.canonical_form(snapshot);
        Fingerprint(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                out.push_str(&value.to_string());
            }
            Value::Array(items) => {
                out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    self.write_value(out, item);
                }
                out.push(']');
            }
            Value::Object(map) => {
                let mut entries = map
                    .iter()
                    .filter(|(key, _)| !self.is_transient(key))
                    .collect::<Vec<_>>();
                entries.sort_by(|(left, _), (right, _)| left.as_bytes().cmp(right.as_bytes()));

                out.push('{');
                for (index, (key, item)) in entries.into_iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    write_json_string(out, key);
                    out.push(':');
                    self.write_value(out, item);
                }
                out.push('}');
            }
        }
    }
}

/// Escapes through serde_json so keys and titles match its string rules.
fn write_json_string(out: &mut String, text: &str) {
    out.push_str(&Value::from(text).to_string());
}

#[cfg(test)]
mod tests {
    use super::Canonicalizer;
    use crate::model::document::{DocumentKind, DocumentSnapshot};
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_fingerprint() {
        let rule = Canonicalizer::strict();
        let left: serde_json::Value =
            serde_json::from_str(r#"{"type":"doc","attrs":{"a":1,"b":[true,null]}}"#).unwrap();
        let right: serde_json::Value =
            serde_json::from_str(r#"{"attrs":{"b":[true,null],"a":1},"type":"doc"}"#).unwrap();

        assert_eq!(
            rule.fingerprint(&DocumentSnapshot::new("t", left)),
            rule.fingerprint(&DocumentSnapshot::new("t", right))
        );
    }

    #[test]
    fn array_order_is_meaningful() {
        let rule = Canonicalizer::strict();
        let a = DocumentSnapshot::new("t", json!([1, 2]));
        let b = DocumentSnapshot::new("t", json!([2, 1]));
        assert_ne!(rule.fingerprint(&a), rule.fingerprint(&b));
    }

    #[test]
    fn blank_and_untitled_titles_are_equivalent() {
        let rule = Canonicalizer::strict();
        let content = json!({ "type": "doc" });
        assert_eq!(
            rule.fingerprint(&DocumentSnapshot::new("  ", content.clone())),
            rule.fingerprint(&DocumentSnapshot::new("Untitled", content))
        );
    }

    #[test]
    fn canvas_ignores_app_state_at_any_depth() {
        let rule = Canonicalizer::for_kind(DocumentKind::Canvas);
        let base = DocumentSnapshot::new(
            "Board",
            json!({ "elements": [{ "id": "a", "x": 1 }], "appState": { "zoom": 1 } }),
        );
        let moved_view = DocumentSnapshot::new(
            "Board",
            json!({
                "elements": [{ "id": "a", "x": 1, "selectedElementIds": { "a": true } }],
                "appState": { "zoom": 3 },
            }),
        );
        assert_eq!(rule.fingerprint(&base), rule.fingerprint(&moved_view));

        let edited = DocumentSnapshot::new("Board", json!({ "elements": [{ "id": "a", "x": 2 }] }));
        assert_ne!(rule.fingerprint(&base), rule.fingerprint(&edited));
    }

    #[test]
    fn canonical_form_escapes_strings() {
        let rule = Canonicalizer::strict();
        let snapshot = DocumentSnapshot::new("a\"b", json!({ "k\n": "\u{1}" }));
        assert_eq!(
            rule.canonical_form(&snapshot),
            r#"["a\"b",{"k\n":"\u0001"}]"#
        );
    }

    #[test]
    fn canonical_form_matches_serde_json_scalars() {
        let rule = Canonicalizer::strict();
        let content = json!({ "z": 1.5, "a": ["\u{8}\u{c}", -3, false, null] });
        assert_eq!(
            rule.canonical_form(&DocumentSnapshot::new("t", content)),
            r#"["t",{"a":["\b\f",-3,false,null],"z":1.5}]"#
        );
    }

    #[test]
    fn extra_transient_keys_are_honored() {
        let rule = Canonicalizer::for_kind(DocumentKind::Note).with_transient_keys(["cursor"]);
        let a = DocumentSnapshot::new("t", json!({ "cursor": 4, "text": "x" }));
        let b = DocumentSnapshot::new("t", json!({ "cursor": 9, "text": "x" }));
        assert_eq!(rule.fingerprint(&a), rule.fingerprint(&b));
        assert_eq!(rule.fingerprint(&a).short().len(), 12);
    }
}
