//! Autosave tuning knobs.
//!
//! # Invariants
//! - The debounce interval is clamped to `[100 ms, 10 s]`.
//! - Missing or zero values fall back to the document kind's default.

use crate::autosave::fingerprint::Canonicalizer;
use crate::model::document::DocumentKind;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const DEBOUNCE_MIN_MS: u64 = 100;
const DEBOUNCE_MAX_MS: u64 = 10_000;

/// Raw config as read from a settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAutosaveConfig {
    debounce_ms: Option<u64>,
    #[serde(default)]
    extra_transient_keys: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid autosave config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
        }
    }
}

/// Effective autosave settings for one document kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub kind: DocumentKind,
    pub debounce: Duration,
    pub extra_transient_keys: Vec<String>,
}

impl AutosaveConfig {
    /// Defaults for `kind`.
    pub fn for_kind(kind: DocumentKind) -> Self {
        Self {
            kind,
            debounce: kind.default_debounce(),
            extra_transient_keys: Vec::new(),
        }
    }

    /// Overrides the debounce interval, applying the clamp.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        let millis = u64::try_from(debounce.as_millis()).unwrap_or(DEBOUNCE_MAX_MS);
        self.debounce = normalize_debounce_ms(self.kind, Some(millis));
        self
    }

    /// Parses JSON such as `{"debounce_ms": 750}`.
    pub fn from_json_str(kind: DocumentKind, raw: &str) -> Result<Self, ConfigError> {
        let parsed: RawAutosaveConfig = if raw.trim().is_empty() {
            RawAutosaveConfig::default()
        } else {
            serde_json::from_str(raw).map_err(ConfigError::Parse)?
        };

        Ok(Self {
            kind,
            debounce: normalize_debounce_ms(kind, parsed.debounce_ms),
            extra_transient_keys: parsed.extra_transient_keys,
        })
    }

    /// Fingerprint rule for this kind plus configured extras.
    pub fn canonicalizer(&self) -> Canonicalizer {
        Canonicalizer::for_kind(self.kind).with_transient_keys(self.extra_transient_keys.clone())
    }
}

/// Normalizes a configured debounce according to the autosave contract.
pub fn normalize_debounce_ms(kind: DocumentKind, debounce_ms: Option<u64>) -> Duration {
    match debounce_ms {
        None | Some(0) => kind.default_debounce(),
        Some(value) => Duration::from_millis(value.clamp(DEBOUNCE_MIN_MS, DEBOUNCE_MAX_MS)),
    }
}
