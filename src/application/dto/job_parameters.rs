use crate::shared::error::SyncError;
use crate::shared::SyncResult;
use std::collections::BTreeMap;

pub const PARAM_SILENT: &str = "SILENT";
pub const PARAM_BACKGROUND: &str = "BACKGROUND";
pub const PARAM_YEARS: &str = "YEARS";
pub const PARAM_CLEAR: &str = "CLEAR";

const DEFAULTS: [(&str, &str); 4] = [
    (PARAM_SILENT, "no"),
    (PARAM_BACKGROUND, "yes"),
    (PARAM_YEARS, ""),
    (PARAM_CLEAR, "no"),
];

/// JobParameters - String parameters handed to a job by its caller
///
/// Keys are case-insensitive and stored upper-cased. Unknown keys are kept
/// so that callers can see them, but the `update-cve` job ignores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParameters {
    values: BTreeMap<String, String>,
}

impl Default for JobParameters {
    fn default() -> Self {
        let values = DEFAULTS
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self { values }
    }
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.trim().to_ascii_uppercase(), value.into());
        self
    }

    /// Builder-style variant of [`JobParameters::set`]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Parses an assignment of the form `KEY=VALUE`
    pub fn set_assignment(&mut self, assignment: &str) -> SyncResult<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            SyncError::InvalidParameter {
                name: assignment.to_string(),
                value: String::new(),
                reason: "expected KEY=VALUE".to_string(),
            }
        })?;
        if key.trim().is_empty() {
            return Err(SyncError::InvalidParameter {
                name: key.to_string(),
                value: value.to_string(),
                reason: "parameter name must not be empty".to_string(),
            });
        }
        self.set(key, value.trim());
        Ok(())
    }

    /// Reads a yes/no parameter
    ///
    /// # Errors
    /// Returns `SyncError::InvalidParameter` for words outside
    /// `yes/y/true/1/on` and `no/n/false/0/off`
    pub fn flag(&self, key: &str) -> SyncResult<bool> {
        let raw = self.get(key).unwrap_or_default();
        parse_flag(raw).ok_or_else(|| SyncError::InvalidParameter {
            name: key.to_ascii_uppercase(),
            value: raw.to_string(),
            reason: "expected yes or no".to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "on" => Some(true),
        "no" | "n" | "false" | "0" | "off" => Some(false),
        _ => None,
    }
}
