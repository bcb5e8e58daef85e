//! Severity-classified error records and the per-document error log.
//!
//! Every record carries a deterministic fingerprint so tooling that stores
//! or diffs logs can recognise the same finding across runs:
//! `fingerprint = "e1_" || base32hex_lower(SHA256(canonical key))`, where
//! the canonical key is the compact JSON object of code, line, column and
//! message with sorted keys.

use sbml_schema::{Category, Revision, Severity, catalog};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::fmt;

/// One logged finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub fingerprint: String,
    pub code: u32,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// Package that reported the record; empty for core.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
}

impl ErrorRecord {
    /// Builds a record for a catalog code, using the severity the catalog
    /// assigns in `revision`. A non-empty `detail` is appended to the
    /// catalog message on its own line.
    pub fn new(code: u32, revision: Revision, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let (category, base) = match catalog::definition(code) {
            Some(def) => (def.category, def.message),
            None => (Category::Internal, "Unrecognized error code."),
        };
        let message = if detail.is_empty() {
            base.to_string()
        } else {
            format!("{base}\n{detail}")
        };
        let mut record = Self {
            fingerprint: String::new(),
            code,
            severity: catalog::severity_for(code, revision),
            category,
            message,
            line: None,
            column: None,
            package: String::new(),
        };
        record.refresh_fingerprint();
        record
    }

    /// Record for a code defined by a package rather than the core catalog.
    pub fn for_package(
        package: impl Into<String>,
        code: u32,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            fingerprint: String::new(),
            code,
            severity,
            category: Category::Package,
            message: message.into(),
            line: None,
            column: None,
            package: package.into(),
        };
        record.refresh_fingerprint();
        record
    }

    /// Attaches a source position.
    pub fn at(mut self, line: Option<u32>, column: Option<u32>) -> Self {
        self.line = line;
        self.column = column;
        self.refresh_fingerprint();
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    fn refresh_fingerprint(&mut self) {
        self.fingerprint = compute_fingerprint(self.code, self.line, self.column, &self.message);
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        write!(f, "({} [{}]) {}", self.code, self.severity, self.message)
    }
}

/// Deterministic record fingerprint.
pub fn compute_fingerprint(
    code: u32,
    line: Option<u32>,
    column: Option<u32>,
    message: &str,
) -> String {
    let key: Value = json!({
        "code": code,
        "column": column,
        "line": line,
        "message": message,
    });
    let key_bytes = serde_json::to_vec(&key).unwrap_or_default();
    let hash = Sha256::digest(&key_bytes);
    format!("e1_{}", base32hex_lower_no_pad(&hash))
}

/// RFC 4648 base32hex, lowercase, without padding.
fn base32hex_lower_no_pad(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";

    let mut result = String::with_capacity(data.len() * 8 / 5 + 1);
    let mut bits: u64 = 0;
    let mut num_bits: u32 = 0;
    for &byte in data {
        bits = (bits << 8) | u64::from(byte);
        num_bits += 8;
        while num_bits >= 5 {
            num_bits -= 5;
            result.push(ALPHABET[((bits >> num_bits) & 0x1f) as usize] as char);
        }
    }
    if num_bits > 0 {
        result.push(ALPHABET[((bits << (5 - num_bits)) & 0x1f) as usize] as char);
    }
    result
}

/// How severities are adjusted as records are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeverityOverride {
    /// Log records unchanged.
    #[default]
    Disabled,
    /// Warnings are logged as errors.
    AsError,
    /// Errors are logged as warnings.
    AsWarning,
    /// Info and warning records are dropped.
    DontLog,
}

/// Ordered record list of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
    #[serde(default)]
    severity_override: SeverityOverride,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record after applying the current override; returns
    /// whether it was kept.
    pub fn log(&mut self, mut record: ErrorRecord) -> bool {
        match self.severity_override {
            SeverityOverride::Disabled => {}
            SeverityOverride::AsError => {
                if record.severity == Severity::Warning {
                    record.severity = Severity::Error;
                }
            }
            SeverityOverride::AsWarning => {
                if record.severity == Severity::Error {
                    record.severity = Severity::Warning;
                }
            }
            SeverityOverride::DontLog => {
                if record.severity < Severity::Error {
                    return false;
                }
            }
        }
        self.records.push(record);
        true
    }

    pub fn add_all(&mut self, records: impl IntoIterator<Item = ErrorRecord>) {
        for record in records {
            self.log(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ErrorRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    /// Records of exactly `severity`.
    pub fn num_with_severity(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    /// Records of `severity` or worse.
    pub fn num_at_least(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|r| r.severity >= severity)
            .count()
    }

    /// The `n`th record of exactly `severity`.
    pub fn error_with_severity(&self, n: usize, severity: Severity) -> Option<&ErrorRecord> {
        self.records
            .iter()
            .filter(|r| r.severity == severity)
            .nth(n)
    }

    pub fn contains(&self, code: u32) -> bool {
        self.records.iter().any(|r| r.code == code)
    }

    /// Removes the first record with `code`.
    pub fn remove(&mut self, code: u32) -> Option<ErrorRecord> {
        let idx = self.records.iter().position(|r| r.code == code)?;
        Some(self.records.remove(idx))
    }

    pub fn remove_all(&mut self, code: u32) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.code != code);
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn severity_override(&self) -> SeverityOverride {
        self.severity_override
    }

    pub fn set_severity_override(&mut self, mode: SeverityOverride) {
        self.severity_override = mode;
    }

    /// JSON rendering of the records for external tools.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbml_schema::code;

    #[test]
    fn records_take_message_and_severity_from_catalog() {
        let record = ErrorRecord::new(
            code::DUPLICATE_COMPONENT_ID,
            Revision::L3V2,
            "  The Species id 's' conflicts.",
        );
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.category, Category::IdentifierConsistency);
        assert!(record.message.ends_with("\n  The Species id 's' conflicts."));
    }

    #[test]
    fn fingerprints_are_stable_and_position_sensitive() {
        let a = ErrorRecord::new(code::MISSING_MODEL, Revision::L2V4, "").at(Some(3), Some(1));
        let b = ErrorRecord::new(code::MISSING_MODEL, Revision::L2V4, "").at(Some(3), Some(1));
        let c = ErrorRecord::new(code::MISSING_MODEL, Revision::L2V4, "").at(Some(4), Some(1));
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
        assert!(a.fingerprint.starts_with("e1_"));
        assert_eq!(a.fingerprint.len(), 3 + 52);
    }

    #[test]
    fn overrides_adjust_logged_severity() {
        let warning = ErrorRecord::new(code::PARAMETER_UNITS, Revision::L3V2, "");
        let error = ErrorRecord::new(code::MISSING_MODEL, Revision::L3V1, "");

        let mut log = ErrorLog::new();
        log.set_severity_override(SeverityOverride::AsError);
        log.log(warning.clone());
        assert_eq!(log.get(0).map(|r| r.severity), Some(Severity::Error));

        log.set_severity_override(SeverityOverride::AsWarning);
        log.log(error.clone());
        assert_eq!(log.get(1).map(|r| r.severity), Some(Severity::Warning));

        log.set_severity_override(SeverityOverride::DontLog);
        assert!(!log.log(warning));
        assert!(log.log(error));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn severity_queries() {
        let mut log = ErrorLog::new();
        log.log(ErrorRecord::new(code::PARAMETER_UNITS, Revision::L3V2, ""));
        log.log(ErrorRecord::new(code::MISSING_MODEL, Revision::L3V1, ""));
        log.log(ErrorRecord::new(code::BADLY_FORMED_XML, Revision::L3V2, ""));
        assert_eq!(log.num_with_severity(Severity::Error), 1);
        assert_eq!(log.num_at_least(Severity::Error), 2);
        assert_eq!(
            log.error_with_severity(0, Severity::Fatal).map(|r| r.code),
            Some(code::BADLY_FORMED_XML)
        );
        assert!(log.remove(code::MISSING_MODEL).is_some());
        assert!(!log.contains(code::MISSING_MODEL));
    }

    #[test]
    fn display_lists_code_severity_and_line() {
        let mut log = ErrorLog::new();
        log.log(ErrorRecord::new(code::MISSING_MODEL, Revision::L2V4, "").at(Some(2), None));
        assert_eq!(
            log.to_string(),
            "line 2: (20201 [Error]) An SBML document must contain a <model>.\n"
        );
    }

    #[test]
    fn json_export_uses_camel_case() {
        let mut log = ErrorLog::new();
        log.log(ErrorRecord::new(code::MISSING_MODEL, Revision::L2V4, "").at(Some(2), Some(5)));
        let json = log.to_json().expect("json");
        let value: Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value[0]["code"], 20201);
        assert_eq!(value[0]["severity"], "error");
        assert_eq!(value[0]["category"], "general_consistency");
        assert_eq!(value[0]["line"], 2);
        assert!(value[0].get("package").is_none());
    }
}
