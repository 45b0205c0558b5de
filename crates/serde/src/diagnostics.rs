//! Diagnostics and result outcome.
//!
//! Every graph or parse call collects its findings in a [`DiagnosticList`].
//! Nested calls return their own lists, which the caller merges in traversal
//! order, so the list handed back at the top is deterministic for a given
//! input. The overall [`ResultOutcome`] is derived from it exactly once.

use serde::Serialize;
use serde_json::Value;

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message.
    Information,
    /// Structural problem; processing continued on a best-effort basis.
    Warning,
    /// Conformance violation.
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Information => "information",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    /// A child element no property claims.
    UnknownElement,
    /// An attribute no property claims.
    UnknownAttribute,
    /// No choice candidate fits the runtime type.
    UnresolvedChoice,
    /// Attribute text differs from the declared fixed value.
    FixedValueMismatch,
    /// A field without wire metadata was dropped.
    MissingMetadata,
    /// A null-flavored placeholder was sent for missing data.
    NullSynthesized,
    /// Character data inside a structured element.
    UnexpectedText,
    /// A value whose type does not fit the property.
    TypeMismatch,
    /// The document root is not a declared entry point.
    NotEntryPoint,
    /// An element outside the HL7 namespace.
    UnexpectedNamespace,
    /// Required data is absent.
    MissingValue,
    /// A mandatory property carries a null flavor.
    NullNotAllowed,
    /// Occurrence count outside the declared bounds.
    Cardinality,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::UnknownElement => "unknown-element",
            IssueCode::UnknownAttribute => "unknown-attribute",
            IssueCode::UnresolvedChoice => "unresolved-choice",
            IssueCode::FixedValueMismatch => "fixed-value-mismatch",
            IssueCode::MissingMetadata => "missing-metadata",
            IssueCode::NullSynthesized => "null-synthesized",
            IssueCode::UnexpectedText => "unexpected-text",
            IssueCode::TypeMismatch => "type-mismatch",
            IssueCode::NotEntryPoint => "not-entry-point",
            IssueCode::UnexpectedNamespace => "unexpected-namespace",
            IssueCode::MissingValue => "missing-value",
            IssueCode::NullNotAllowed => "null-not-allowed",
            IssueCode::Cardinality => "cardinality",
        }
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticDetail {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    /// Element path the finding refers to, e.g. `/PRPA_IN201305UV02/id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Underlying reason, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl DiagnosticDetail {
    pub fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            path: None,
            cause: None,
        }
    }

    pub fn information(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Information, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Converts to JSON.
    pub fn to_json(&self) -> Value {
        let mut detail = serde_json::json!({
            "severity": self.severity.as_str(),
            "code": self.code.as_str(),
            "message": self.message,
        });

        if let Some(path) = &self.path {
            detail["path"] = serde_json::json!(path);
        }
        if let Some(cause) = &self.cause {
            detail["cause"] = serde_json::json!(cause);
        }

        detail
    }
}

/// Overall verdict on a graph or parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultOutcome {
    Accepted,
    AcceptedNonConformant,
    Rejected,
}

impl ResultOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultOutcome::Accepted => "accepted",
            ResultOutcome::AcceptedNonConformant => "accepted-non-conformant",
            ResultOutcome::Rejected => "rejected",
        }
    }

    /// True unless the result was rejected.
    pub fn is_accepted(&self) -> bool {
        *self != ResultOutcome::Rejected
    }
}

/// Ordered collection of diagnostics owned by one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticList {
    details: Vec<DiagnosticDetail>,
}

impl DiagnosticList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detail: DiagnosticDetail) {
        self.details.push(detail);
    }

    /// Appends a nested call's diagnostics after the ones already collected.
    pub fn merge(&mut self, other: DiagnosticList) {
        self.details.extend(other.details);
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticDetail> {
        self.details.iter()
    }

    /// Returns the details of one severity, in order.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &DiagnosticDetail> {
        self.details.iter().filter(move |d| d.severity == severity)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticDetail> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticDetail> {
        self.with_severity(Severity::Warning)
    }

    /// Returns the details carrying `code`, in order.
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &DiagnosticDetail> {
        self.details.iter().filter(move |d| d.code == code)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Derives the outcome. With validation disabled a rejection is capped at
    /// [`ResultOutcome::AcceptedNonConformant`].
    pub fn outcome(&self, validation_enabled: bool) -> ResultOutcome {
        if self.has_errors() {
            if validation_enabled {
                ResultOutcome::Rejected
            } else {
                ResultOutcome::AcceptedNonConformant
            }
        } else if self.has_warnings() {
            ResultOutcome::AcceptedNonConformant
        } else {
            ResultOutcome::Accepted
        }
    }

    /// Converts to a JSON array of details.
    pub fn to_json(&self) -> Value {
        Value::Array(self.details.iter().map(DiagnosticDetail::to_json).collect())
    }
}

impl IntoIterator for DiagnosticList {
    type Item = DiagnosticDetail;
    type IntoIter = std::vec::IntoIter<DiagnosticDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.details.into_iter()
    }
}

impl<'a> IntoIterator for &'a DiagnosticList {
    type Item = &'a DiagnosticDetail;
    type IntoIter = std::slice::Iter<'a, DiagnosticDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.details.iter()
    }
}

impl Extend<DiagnosticDetail> for DiagnosticList {
    fn extend<T: IntoIterator<Item = DiagnosticDetail>>(&mut self, iter: T) {
        self.details.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning() -> DiagnosticDetail {
        DiagnosticDetail::warning(IssueCode::UnknownElement, "unknown element 'foo'")
    }

    fn error() -> DiagnosticDetail {
        DiagnosticDetail::error(IssueCode::MissingValue, "mandatory 'id' is absent")
    }

    #[test]
    fn test_empty_list_is_accepted() {
        assert_eq!(DiagnosticList::new().outcome(true), ResultOutcome::Accepted);
    }

    #[test]
    fn test_information_does_not_downgrade() {
        let mut list = DiagnosticList::new();
        list.push(DiagnosticDetail::information(
            IssueCode::NullSynthesized,
            "sent nullFlavor=NI",
        ));
        assert_eq!(list.outcome(true), ResultOutcome::Accepted);
    }

    #[test]
    fn test_warnings_only() {
        let mut list = DiagnosticList::new();
        list.push(warning());
        assert_eq!(list.outcome(true), ResultOutcome::AcceptedNonConformant);
        assert_eq!(list.outcome(false), ResultOutcome::AcceptedNonConformant);
    }

    #[test]
    fn test_errors_reject_unless_validation_disabled() {
        let mut list = DiagnosticList::new();
        list.push(warning());
        list.push(error());
        assert_eq!(list.outcome(true), ResultOutcome::Rejected);
        assert_eq!(list.outcome(false), ResultOutcome::AcceptedNonConformant);
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut outer = DiagnosticList::new();
        outer.push(warning());
        let mut nested = DiagnosticList::new();
        nested.push(error());
        outer.merge(nested);

        let codes: Vec<IssueCode> = outer.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![IssueCode::UnknownElement, IssueCode::MissingValue]);
        assert_eq!(outer.errors().count(), 1);
    }

    #[test]
    fn test_to_json() {
        let mut list = DiagnosticList::new();
        list.push(warning().with_path("/Patient/foo"));

        let json = list.to_json();
        assert_eq!(json[0]["severity"], "warning");
        assert_eq!(json[0]["code"], "unknown-element");
        assert_eq!(json[0]["path"], "/Patient/foo");
        assert!(json[0].get("cause").is_none());

        let serialized = serde_json::to_value(&list).unwrap();
        assert_eq!(serialized[0]["severity"], "warning");
    }
}
