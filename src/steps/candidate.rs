//! Pre-validation step candidates

use serde::Serialize;

/// Loosely-typed field value as found in the source
///
/// Extractors record what they saw without deciding whether it is acceptable;
/// the validator owns coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    Str(String),
    Null,
    Bool(bool),
    Number(String),
    /// Any other expression, kept as rendered source text
    Expr(String),
}

impl RawValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Fields harvested from one step-shaped object literal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepCandidate {
    pub id: Option<RawValue>,
    pub step_type: Option<RawValue>,
    pub next_step: Option<RawValue>,
    pub previous_step: Option<RawValue>,
    pub skip_to_step: Option<RawValue>,
    pub is_skippable: Option<bool>,
    pub condition: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl StepCandidate {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(RawValue::Str(id.into())),
            ..Default::default()
        }
    }

    /// Best-effort label used in diagnostics
    pub fn label(&self) -> String {
        match &self.id {
            Some(RawValue::Str(s)) => format!("\"{}\"", s),
            Some(RawValue::Null) => "null".to_string(),
            Some(RawValue::Bool(b)) => b.to_string(),
            Some(RawValue::Number(n)) | Some(RawValue::Expr(n)) => n.clone(),
            None => "<no id>".to_string(),
        }
    }
}
