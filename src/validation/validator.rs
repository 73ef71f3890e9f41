use crate::diagnostics::ExtractionLogger;
use crate::steps::{RawValue, StepCandidate, StepLink, StepMeta, StepRecord, StepType};
use crate::validation::rules::{PrintableIdRule, RequiredIdRule, ValidationRule};
use anyhow::Result;
use std::collections::HashSet;
use std::str::FromStr;

const STAGE: &str = "validation";

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Run every rule, then normalize the candidate into a record
    ///
    /// A non-blank string id is required whatever the rule set; rules can
    /// only add checks.
    pub fn validate(&self, candidate: &StepCandidate) -> Result<StepRecord> {
        for rule in &self.rules {
            if let Err(e) = rule.validate(candidate) {
                anyhow::bail!("[{}] {}", rule.name(), e);
            }
        }
        match &candidate.id {
            Some(RawValue::Str(id)) if !id.trim().is_empty() => Ok(normalize(id, candidate)),
            _ => anyhow::bail!("[Validator] Step id must be a non-blank string"),
        }
    }

    /// Validate in order, dropping rejects and every repeat of an id seen before
    pub fn validate_all(
        &self,
        candidates: Vec<StepCandidate>,
        logger: &dyn ExtractionLogger,
    ) -> Vec<StepRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let record = match self.validate(&candidate) {
                Ok(record) => record,
                Err(e) => {
                    logger.diagnostic(
                        STAGE,
                        &format!("dropped step {}: {}", candidate.label(), e),
                    );
                    continue;
                }
            };
            if candidate.step_type.is_some() && record.step_type.is_none() {
                logger.diagnostic(
                    STAGE,
                    &format!("dropped unknown step type on step \"{}\"", record.id),
                );
            }
            if !seen.insert(record.id.clone()) {
                logger.diagnostic(
                    STAGE,
                    &format!("dropped duplicate step id \"{}\"", record.id),
                );
                continue;
            }
            records.push(record);
        }

        records
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![Box::new(RequiredIdRule), Box::new(PrintableIdRule)],
        }
    }
}

fn normalize(id: &str, candidate: &StepCandidate) -> StepRecord {
    let meta = StepMeta {
        title: candidate.title.clone(),
        description: candidate.description.clone(),
    };

    StepRecord {
        id: id.to_string(),
        step_type: candidate
            .step_type
            .as_ref()
            .and_then(RawValue::as_str)
            .and_then(|kind| StepType::from_str(kind).ok()),
        next_step: candidate.next_step.as_ref().map(link),
        previous_step: candidate.previous_step.as_ref().map(link),
        skip_to_step: candidate.skip_to_step.as_ref().map(link),
        is_skippable: candidate.is_skippable,
        condition: candidate
            .condition
            .as_ref()
            .filter(|text| !text.trim().is_empty())
            .cloned(),
        meta: (!meta.is_empty()).then_some(meta),
    }
}

/// Strings link to a step; `"null"` and every non-string value become `null`
fn link(value: &RawValue) -> StepLink {
    match value {
        RawValue::Str(target) if target != "null" => StepLink::To(target.clone()),
        _ => StepLink::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoopLogger;
    use crate::diagnostics::PhaseReport;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl ExtractionLogger for Recording {
        fn diagnostic(&self, stage: &str, message: &str) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(format!("{}: {}", stage, message));
            }
        }

        fn phase(&self, _report: &PhaseReport) {}
    }

    fn ids(records: &[StepRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_validator_valid_candidate() {
        let mut candidate = StepCandidate::with_id("a");
        candidate.step_type = Some(RawValue::Str("CONFIRMATION".into()));
        candidate.is_skippable = Some(true);
        candidate.title = Some("Done".into());

        let record = Validator::new().validate(&candidate).unwrap();
        assert_eq!(record.id, "a");
        assert_eq!(record.step_type, Some(StepType::Confirmation));
        assert_eq!(record.is_skippable, Some(true));
        assert_eq!(record.title(), Some("Done"));
    }

    #[test]
    fn test_validator_names_failing_rule() {
        let result = Validator::new().validate(&StepCandidate::default());
        assert!(result.unwrap_err().to_string().contains("RequiredId"));
    }

    #[test]
    fn test_navigation_coercion() {
        let mut candidate = StepCandidate::with_id("a");
        candidate.next_step = Some(RawValue::Str("null".into()));
        candidate.previous_step = Some(RawValue::Expr("prev()".into()));
        candidate.skip_to_step = Some(RawValue::Str("z".into()));

        let record = Validator::new().validate(&candidate).unwrap();
        assert_eq!(record.next_step, Some(StepLink::Null));
        assert_eq!(record.previous_step, Some(StepLink::Null));
        assert_eq!(record.skip_to_step, Some(StepLink::To("z".into())));
    }

    #[test]
    fn test_unknown_type_blank_condition_and_empty_meta_are_dropped() {
        let mut candidate = StepCandidate::with_id("a");
        candidate.step_type = Some(RawValue::Str("information".into()));
        candidate.condition = Some("  ".into());

        let record = Validator::new().validate(&candidate).unwrap();
        assert_eq!(record.step_type, None);
        assert_eq!(record.condition, None);
        assert_eq!(record.meta, None);
    }

    #[test]
    fn test_validate_all_dedups_first_wins() {
        let mut first = StepCandidate::with_id("a");
        first.title = Some("first".into());
        let mut second = StepCandidate::with_id("a");
        second.title = Some("second".into());
        let candidates = vec![
            first,
            StepCandidate::with_id("b"),
            StepCandidate::default(),
            second,
        ];

        let logger = Recording::default();
        let records = Validator::new().validate_all(candidates, &logger);
        assert_eq!(ids(&records), vec!["a", "b"]);
        assert_eq!(records[0].title(), Some("first"));

        let lines = logger.0.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("validation: dropped step <no id>"));
        assert_eq!(lines[1], "validation: dropped duplicate step id \"a\"");
    }

    #[test]
    fn test_custom_rules_still_require_an_id() {
        let validator = Validator::with_rules(vec![]);
        let records = validator.validate_all(
            vec![
                StepCandidate::with_id(""),
                StepCandidate::with_id("  "),
                StepCandidate::default(),
                StepCandidate::with_id("x"),
            ],
            &NoopLogger,
        );
        assert_eq!(ids(&records), vec!["x"]);
    }
}
