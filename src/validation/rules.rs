use crate::steps::{RawValue, StepCandidate};
use anyhow::Result;

/// A check a candidate must pass to become a [`StepRecord`](crate::steps::StepRecord)
///
/// Rules only reject. Coercion of acceptable-but-odd values happens in the
/// validator after every rule has passed.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, candidate: &StepCandidate) -> Result<()>;
}

pub struct RequiredIdRule;

impl ValidationRule for RequiredIdRule {
    fn name(&self) -> &'static str {
        "RequiredId"
    }

    fn validate(&self, candidate: &StepCandidate) -> Result<()> {
        match &candidate.id {
            None => anyhow::bail!("Step id is missing"),
            Some(RawValue::Str(id)) if id.trim().is_empty() => {
                anyhow::bail!("Step id cannot be blank")
            }
            Some(RawValue::Str(_)) => Ok(()),
            Some(other) => anyhow::bail!("Step id must be a string, found {:?}", other),
        }
    }
}

/// Control characters make an id unusable as a graph node key
pub struct PrintableIdRule;

impl ValidationRule for PrintableIdRule {
    fn name(&self) -> &'static str {
        "PrintableId"
    }

    fn validate(&self, candidate: &StepCandidate) -> Result<()> {
        if let Some(RawValue::Str(id)) = &candidate.id {
            if id.chars().any(char::is_control) {
                anyhow::bail!("Step id {:?} contains control characters", id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn with_raw_id(id: Option<RawValue>) -> StepCandidate {
        StepCandidate {
            id,
            ..Default::default()
        }
    }

    #[parameterized(
        missing = { None },
        blank = { Some(RawValue::Str("   ".into())) },
        empty = { Some(RawValue::Str(String::new())) },
        null = { Some(RawValue::Null) },
        number = { Some(RawValue::Number("3".into())) },
        expression = { Some(RawValue::Expr("makeId()".into())) },
    )]
    fn test_required_id_rejects(id: Option<RawValue>) {
        assert!(RequiredIdRule.validate(&with_raw_id(id)).is_err());
    }

    #[test]
    fn test_required_id_accepts_string() {
        assert!(RequiredIdRule.validate(&StepCandidate::with_id("a")).is_ok());
    }

    #[test]
    fn test_printable_id() {
        assert!(PrintableIdRule.validate(&StepCandidate::with_id("step one")).is_ok());
        assert!(PrintableIdRule.validate(&StepCandidate::with_id("a\nb")).is_err());
        assert!(PrintableIdRule.validate(&with_raw_id(None)).is_ok());
    }
}
