//! Validated step records

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Closed set of step kinds a flow editor knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    Information,
    SingleChoice,
    MultipleChoice,
    Checklist,
    Confirmation,
    CustomComponent,
}

impl StepType {
    pub const ALL: [StepType; 6] = [
        StepType::Information,
        StepType::SingleChoice,
        StepType::MultipleChoice,
        StepType::Checklist,
        StepType::Confirmation,
        StepType::CustomComponent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Information => "INFORMATION",
            StepType::SingleChoice => "SINGLE_CHOICE",
            StepType::MultipleChoice => "MULTIPLE_CHOICE",
            StepType::Checklist => "CHECKLIST",
            StepType::Confirmation => "CONFIRMATION",
            StepType::CustomComponent => "CUSTOM_COMPONENT",
        }
    }
}

impl FromStr for StepType {
    type Err = ();

    /// Matching is exact: `"information"` is not a step kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigation target of a step
///
/// A navigation field is either absent (`None` on the record), an explicit
/// `null`, or a step id. The literal text `"null"` is normalized to
/// [`StepLink::Null`] during validation and never appears as `To("null")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepLink {
    Null,
    To(String),
}

impl StepLink {
    pub fn target(&self) -> Option<&str> {
        match self {
            StepLink::Null => None,
            StepLink::To(id) => Some(id),
        }
    }
}

impl Serialize for StepLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StepLink::Null => serializer.serialize_none(),
            StepLink::To(id) => serializer.serialize_str(id),
        }
    }
}

/// Display metadata attached to a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StepMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// One extracted flow step
///
/// Serializes with the camelCase field names the editor consumes; absent
/// optional fields are omitted rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub step_type: Option<StepType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<StepLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_step: Option<StepLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_to_step: Option<StepLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_skippable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<StepMeta>,
}

impl StepRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type: None,
            next_step: None,
            previous_step: None,
            skip_to_step: None,
            is_skippable: None,
            condition: None,
            meta: None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.title.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_type_round_trips_through_str() {
        for kind in StepType::ALL {
            assert_eq!(kind.as_str().parse::<StepType>(), Ok(kind));
        }
    }

    #[test]
    fn test_step_type_rejects_unknown_and_lowercase() {
        assert!("information".parse::<StepType>().is_err());
        assert!("WIZARD".parse::<StepType>().is_err());
        assert!("".parse::<StepType>().is_err());
    }

    #[test]
    fn test_record_serializes_only_present_fields() {
        let mut record = StepRecord::new("s1");
        record.step_type = Some(StepType::Information);
        record.meta = Some(StepMeta {
            title: Some("Welcome".to_string()),
            description: None,
        });

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"id": "s1", "type": "INFORMATION", "meta": {"title": "Welcome"}})
        );
    }

    #[test]
    fn test_null_link_serializes_as_json_null() {
        let mut record = StepRecord::new("s2");
        record.next_step = Some(StepLink::Null);
        record.skip_to_step = Some(StepLink::To("s9".to_string()));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": "s2", "nextStep": null, "skipToStep": "s9"}));
    }

    #[test]
    fn test_link_target() {
        assert_eq!(StepLink::Null.target(), None);
        assert_eq!(StepLink::To("a".into()).target(), Some("a"));
    }
}
