//! Output formatting for multiple formats
//!
//! JSON is what the flow editor consumes; YAML and the human layout exist for
//! reading results in a terminal.

use anyhow::{Context, Result};

use crate::extractors::{ConditionTable, StrategyComparison};
use crate::steps::{StepLink, StepRecord};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_steps(&self, steps: &[StepRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(steps).context("Failed to serialize steps to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(steps).context("Failed to serialize steps to YAML")
            }
            OutputFormat::Human => Ok(self.format_steps_human(steps)),
        }
    }

    pub fn format_conditions(&self, table: &ConditionTable) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(table)
                .context("Failed to serialize condition table to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(table)
                .context("Failed to serialize condition table to YAML"),
            OutputFormat::Human => Ok(self.format_conditions_human(table)),
        }
    }

    pub fn format_comparison(&self, comparison: &StrategyComparison) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(comparison)
                .context("Failed to serialize comparison to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(comparison)
                .context("Failed to serialize comparison to YAML"),
            OutputFormat::Human => Ok(self.format_comparison_human(comparison)),
        }
    }

    fn format_steps_human(&self, steps: &[StepRecord]) -> String {
        let mut output = String::new();
        if steps.is_empty() {
            output.push_str("\u{26A0} No steps found\n");
            return output;
        }

        output.push_str(&format!("\u{2713} {} step(s)\n{}\n", steps.len(), RULE));
        for (i, step) in steps.iter().enumerate() {
            let kind = step
                .step_type
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "(untyped)".to_string());
            output.push_str(&format!("\n{}. {}  [{}]\n", i + 1, step.id, kind));

            let mut lines = Vec::new();
            if let Some(title) = step.title() {
                lines.push(format!("Title:     {}", title));
            }
            if let Some(description) = step.meta.as_ref().and_then(|m| m.description.as_deref()) {
                lines.push(format!("Details:   {}", description));
            }
            for (label, link) in [
                ("Next:     ", &step.next_step),
                ("Previous: ", &step.previous_step),
                ("Skip to:  ", &step.skip_to_step),
            ] {
                if let Some(link) = link {
                    lines.push(format!("{} {}", label, describe_link(link)));
                }
            }
            if let Some(skippable) = step.is_skippable {
                lines.push(format!("Skippable: {}", skippable));
            }
            if let Some(condition) = &step.condition {
                lines.push(format!("Condition: {}", condition));
            }

            for (j, line) in lines.iter().enumerate() {
                let connector = if j + 1 == lines.len() {
                    "\u{2514}"
                } else {
                    "\u{251C}"
                };
                output.push_str(&format!("   {}\u{2500} {}\n", connector, line));
            }
        }
        output
    }

    fn format_conditions_human(&self, table: &ConditionTable) -> String {
        if table.is_empty() {
            return "No condition functions found\n".to_string();
        }
        let mut output = format!("Condition Functions ({}):\n", table.len());
        for (name, text) in table.iter() {
            output.push_str(&format!("  {} = {}\n", name, text));
        }
        output
    }

    fn format_comparison_human(&self, comparison: &StrategyComparison) -> String {
        let mut output = String::new();
        if comparison.diverges {
            output.push_str("\u{26A0} Strategies disagree\n");
        } else {
            output.push_str("\u{2713} Strategies agree\n");
        }
        output.push_str(&format!("{}\n", RULE));
        output.push_str(&format!(
            "Structural ({}): {}\n",
            comparison.structural.len(),
            join_or_none(&comparison.structural)
        ));
        output.push_str(&format!(
            "Grammar    ({}): {}\n",
            comparison.grammar.len(),
            join_or_none(&comparison.grammar)
        ));
        output
    }
}

fn describe_link(link: &StepLink) -> String {
    match link {
        StepLink::Null => "(none)".to_string(),
        StepLink::To(id) => id.clone(),
    }
}

fn join_or_none(ids: &[String]) -> String {
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.join(", ")
    }
}
