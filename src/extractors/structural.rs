//! Structural extraction - brace-balance scan plus field regexes
//!
//! The primary strategy never parses. Every `{` outside literals and comments
//! is matched to its closing brace; an object whose own level carries a
//! string `id` becomes a candidate and its fields are read with independent
//! regexes. Nested sub-objects are masked before matching so a `nextStep`
//! inside `meta` or an option list cannot leak into the step.

use super::conditions::{unresolved_placeholder, ConditionTable};
use crate::diagnostics::ExtractionLogger;
use crate::error::ExtractError;
use crate::scan::{self, Segment, Segments};
use crate::steps::{RawValue, StepCandidate, StepRecord, StepType};
use crate::syntax::lexer::unescape;
use crate::validation::Validator;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;
use std::str::FromStr;

const STAGE: &str = "structural";

const STRING_VALUE: &str = r#"(?:"((?:[^"\\\n]|\\.)*)"|'((?:[^'\\\n]|\\.)*)'|`([^`$\\]*)`)"#;

/// `name: value` where the key starts the text or follows a delimiter and may be quoted
fn field_regex(name: &str, value: &str) -> Regex {
    Regex::new(&format!(r#"(?:^|[{{,\s])["']?{}["']?\s*:\s*{}"#, name, value))
        .expect("valid regex")
}

static ID: Lazy<Regex> = Lazy::new(|| field_regex("id", STRING_VALUE));

static TYPE: Lazy<Regex> = Lazy::new(|| {
    field_regex(
        "type",
        &format!(r"(?:{}|([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)+))", STRING_VALUE),
    )
});

static IS_SKIPPABLE: Lazy<Regex> = Lazy::new(|| field_regex("isSkippable", r"(true|false)\b"));

static CONDITION: Lazy<Regex> = Lazy::new(|| field_regex("condition", ""));

static NESTED_META: Lazy<Regex> = Lazy::new(|| field_regex("(?:meta|payload)", r"\{"));

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("valid regex"));

static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{}$", STRING_VALUE)).expect("valid regex"));

static NAV_FIELDS: Lazy<[(NavField, Regex); 3]> = Lazy::new(|| {
    [
        (NavField::Next, field_regex("nextStep", "")),
        (NavField::Previous, field_regex("previousStep", "")),
        (NavField::SkipTo, field_regex("skipToStep", "")),
    ]
});

static TEXT_FIELDS: Lazy<[(TextField, Regex); 2]> = Lazy::new(|| {
    [
        (TextField::Title, field_regex("title", STRING_VALUE)),
        (TextField::Description, field_regex("description", STRING_VALUE)),
    ]
});

#[derive(Clone, Copy)]
enum NavField {
    Next,
    Previous,
    SkipTo,
}

#[derive(Clone, Copy)]
enum TextField {
    Title,
    Description,
}

/// One object literal: original text plus its own-level view
struct ObjectText<'t> {
    text: &'t str,
    own: String,
    own_spans: Vec<Range<usize>>,
}

impl<'t> ObjectText<'t> {
    fn new(text: &'t str) -> Self {
        let own = scan::mask_nested(text);
        let own_spans = scan::opaque_spans(&own);
        Self {
            text,
            own,
            own_spans,
        }
    }

    /// First own-level match of `re` that does not start inside a literal
    fn find<'a>(&'a self, re: &Regex) -> Option<Captures<'a>> {
        re.captures_iter(&self.own).find(|caps| {
            caps.get(0)
                .map_or(false, |m| !scan::in_spans(&self.own_spans, m.start()))
        })
    }
}

/// Decoded value of whichever string alternative matched, starting at group `first`
fn string_capture(caps: &Captures<'_>, first: usize) -> Option<String> {
    (first..first + 3)
        .find_map(|group| caps.get(group))
        .map(|m| unescape(m.as_str()))
}

pub struct StructuralExtractor<'a> {
    conditions: &'a ConditionTable,
    logger: &'a dyn ExtractionLogger,
}

impl<'a> StructuralExtractor<'a> {
    pub fn new(conditions: &'a ConditionTable, logger: &'a dyn ExtractionLogger) -> Self {
        Self { conditions, logger }
    }

    /// Validated records, in source order
    pub fn extract(&self, source: &str, validator: &Validator) -> Vec<StepRecord> {
        validator.validate_all(self.candidates(source), self.logger)
    }

    /// Every id-bearing object literal that is not nested inside another one
    pub fn candidates(&self, source: &str) -> Vec<StepCandidate> {
        let mut candidates = Vec::new();
        let mut covered_until = 0;

        for (range, segment) in Segments::new(source) {
            if segment != Segment::Code(b'{') || range.start < covered_until {
                continue;
            }
            let open = range.start;
            let Some(close) = scan::find_matching(source, open) else {
                let error = ExtractError::Unbalanced { offset: open };
                self.logger.diagnostic(STAGE, &error.to_string());
                continue;
            };

            if let Some(candidate) = self.read_object(&source[open..=close]) {
                candidates.push(candidate);
                covered_until = close + 1;
            }
        }

        candidates
    }

    fn read_object(&self, text: &str) -> Option<StepCandidate> {
        let object = ObjectText::new(text);
        let id = object.find(&ID).and_then(|caps| string_capture(&caps, 1))?;

        let mut candidate = StepCandidate::with_id(id);
        candidate.step_type = object.find(&TYPE).and_then(|caps| {
            string_capture(&caps, 1)
                .or_else(|| caps.get(4).map(|m| last_segment(m.as_str()).to_string()))
                .filter(|kind| StepType::from_str(kind).is_ok())
                .map(RawValue::Str)
        });

        for (field, re) in NAV_FIELDS.iter() {
            let value = read_link(&object, re);
            match field {
                NavField::Next => candidate.next_step = value,
                NavField::Previous => candidate.previous_step = value,
                NavField::SkipTo => candidate.skip_to_step = value,
            }
        }

        candidate.is_skippable = object
            .find(&IS_SKIPPABLE)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str() == "true");
        candidate.condition = self.read_condition(&object);

        let nested = nested_meta(&object);
        for (field, re) in TEXT_FIELDS.iter() {
            let value = object
                .find(re)
                .and_then(|caps| string_capture(&caps, 1))
                .or_else(|| {
                    nested
                        .as_ref()
                        .and_then(|meta| meta.find(re))
                        .and_then(|caps| string_capture(&caps, 1))
                });
            match field {
                TextField::Title => candidate.title = value,
                TextField::Description => candidate.description = value,
            }
        }

        Some(candidate)
    }

    /// Identifier → condition table, inline function → verbatim, other → placeholder
    fn read_condition(&self, object: &ObjectText<'_>) -> Option<String> {
        let start = object.find(&CONDITION)?.get(0)?.end();
        let end = scan::expression_end(object.text, start, true);
        let raw = object.text[start..end].trim();

        if raw.is_empty() {
            return None;
        }
        if IDENTIFIER.is_match(raw) {
            return Some(self.conditions.resolve(raw));
        }
        if raw.contains("=>") || raw.starts_with("function") || raw.starts_with("async") {
            return Some(raw.to_string());
        }
        self.logger.diagnostic(
            STAGE,
            &format!("unsupported condition expression `{}`", raw),
        );
        Some(unresolved_placeholder(raw))
    }
}

/// String literal, `null`, or any other expression kept as text
fn read_link(object: &ObjectText<'_>, re: &Regex) -> Option<RawValue> {
    let start = object.find(re)?.get(0)?.end();
    let end = scan::expression_end(object.text, start, true);
    let raw = scan::strip_comments(&object.text[start..end]);
    let raw = raw.trim();

    if raw.is_empty() {
        return None;
    }
    if let Some(value) = STRING_LITERAL
        .captures(raw)
        .and_then(|caps| string_capture(&caps, 1))
    {
        return Some(RawValue::Str(value));
    }
    Some(match raw {
        "null" => RawValue::Null,
        other => RawValue::Expr(scan::collapse_whitespace(other)),
    })
}

/// `meta: { ... }` or `payload: { ... }` sub-object at the step's own level
fn nested_meta<'t>(object: &ObjectText<'t>) -> Option<ObjectText<'t>> {
    let open = object.find(&NESTED_META)?.get(0)?.end() - 1;
    let close = scan::find_matching(object.text, open)?;
    Some(ObjectText::new(&object.text[open..=close]))
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
