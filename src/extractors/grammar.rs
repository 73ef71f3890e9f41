//! Grammar-based extraction (fallback strategy)
//!
//! Parses preprocessed text, trying the module dialect, then the script
//! dialect, then a single isolated array literal. The tree is walked with a
//! [`Visitor`]; step arrays are recognized by three rules in order of
//! specificity:
//!
//! 1. the tree is the last-resort array fragment itself;
//! 2. a variable declaration whose name contains "step" initialized with an array;
//! 3. any array where at least half of the object elements carry an `id`.
//!
//! An array picked by a rule is not descended into, so option lists nested
//! inside steps are never reported as steps.

use super::conditions::{unresolved_placeholder, ConditionTable};
use crate::diagnostics::ExtractionLogger;
use crate::error::{ExtractError, Result};
use crate::scan;
use crate::steps::{RawValue, StepCandidate, StepRecord, StepType};
use crate::syntax::ast::{Declarator, Expr, MemberProp, Property};
use crate::syntax::visit::{walk_declarator, walk_expr, walk_program, Visitor};
use crate::syntax::{
    parse_array_fragment, parse_program, render_callable, render_expr, Dialect, Program,
};
use crate::validation::Validator;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;

const STAGE: &str = "grammar";

static ARRAY_ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*[:=]\s*\[").expect("valid regex"));

/// Text of array literals assigned with `name = [` or `name: [`, names
/// containing "step" first, otherwise in source order
pub fn array_fragments(source: &str) -> Vec<&str> {
    let spans = scan::opaque_spans(source);
    let mut found: Vec<(bool, &str)> = ARRAY_ASSIGNMENT
        .captures_iter(source)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            let whole = caps.get(0)?;
            if scan::in_spans(&spans, name.start()) {
                return None;
            }
            let open = whole.end() - 1;
            let close = scan::find_matching(source, open)?;
            let is_step = name.as_str().to_lowercase().contains("step");
            Some((is_step, &source[open..=close]))
        })
        .collect();
    found.sort_by_key(|(is_step, _)| !is_step);
    found.into_iter().map(|(_, text)| text).collect()
}

pub struct GrammarExtractor<'a> {
    conditions: &'a ConditionTable,
    logger: &'a dyn ExtractionLogger,
    max_depth: usize,
}

impl<'a> GrammarExtractor<'a> {
    pub fn new(
        conditions: &'a ConditionTable,
        logger: &'a dyn ExtractionLogger,
        max_depth: usize,
    ) -> Self {
        Self {
            conditions,
            logger,
            max_depth,
        }
    }

    /// Validated records; every failure degrades to an empty list
    pub fn extract(&self, source: &str, validator: &Validator) -> Vec<StepRecord> {
        match self.candidates(source) {
            Ok(candidates) => validator.validate_all(candidates, self.logger),
            Err(e) => {
                self.logger.diagnostic(STAGE, &e.to_string());
                Vec::new()
            }
        }
    }

    pub fn candidates(&self, source: &str) -> Result<Vec<StepCandidate>> {
        let program = self.parse(source)?;
        Ok(self.collect(&program))
    }

    /// Module, then script, then the isolated array fragment
    pub fn parse(&self, source: &str) -> Result<Program> {
        let module_error = match parse_program(source, Dialect::Module, self.max_depth) {
            Ok(program) => return Ok(program),
            Err(e) => e,
        };
        self.logger
            .diagnostic(STAGE, &format!("module parse failed: {}", module_error));

        match parse_program(source, Dialect::Script, self.max_depth) {
            Ok(program) => return Ok(program),
            Err(e) => self
                .logger
                .diagnostic(STAGE, &format!("script parse failed: {}", e)),
        }

        let mut last_error = ExtractError::NoArrayFragment;
        for fragment in array_fragments(source) {
            match parse_array_fragment(fragment, self.max_depth) {
                Ok(program) => return Ok(program),
                Err(e) => last_error = e,
            }
        }
        if last_error != ExtractError::NoArrayFragment {
            self.logger
                .diagnostic(STAGE, &format!("fragment parse failed: {}", last_error));
        }
        Err(last_error)
    }

    /// Candidates from every step array in the tree, in traversal order
    pub fn collect(&self, program: &Program) -> Vec<StepCandidate> {
        let mut bindings = BindingCollector::default();
        walk_program(&mut bindings, program);

        let mut collector = StepArrayCollector {
            extractor: self,
            bindings: bindings.objects,
            candidates: Vec::new(),
        };

        match program.fragment_array() {
            Some(elements) => collector.take_elements(elements),
            None => walk_program(&mut collector, program),
        }
        collector.candidates
    }

    fn candidate_from_object(&self, props: &[Property]) -> StepCandidate {
        let mut candidate = StepCandidate::default();
        let mut nested_title = None;
        let mut nested_description = None;

        for prop in props {
            match prop {
                Property::KeyValue { key, value } => {
                    let Some(name) = key.name() else {
                        continue;
                    };
                    if matches!(name, "meta" | "payload") {
                        if let Expr::Object(inner) = value.unparen() {
                            nested_title = nested_title.or_else(|| string_prop(inner, "title"));
                            nested_description =
                                nested_description.or_else(|| string_prop(inner, "description"));
                        }
                        continue;
                    }
                    self.apply_field(&mut candidate, name, value);
                }
                Property::Shorthand(name) => {
                    self.apply_field(&mut candidate, name, &Expr::Ident(name.clone()));
                }
                Property::Method { key, func } if key.name() == Some("condition") => {
                    candidate.condition = render_callable(&Expr::Function(Box::new(func.clone())));
                }
                Property::Method { .. } | Property::Spread(_) => {}
            }
        }

        candidate.title = candidate.title.or(nested_title);
        candidate.description = candidate.description.or(nested_description);
        candidate
    }

    fn apply_field(&self, candidate: &mut StepCandidate, name: &str, value: &Expr) {
        match name {
            "id" => candidate.id = Some(raw_value(value)),
            "type" => candidate.step_type = Some(type_value(value)),
            "nextStep" => candidate.next_step = Some(raw_value(value)),
            "previousStep" => candidate.previous_step = Some(raw_value(value)),
            "skipToStep" => candidate.skip_to_step = Some(raw_value(value)),
            "isSkippable" => {
                if let Expr::Bool(b) = value.unparen() {
                    candidate.is_skippable = Some(*b);
                }
            }
            "condition" => candidate.condition = Some(self.condition_text(value)),
            "title" => candidate.title = string_value(value),
            "description" => candidate.description = string_value(value),
            _ => {}
        }
    }

    fn condition_text(&self, value: &Expr) -> String {
        let value = value.unparen();
        if let Expr::Ident(name) = value {
            return self.conditions.resolve(name);
        }
        if let Some(text) = render_callable(value) {
            return text;
        }
        if let Some(text) = string_value(value) {
            return text;
        }
        let rendered = render_expr(value);
        self.logger.diagnostic(
            STAGE,
            &format!("unsupported condition expression `{}`", rendered),
        );
        unresolved_placeholder(&rendered)
    }
}

fn raw_value(expr: &Expr) -> RawValue {
    match expr.unparen() {
        Expr::Str(lit) => RawValue::Str(lit.value.clone()),
        Expr::Template {
            cooked: Some(text), ..
        } => RawValue::Str(text.clone()),
        Expr::Null => RawValue::Null,
        Expr::Bool(b) => RawValue::Bool(*b),
        Expr::Num(n) => RawValue::Number(n.clone()),
        other => RawValue::Expr(render_expr(other)),
    }
}

/// String literal, or an enum member whose last property names a step kind
fn type_value(expr: &Expr) -> RawValue {
    match expr.unparen() {
        Expr::Member {
            property: MemberProp::Ident(name),
            ..
        } if StepType::from_str(name).is_ok() => RawValue::Str(name.clone()),
        other => raw_value(other),
    }
}

fn string_value(expr: &Expr) -> Option<String> {
    match raw_value(expr) {
        RawValue::Str(s) => Some(s),
        _ => None,
    }
}

fn string_prop(props: &[Property], name: &str) -> Option<String> {
    props.iter().find_map(|prop| match prop {
        Property::KeyValue { key, value } if key.name() == Some(name) => string_value(value),
        _ => None,
    })
}

fn object_has_id(props: &[Property]) -> bool {
    props.iter().any(|prop| match prop {
        Property::KeyValue { key, .. } => key.name() == Some("id"),
        Property::Shorthand(name) => name == "id",
        _ => false,
    })
}

/// Object literals bound to plain identifiers anywhere in the tree
#[derive(Default)]
struct BindingCollector<'ast> {
    objects: HashMap<&'ast str, &'ast [Property]>,
}

impl<'ast> Visitor<'ast> for BindingCollector<'ast> {
    fn visit_declarator(&mut self, declarator: &'ast Declarator) {
        if let (Some(name), Some(Expr::Object(props))) = (
            declarator.target.ident(),
            declarator.init.as_ref().map(Expr::unparen),
        ) {
            self.objects.entry(name).or_insert(props.as_slice());
        }
        walk_declarator(self, declarator);
    }
}

struct StepArrayCollector<'e, 'a, 'ast> {
    extractor: &'e GrammarExtractor<'a>,
    bindings: HashMap<&'ast str, &'ast [Property]>,
    candidates: Vec<StepCandidate>,
}

impl<'e, 'a, 'ast> StepArrayCollector<'e, 'a, 'ast> {
    fn object_of(&self, element: &'ast Expr) -> Option<&'ast [Property]> {
        match element.unparen() {
            Expr::Object(props) => Some(props),
            Expr::Ident(name) => self.bindings.get(name.as_str()).copied(),
            _ => None,
        }
    }

    /// At least half of the object elements carry an `id`
    fn looks_like_steps(&self, elements: &'ast [Option<Expr>]) -> bool {
        let objects: Vec<_> = elements
            .iter()
            .flatten()
            .filter_map(|element| self.object_of(element))
            .collect();
        let with_id = objects.iter().filter(|props| object_has_id(props)).count();
        !objects.is_empty() && with_id * 2 >= objects.len()
    }

    fn take_elements(&mut self, elements: &'ast [Option<Expr>]) {
        for element in elements.iter().flatten() {
            match self.object_of(element) {
                Some(props) => {
                    let candidate = self.extractor.candidate_from_object(props);
                    self.candidates.push(candidate);
                }
                None => self.extractor.logger.diagnostic(
                    STAGE,
                    &format!("skipped non-object step element `{}`", render_expr(element)),
                ),
            }
        }
    }
}

impl<'e, 'a, 'ast> Visitor<'ast> for StepArrayCollector<'e, 'a, 'ast> {
    fn visit_declarator(&mut self, declarator: &'ast Declarator) {
        let named_steps = declarator
            .target
            .ident()
            .map_or(false, |name| name.to_lowercase().contains("step"));
        if named_steps {
            if let Some(Expr::Array(elements)) = declarator.init.as_ref().map(Expr::unparen) {
                self.take_elements(elements);
                return;
            }
        }
        walk_declarator(self, declarator);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Array(elements) = expr {
            if self.looks_like_steps(elements) {
                self.take_elements(elements);
                return;
            }
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoopLogger;
    use crate::syntax::DEFAULT_MAX_DEPTH;

    fn candidates(source: &str) -> Vec<StepCandidate> {
        let table = ConditionTable::from_source(source);
        GrammarExtractor::new(&table, &NoopLogger, DEFAULT_MAX_DEPTH)
            .candidates(source)
            .unwrap()
    }

    fn ids(found: &[StepCandidate]) -> Vec<String> {
        found.iter().map(StepCandidate::label).collect()
    }

    #[test]
    fn test_named_step_array() {
        let found = candidates("const onboardingSteps = [{ id: 'a' }, { name: 'no id' }];");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, Some(RawValue::Str("a".into())));
        assert_eq!(found[1].id, None);
    }

    #[test]
    fn test_id_heavy_array_anywhere() {
        let found = candidates(
            "const flow = { name: 'x', pages: [{ id: 'p1' }, { id: 'p2' }, { other: 1 }] };",
        );
        assert_eq!(ids(&found), vec!["\"p1\"", "\"p2\"", "<no id>"]);
    }

    #[test]
    fn test_arrays_without_enough_ids_are_ignored() {
        let found = candidates("const data = [{ a: 1 }, { b: 2 }, { id: 'x' }];");
        assert!(found.is_empty());
    }

    #[test]
    fn test_nested_option_arrays_are_not_descended_into() {
        let found = candidates(
            "const steps = [{ id: 'q', options: [{ id: 'o1' }, { id: 'o2' }] }];",
        );
        assert_eq!(ids(&found), vec!["\"q\""]);
    }

    #[test]
    fn test_identifier_elements_resolve_to_bindings() {
        let found = candidates(
            "const welcome = { id: 'welcome', nextStep: 'done' };\nconst done = { id: 'done' };\nconst steps = [welcome, done];",
        );
        assert_eq!(ids(&found), vec!["\"welcome\"", "\"done\""]);
        assert_eq!(found[0].next_step, Some(RawValue::Str("done".into())));
    }

    #[test]
    fn test_field_kinds() {
        let found = candidates(
            r#"
            const isDev = (ctx) => ctx.env === 'dev';
            const steps = [
                {
                    id: 'a',
                    type: StepType.INFORMATION,
                    nextStep: getNext(),
                    previousStep: null,
                    isSkippable: false,
                    condition: isDev,
                    meta: { title: 'Hello', description: `World` },
                },
                { id: 'b', type: 'NOPE', condition: (ctx) => { return ctx.ok } },
                { id: 'c', condition: (ctx) => ctx.user.role === 'admin' && ctx.ready },
                { id: 'd', condition: ctx => ctx.flags.beta },
                { id: 'e', condition: unknownCheck },
            ];
            "#,
        );
        assert_eq!(found.len(), 5);
        let a = &found[0];
        assert_eq!(a.step_type, Some(RawValue::Str("INFORMATION".into())));
        assert_eq!(a.next_step, Some(RawValue::Expr("getNext()".into())));
        assert_eq!(a.previous_step, Some(RawValue::Null));
        assert_eq!(a.is_skippable, Some(false));
        assert_eq!(a.condition.as_deref(), Some("(ctx) => ctx.env === 'dev'"));
        assert_eq!(a.title.as_deref(), Some("Hello"));
        assert_eq!(a.description.as_deref(), Some("World"));

        assert_eq!(found[1].step_type, Some(RawValue::Str("NOPE".into())));
        assert_eq!(found[1].condition.as_deref(), Some("(ctx) => { /* ... */ }"));
        assert_eq!(
            found[2].condition.as_deref(),
            Some("(ctx) => ctx.user.role === 'admin' && ctx.ready")
        );
        assert_eq!(found[3].condition.as_deref(), Some("(ctx) => ctx.flags.beta"));
        assert_eq!(
            found[4].condition.as_deref(),
            Some("/* unresolved condition: unknownCheck */")
        );
    }

    #[test]
    fn test_script_dialect_fallback() {
        // `interface` as a binding name is only legal in scripts
        let found = candidates("var interface = 1;\nvar steps = [{ id: 'a' }];");
        assert_eq!(ids(&found), vec!["\"a\""]);
    }

    #[test]
    fn test_fragment_fallback_prefers_step_names() {
        let source = "garbage here ### options = [{ id: 'o' }]; flowSteps = [{ id: 's' }] ###";
        let found = candidates(source);
        assert_eq!(ids(&found), vec!["\"s\""]);
    }

    #[test]
    fn test_unparseable_input_is_an_error() {
        let table = ConditionTable::new();
        let extractor = GrammarExtractor::new(&table, &NoopLogger, DEFAULT_MAX_DEPTH);
        assert_eq!(
            extractor.candidates("### nothing here"),
            Err(ExtractError::NoArrayFragment)
        );
        assert!(extractor.extract("### nothing here", &Validator::default()).is_empty());
    }

    #[test]
    fn test_array_fragments_ordering() {
        let source = "a = [1]; b: [2]; mySteps = [3]; 'c = [4]'";
        assert_eq!(array_fragments(source), vec!["[3]", "[1]", "[2]"]);
    }
}
