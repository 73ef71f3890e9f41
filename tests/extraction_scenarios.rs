//! Extraction scenarios against the public API
//!
//! These tests cover the observable contract of [`StepExtractor`]:
//! - Source-order records with unique ids
//! - Tolerance of module syntax, type annotations and comments
//! - Condition resolution and placeholders
//! - Total degradation to an empty list

use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use stepextract::{
    parse_steps, ExtractionLogger, ExtractorConfig, PhaseReport, StepExtractor, StepLink,
    StepRecord, Strategy,
};
use yare::parameterized;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path).expect("Failed to read fixture")
}

fn to_json(records: &[StepRecord]) -> Value {
    serde_json::to_value(records).expect("Failed to serialize records")
}

fn forced(strategy: Strategy) -> StepExtractor {
    StepExtractor::new(ExtractorConfig::builtin().with_strategy(strategy))
}

#[derive(Default)]
struct PhaseRecorder(Mutex<Vec<String>>);

impl ExtractionLogger for PhaseRecorder {
    fn diagnostic(&self, _stage: &str, _message: &str) {}

    fn phase(&self, report: &PhaseReport) {
        if let Ok(mut phases) = self.0.lock() {
            phases.push(report.phase.clone());
        }
    }
}

const SCENARIO_A: &str =
    r#"const steps=[{id:"s1",type:"INFORMATION",title:"Welcome"},{id:"s2",nextStep:null}];"#;

fn scenario_a_expected() -> Value {
    json!([
        {"id": "s1", "type": "INFORMATION", "meta": {"title": "Welcome"}},
        {"id": "s2", "nextStep": null}
    ])
}

#[test]
fn test_scenario_a_literal_array() {
    assert_eq!(to_json(&parse_steps(SCENARIO_A)), scenario_a_expected());
}

#[test]
fn test_scenario_b_module_and_type_wrappers() {
    let source = format!(
        "import {{ Step }} from './types';\nimport type {{ FlowConfig }} from '../config';\n\nexport {}\n",
        SCENARIO_A.replace("const steps=", "const steps: Step[] = ")
    );

    let recorder = Arc::new(PhaseRecorder::default());
    let extractor = StepExtractor::default().with_logger(recorder.clone());
    assert_eq!(to_json(&extractor.extract(&source)), scenario_a_expected());
    assert_eq!(*recorder.0.lock().unwrap(), vec!["structural"]);

    assert_eq!(
        to_json(&forced(Strategy::Grammar).extract(&source)),
        scenario_a_expected()
    );
}

#[test]
fn test_scenario_c_programmatic_steps() {
    let source = fixture("programmatic.ts");
    let extractor = StepExtractor::default();
    let comparison = extractor.compare(&source);
    assert!(comparison.structural.is_empty());
    assert!(comparison.grammar.is_empty());
    assert!(extractor.extract(&source).is_empty());
}

#[test]
fn test_scenario_d_condition_reference() {
    let source = "const isDeveloper=(context)=>context.flowData.type==='dev';\n\
                  const steps = [{ id: 'dev-setup', condition: isDeveloper }];";
    for strategy in [Strategy::Auto, Strategy::Grammar] {
        let records = forced(strategy).extract(source);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].condition.as_deref(),
            Some("(context) => context.flowData.type === 'dev'")
        );
    }
}

#[test]
fn test_typed_onboarding_flow() {
    let source = fixture("onboarding.ts");
    let expected = json!([
        {
            "id": "welcome",
            "type": "INFORMATION",
            "nextStep": "role",
            "meta": {"title": "Welcome aboard", "description": "Let's get you set up"}
        },
        {
            "id": "role",
            "type": "SINGLE_CHOICE",
            "previousStep": "welcome",
            "nextStep": null,
            "meta": {"title": "What do you do?"}
        },
        {
            "id": "dev-tools",
            "type": "CHECKLIST",
            "previousStep": "role",
            "isSkippable": true,
            "condition": "(ctx) => ctx.flowData.role === 'developer'",
            "meta": {"title": "Pick your tools"}
        },
        {
            "id": "team",
            "type": "CONFIRMATION",
            "skipToStep": null,
            "condition": "(ctx) => ctx.flowData.teamSize > 1"
        },
        {
            "id": "done",
            "condition": "(ctx) => ctx.completed"
        }
    ]);

    assert_eq!(to_json(&parse_steps(&source)), expected);
    assert_eq!(to_json(&forced(Strategy::Grammar).extract(&source)), expected);
    assert!(!StepExtractor::default().compare(&source).diverges);
}

#[test]
fn test_flat_array_one_record_per_element() {
    let source = (1..=25)
        .map(|i| format!("{{ id: 'step-{}' }}", i))
        .collect::<Vec<_>>()
        .join(",\n");
    let records = parse_steps(&format!("export default [\n{}\n];", source));
    let ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
    let expected: Vec<_> = (1..=25).map(|i| format!("step-{}", i)).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_idempotence() {
    let source = fixture("onboarding.ts");
    assert_eq!(parse_steps(&source), parse_steps(&source));
}

#[test]
fn test_duplicate_ids_keep_first() {
    let records = parse_steps(
        "const steps = [{ id: 'a', title: 'first' }, { id: 'b' }, { id: 'a', title: 'second' }];",
    );
    let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(records[0].title(), Some("first"));
}

#[test]
fn test_null_normalization() {
    let records = parse_steps("const steps = [{ id: 'a', nextStep: null }, { id: 'b', nextStep: 'null' }];");
    assert_eq!(records[0].next_step, Some(StepLink::Null));
    assert_eq!(records[1].next_step, Some(StepLink::Null));
    assert_eq!(
        to_json(&records),
        json!([{"id": "a", "nextStep": null}, {"id": "b", "nextStep": null}])
    );
}

#[test]
fn test_nested_braces_do_not_leak() {
    let records = parse_steps(
        r#"const steps = [
            { id: "a", meta: { title: "X", nextStep: "wrong" } },
            { id: "b", title: "Y", nextStep: "a" }
        ];"#,
    );
    assert_eq!(
        to_json(&records),
        json!([
            {"id": "a", "meta": {"title": "X"}},
            {"id": "b", "nextStep": "a", "meta": {"title": "Y"}}
        ])
    );
}

#[test]
fn test_unresolved_condition_placeholder() {
    let records = parse_steps("const steps = [{ id: 'a', condition: featureFlags.beta }];");
    assert_eq!(
        records[0].condition.as_deref(),
        Some("/* unresolved condition: featureFlags.beta */")
    );
}

#[parameterized(
    empty = { "" },
    whitespace = { " \n\t " },
    stray_braces = { "}{ ][ not code" },
    broken_declaration = { "const = = ;" },
    unterminated_string = { "const steps = [{ id: 'a" },
    no_steps = { "export function render() { return null; }" },
    blank_ids = { "const steps = [{ id: '' }, { id: '   ' }];" },
)]
fn test_total_degradation(source: &str) {
    assert!(parse_steps(source).is_empty());
}

#[test]
fn test_non_string_input_degrades() {
    let extractor = StepExtractor::default();
    for value in [json!(null), json!(12), json!([{"id": "a"}]), json!({"id": "a"})] {
        assert!(extractor.extract_from_value(&value).is_empty());
    }
}

#[test]
fn test_deep_nesting_degrades() {
    let depth = 5_000;
    let source = format!(
        "const x = {}1{};",
        "[".repeat(depth),
        "]".repeat(depth)
    );
    assert!(forced(Strategy::Grammar).extract(&source).is_empty());
}

#[test]
fn test_deeply_nested_templates_degrade_gracefully() {
    let depth = 5_000;
    let source = format!(
        "const steps = [{{ id: 'a' }}]; const t = {}{};",
        "`${".repeat(depth),
        "}`".repeat(depth)
    );
    for strategy in [Strategy::Auto, Strategy::Grammar] {
        let records = forced(strategy).extract(&source);
        assert_eq!(to_json(&records), json!([{"id": "a"}]));
    }
}

#[test]
fn test_condition_declared_mid_line() {
    let source = "const n = 1; const isDev = (c) => c.dev;\nconst steps=[{id:'x',condition:isDev}];";
    for strategy in [Strategy::Auto, Strategy::Grammar] {
        let records = forced(strategy).extract(source);
        assert_eq!(records[0].condition.as_deref(), Some("(c) => c.dev"));
    }
}

#[test]
fn test_depth_limit_at_validated_maximum() {
    let mut config = ExtractorConfig::builtin().with_strategy(Strategy::Grammar);
    config.max_depth = stepextract::config::MAX_DEPTH_LIMIT;
    assert!(config.validate().is_ok());

    let depth = 5_000;
    let source = format!(
        "const x = {}1{};\nconst steps = [{{ id: 'a' }}];",
        "[".repeat(depth),
        "]".repeat(depth)
    );
    let ids: Vec<_> = StepExtractor::new(config)
        .extract(&source)
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["a"]);
}

#[test]
fn test_computed_navigation_agrees_across_strategies() {
    let source = "const steps = [{ id: 'a', nextStep: computeNext(), skipToStep: 3 }];";
    let expected = json!([{"id": "a", "nextStep": null, "skipToStep": null}]);
    assert_eq!(to_json(&forced(Strategy::Structural).extract(source)), expected);
    assert_eq!(to_json(&forced(Strategy::Grammar).extract(source)), expected);
}
