//! Source preprocessing for the grammar fallback
//!
//! A heuristic normalization pass, not a type-aware transform: it rewrites
//! typed, module-wrapped source into the plain-expression subset the parser
//! accepts. It can over-strip and under-strip. Every pass only acts on
//! matches that start in code (outside literals and comments).

use super::conditions::strip_param_types;
use crate::scan;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

type Edit = (Range<usize>, String);

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).expect("valid regex"));
    };
}

pattern!(IMPORT, r"(?m)^[ \t]*import\b");
pattern!(EXPORT_DEFAULT_LITERAL, r"\bexport\s+default\s+([{\[])");
pattern!(EXPORT_LIST, r"\bexport\s+(?:type\s+)?(?:\*|\{)");
pattern!(EXPORT_DEFAULT, r"\bexport\s+default\s+");
pattern!(EXPORT, r"\bexport\s+");
pattern!(
    VARIABLE_ANNOTATION,
    r"(\b(?:const|let|var)\s+[A-Za-z_$][\w$]*)\s*:\s*(?:[^=;]|=>)+?\s*=([^>=])"
);
pattern!(
    INTERFACE_OR_ENUM,
    r"(?m)^[ \t]*(?:declare\s+)?(?:interface\s+[A-Za-z_$][\w$]*[^{;]*|(?:const\s+)?enum\s+[A-Za-z_$][\w$]*\s*)\{"
);
pattern!(
    TYPE_ALIAS,
    r"(?m)^[ \t]*(?:declare\s+)?type\s+[A-Za-z_$][\w$]*\s*(?:<[^=]*>)?\s*="
);
pattern!(AS_CONST, r"\s+as\s+const\b");
pattern!(
    ASSERTION,
    r"\s+(?:as|satisfies)\s+[A-Za-z_$][\w$.]*(?:<[^<>;]*>)?(?:\[\])*"
);
pattern!(
    ARROW_SIGNATURE,
    r"\(([^()]*)\)(?:\s*:\s*[^=;{}()]+?)?\s*=>"
);
pattern!(
    NAMESPACE,
    r"(?m)^[ \t]*(?:declare\s+)?(?:namespace|module)\s+[A-Za-z_$][\w$.]*\s*\{"
);
pattern!(DECLARE, r"(?m)^[ \t]*declare\s+");

/// Run every normalization pass in order
pub fn preprocess(source: &str) -> String {
    let text = drop_imports(source);
    let text = rewrite_exports(&text);
    let text = scan::strip_comments(&text);
    let text = strip_variable_annotations(&text);
    let text = drop_type_declarations(&text);
    let text = drop_assertions(&text);
    let text = strip_arrow_signatures(&text);
    let text = unwrap_namespaces(&text);
    drop_declarations(&text)
}

/// Apply non-overlapping edits; later edits overlapping an earlier one are skipped
fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for (range, replacement) in edits {
        if range.start < copied {
            continue;
        }
        out.push_str(&text[copied..range.start]);
        out.push_str(&replacement);
        copied = range.end;
    }
    out.push_str(&text[copied..]);
    out
}

/// Collect edits for every match of `re` that starts in code
fn edit_matches(
    text: &str,
    re: &Regex,
    mut edit: impl FnMut(&Captures<'_>, &mut Vec<Edit>),
) -> String {
    let spans = scan::opaque_spans(text);
    let mut edits = Vec::new();
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let keyword_at = whole.start() + (whole.as_str().len() - whole.as_str().trim_start().len());
        if scan::in_spans(&spans, keyword_at) {
            continue;
        }
        edit(&caps, &mut edits);
    }
    apply_edits(text, edits)
}

fn replace_matches(text: &str, re: &Regex, replacement: impl Fn(&Captures<'_>) -> String) -> String {
    edit_matches(text, re, |caps, edits| {
        if let Some(whole) = caps.get(0) {
            edits.push((whole.range(), replacement(caps)));
        }
    })
}

/// End of the statement starting at `from`, including a trailing `;`
///
/// `from` is the statement's first byte so that its own delimiters balance.
fn statement_end(text: &str, from: usize) -> usize {
    let end = scan::expression_end(text, from, false);
    if text[end..].starts_with(';') {
        end + 1
    } else {
        end
    }
}

fn remove_statements(text: &str, re: &Regex) -> String {
    edit_matches(text, re, |caps, edits| {
        if let Some(whole) = caps.get(0) {
            edits.push((whole.start()..statement_end(text, whole.start()), String::new()));
        }
    })
}

fn drop_imports(text: &str) -> String {
    edit_matches(text, &IMPORT, |caps, edits| {
        let Some(whole) = caps.get(0) else {
            return;
        };
        // `import(...)` and `import.meta` are expressions
        if matches!(
            scan::next_significant(text.as_bytes(), whole.end()),
            Some(b'(') | Some(b'.')
        ) {
            return;
        }
        edits.push((whole.start()..statement_end(text, whole.start()), String::new()));
    })
}

fn rewrite_exports(text: &str) -> String {
    let text = replace_matches(text, &EXPORT_DEFAULT_LITERAL, |caps| {
        format!("const defaultExport = {}", &caps[1])
    });
    let text = remove_statements(&text, &EXPORT_LIST);
    let text = replace_matches(&text, &EXPORT_DEFAULT, |_| String::new());
    replace_matches(&text, &EXPORT, |_| String::new())
}

fn strip_variable_annotations(text: &str) -> String {
    replace_matches(text, &VARIABLE_ANNOTATION, |caps| format!("{} ={}", &caps[1], &caps[2]))
}

fn drop_type_declarations(text: &str) -> String {
    let text = edit_matches(text, &INTERFACE_OR_ENUM, |caps, edits| {
        let Some(whole) = caps.get(0) else {
            return;
        };
        let open = whole.end() - 1;
        if let Some(close) = scan::find_matching(text, open) {
            edits.push((whole.start()..close + 1, String::new()));
        }
    });
    remove_statements(&text, &TYPE_ALIAS)
}

fn drop_assertions(text: &str) -> String {
    let text = replace_matches(text, &AS_CONST, |_| String::new());
    replace_matches(&text, &ASSERTION, |_| String::new())
}

/// Separate from the variable pass so the `=>` token survives
fn strip_arrow_signatures(text: &str) -> String {
    replace_matches(text, &ARROW_SIGNATURE, |caps| {
        format!("({}) =>", strip_param_types(&caps[1]))
    })
}

fn unwrap_namespaces(text: &str) -> String {
    edit_matches(text, &NAMESPACE, |caps, edits| {
        let Some(whole) = caps.get(0) else {
            return;
        };
        let open = whole.end() - 1;
        if let Some(close) = scan::find_matching(text, open) {
            edits.push((whole.range(), String::new()));
            edits.push((close..close + 1, String::new()));
        }
    })
}

fn drop_declarations(text: &str) -> String {
    remove_statements(text, &DECLARE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn squash(text: &str) -> String {
        scan::collapse_whitespace(text)
    }

    #[parameterized(
        named_import = { "import { a, b } from './x';\nconst s = [];", "const s = [];" },
        multiline_import = { "import {\n  a,\n  b,\n} from './x'\nconst s = [];", "const s = [];" },
        side_effect_import = { "import './polyfill';\nconst s = [];", "const s = [];" },
        type_import = { "import type { Step } from './types';\nconst s = [];", "const s = [];" },
        dynamic_import_kept = { "const m = import('./x');", "const m = import('./x');" },
    )]
    fn test_drop_imports(input: &str, expected: &str) {
        assert_eq!(squash(&preprocess(input)), expected);
    }

    #[parameterized(
        export_const = { "export const steps = [];", "const steps = [];" },
        export_default_array = { "export default [{ id: 'a' }];", "const defaultExport = [{ id: 'a' }];" },
        export_default_object = { "export default { steps: [] };", "const defaultExport = { steps: [] };" },
        export_default_ident = { "const s = [];\nexport default s;", "const s = []; s;" },
        export_list = { "const s = [];\nexport { s, t as u };", "const s = [];" },
        export_star = { "export * from './more';\nconst s = [];", "const s = [];" },
    )]
    fn test_rewrite_exports(input: &str, expected: &str) {
        assert_eq!(squash(&preprocess(input)), expected);
    }

    #[parameterized(
        array_suffix = { "const steps: Step[] = [];", "const steps = [];" },
        generic = { "let steps: Array<Step> = [];", "let steps = [];" },
        function_type = { "const f: (a: A) => B = g;", "const f = g;" },
        untyped = { "const x = a ? b : c;", "const x = a ? b : c;" },
    )]
    fn test_strip_variable_annotations(input: &str, expected: &str) {
        assert_eq!(squash(&preprocess(input)), expected);
    }

    #[test]
    fn test_drops_interfaces_enums_and_type_aliases() {
        let input = r#"
interface Step {
  id: string;
  meta?: { title: string };
}
export enum Kind { A = 'A', B = 'B' }
type Flow = {
  steps: Step[];
};
type Id = string | number;
const steps = [];
"#;
        assert_eq!(squash(&preprocess(input)), "const steps = [];");
    }

    #[test]
    fn test_drops_assertions() {
        let input = "const steps = [{ id: 'a' } as Step, { id: 'b' }] as const satisfies Steps;";
        assert_eq!(
            squash(&preprocess(input)),
            "const steps = [{ id: 'a' }, { id: 'b' }];"
        );
    }

    #[test]
    fn test_strips_arrow_signature_types() {
        let input = "const s = [{ id: 'a', condition: (ctx: Ctx, n?: number): boolean => ctx.ok }];";
        assert_eq!(
            squash(&preprocess(input)),
            "const s = [{ id: 'a', condition: (ctx, n) => ctx.ok }];"
        );
    }

    #[test]
    fn test_unwraps_namespaces_and_drops_declare() {
        let input = r#"
declare const API: string;
declare module 'x' {
  export const y: number;
}
namespace Flow {
  const steps = [];
}
"#;
        assert_eq!(squash(&preprocess(input)), "const steps = [];");
    }

    #[test]
    fn test_keywords_inside_strings_survive() {
        let input = "const s = [{ id: 'a', title: 'import this as text' }];";
        assert_eq!(preprocess(input), input);
    }

    #[test]
    fn test_comments_are_removed() {
        let input = "// header\nconst s = [ /* inline */ { id: 'a' } ];";
        assert_eq!(squash(&preprocess(input)), "const s = [ { id: 'a' } ];");
    }
}
