// Step extraction from loosely structured source text
//
// Two strategies share the condition table and the validator: a structural
// scan that never parses, and a grammar fallback over preprocessed text.
// The orchestrator decides which run and guarantees a result.

pub mod conditions;
pub mod grammar;
pub mod orchestrator;
pub mod preprocess;
pub mod structural;

pub use conditions::{unresolved_placeholder, ConditionTable};
pub use grammar::GrammarExtractor;
pub use orchestrator::{parse_steps, StepExtractor, StrategyComparison};
pub use preprocess::preprocess;
pub use structural::StructuralExtractor;
