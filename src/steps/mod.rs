//! Step data model
//!
//! [`StepRecord`] is the validated, caller-facing shape. [`StepCandidate`] is the
//! loosely-typed intermediate both extraction strategies produce before the
//! [`Validator`](crate::validation::Validator) normalizes it.

pub mod candidate;
pub mod record;

pub use candidate::{RawValue, StepCandidate};
pub use record::{StepLink, StepMeta, StepRecord, StepType};
