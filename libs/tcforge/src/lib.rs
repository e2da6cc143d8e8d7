//! Test case generation, constraint verification and grading for contest
//! problems.
//!
//! A problem binary declares its input format ([`IoFormat`]), constraints
//! ([`ConstraintSuite`]) and test cases ([`TestSuite`]), bundles them into
//! a [`Problem`] and hands it to the [`Runner`].

pub mod config;
pub mod constraint;
pub mod error;
pub mod generator;
pub mod grader;
pub mod io;
pub mod os;
pub mod problem;
pub mod runner;
pub mod verifier;

#[cfg(test)]
mod testing;

pub use config::ProblemMetadata;
pub use constraint::{CombinedCases, ConstraintSuite};
pub use error::DeclarationError;
pub use generator::{GenerationResult, TestSuiteGenerator};
pub use grader::{Grader, GradingPlan, GradingReport};
pub use io::IoFormat;
pub use problem::{Problem, Random, TestSuite};
pub use runner::Runner;
pub use tcforge_common::types::{GeneratorConfig, GradingConfig, SubtaskId, Verdict};
pub use verifier::Verifier;
