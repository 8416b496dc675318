//! Test harness for scripted modelling sessions.
//!
//! Provides programmatic tools for building named shapes step by step,
//! verifying correctness at every step, and generating diagnostic output.
//!
//! # Key Components
//!
//! - [`ModelBuilder`]: fluent API for building and verifying shapes by name
//! - [`oracle`]: verification functions returning pass/fail verdicts
//! - [`report`]: structured text model descriptions
//! - [`helpers`]: profile builders and mesh math
//! - [`assertions`]: rich assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use report::ModelReport;
pub use workflow::ModelBuilder;
