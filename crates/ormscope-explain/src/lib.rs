//! ormscope-explain
//!
//! Execution-plan row model and policy rules.
//!
//! This crate consumes already-produced EXPLAIN output: it converts tabular
//! rows into [`PlanRow`]s and checks each row against a [`PolicyRules`]
//! (extra / select-type white and black lists plus an access-type floor).
//! It never runs queries itself.
//!
//! # Example
//!
//! ```
//! use ormscope_explain::{Explainer, PlanRow, PolicyRules, SelectType};
//!
//! let explainer = Explainer::new(
//!     PolicyRules::new().with_select_type_white_list([SelectType::Simple]),
//! );
//!
//! let analysis = explainer.analyze(vec![
//!     PlanRow::new(1).with_select_type("SIMPLE"),
//!     PlanRow::new(2).with_select_type("SUBQUERY"),
//! ]);
//!
//! let violation = analysis.violation.unwrap();
//! assert_eq!(
//!     violation.to_string(),
//!     "\"SUBQUERY\" is not in select type white list"
//! );
//! ```

pub mod access;
pub mod error;
pub mod explainer;
pub mod plan;
pub mod rules;
pub mod violation;

pub use access::{AccessFloor, AccessType, FloorMode};
pub use error::{ExplainError, ExplainResult};
pub use explainer::{Analysis, Explainer, PolicyRules};
pub use plan::{PLAN_COLUMNS, PlanRow, PlanTable};
pub use rules::{Extra, ExtraList, Rule, SelectType, SelectTypeList};
pub use violation::Violation;
