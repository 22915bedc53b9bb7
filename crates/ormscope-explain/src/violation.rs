use crate::access::AccessType;
use serde::Serialize;
use thiserror::Error;

/// A plan row that fails a configured policy rule.
///
/// Violations are observations, not faults: they are reported alongside the
/// rows that were analyzed and never abort the operation being explained.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// An `Extra` annotation is black-listed.
    #[error("\"{extra}\" is in extra black list")]
    ExtraBlackListed { extra: String },
    /// No `Extra` annotation is white-listed.
    #[error("\"{extra}\" is not in extra white list")]
    ExtraNotWhiteListed { extra: String },
    /// The `select_type` is black-listed.
    #[error("\"{select_type}\" is in select type black list")]
    SelectTypeBlackListed { select_type: String },
    /// The `select_type` is not white-listed.
    #[error("\"{select_type}\" is not in select type white list")]
    SelectTypeNotWhiteListed { select_type: String },
    /// An access floor is configured and the row's access type is not a
    /// recognized token.
    #[error("\"{access_type}\" is not valid type from row result")]
    UnrecognizedAccessType { access_type: String },
    /// The row's access type is recognized but ranks below the floor.
    /// Only reported under [`crate::FloorMode::Enforce`].
    #[error("{access_type} is worse than required type {floor}")]
    AccessTypeBelowFloor {
        access_type: AccessType,
        floor: AccessType,
    },
}

impl Violation {
    /// Short stable identifier of the rule that failed.
    pub fn rule(&self) -> &'static str {
        match self {
            Violation::ExtraBlackListed { .. } => "extra_black_list",
            Violation::ExtraNotWhiteListed { .. } => "extra_white_list",
            Violation::SelectTypeBlackListed { .. } => "select_type_black_list",
            Violation::SelectTypeNotWhiteListed { .. } => "select_type_white_list",
            Violation::UnrecognizedAccessType { .. } | Violation::AccessTypeBelowFloor { .. } => {
                "access_type_floor"
            }
        }
    }
}
