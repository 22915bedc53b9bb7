//! Access-type severity scale.

use crate::error::{ExplainError, ExplainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access type reported in the `type` column of a plan row.
///
/// Variants are declared from worst to best, so the derived `Ord` is the
/// severity scale: a full scan (`All`) is the lowest recognized level and
/// `System` the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccessType {
    /// Full table scan.
    All,
    /// Full index scan.
    Index,
    /// Index range scan.
    Range,
    /// Non-unique index lookup.
    Ref,
    /// Unique index lookup per joined row.
    EqRef,
    /// At most one matching row, read once.
    Const,
    /// Table with a single row.
    System,
}

impl AccessType {
    /// Every recognized token, in ascending severity.
    pub const ALL: [AccessType; 7] = [
        AccessType::All,
        AccessType::Index,
        AccessType::Range,
        AccessType::Ref,
        AccessType::EqRef,
        AccessType::Const,
        AccessType::System,
    ];

    /// The token as printed in plan output (lower case).
    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::All => "all",
            AccessType::Index => "index",
            AccessType::Range => "range",
            AccessType::Ref => "ref",
            AccessType::EqRef => "eq_ref",
            AccessType::Const => "const",
            AccessType::System => "system",
        }
    }

    /// Position on the severity scale. `0` is reserved for "none".
    pub fn severity(self) -> u8 {
        match self {
            AccessType::All => 1,
            AccessType::Index => 2,
            AccessType::Range => 3,
            AccessType::Ref => 4,
            AccessType::EqRef => 5,
            AccessType::Const => 6,
            AccessType::System => 7,
        }
    }

    /// Recognize a plan token exactly as spelled by [`AccessType::as_str`].
    ///
    /// `ALL`, as MySQL prints full scans, is not recognized here.
    pub fn parse_exact(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == token)
    }

    /// Recognize a plan token, ignoring surrounding whitespace and ASCII
    /// case.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = ExplainError;

    fn from_str(s: &str) -> ExplainResult<Self> {
        Self::parse(s).ok_or_else(|| ExplainError::InvalidAccessType(s.to_string()))
    }
}

impl TryFrom<String> for AccessType {
    type Error = ExplainError;

    fn try_from(value: String) -> ExplainResult<Self> {
        value.parse()
    }
}

impl From<AccessType> for String {
    fn from(value: AccessType) -> Self {
        value.as_str().to_string()
    }
}

/// Minimum access type a plan row must reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessFloor {
    /// No floor configured (the "none" level).
    #[default]
    Unrestricted,
    /// Rows must report a recognized access type, at least this one.
    AtLeast(AccessType),
}

impl AccessFloor {
    /// Parse a configured floor. An empty token or `none` means unrestricted;
    /// anything else must be a recognized access type.
    pub fn from_token(token: &str) -> ExplainResult<Self> {
        let trimmed = token.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(AccessFloor::Unrestricted);
        }
        trimmed.parse().map(AccessFloor::AtLeast)
    }

    /// The configured level, if any.
    pub fn level(&self) -> Option<AccessType> {
        match self {
            AccessFloor::Unrestricted => None,
            AccessFloor::AtLeast(t) => Some(*t),
        }
    }
}

/// How an [`AccessFloor`] is applied to observed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorMode {
    /// Only require the observed token to be one of the lower-case tokens,
    /// matched exactly. The floor level itself is never compared against
    /// the observed level, and an upper-case `ALL` is unrecognized.
    #[default]
    ValidateOnly,
    /// Match the observed token ignoring case, then require its level to be
    /// at least the floor.
    Enforce,
}
