//! White-list / black-list rules over plan annotations.

use crate::violation::Violation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a known-value token enum with an `Other` escape hatch.
///
/// Known values compare case-insensitively on input; `as_str` always returns
/// the canonical spelling.
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Any value without a dedicated variant.
            Other(String),
        }

        impl $name {
            /// Canonical text of this value.
            pub fn as_str(&self) -> &str {
                match self {
                    $( $name::$variant => $text, )+
                    $name::Other(s) => s.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                let trimmed = value.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($text) {
                        return $name::$variant;
                    }
                )+
                $name::Other(trimmed.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name::from(value.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

token_enum! {
    /// Annotation found in the comma-separated `Extra` column.
    Extra {
        FileSort => "using filesort",
        Temporary => "using temporary",
        Index => "using index",
        Where => "using where",
        JoinBuffer => "using join buffer",
        ImpossibleWhere => "impossible where",
        OptimizedAway => "select tables optimized away",
        Distinct => "distinct",
    }
}

token_enum! {
    /// Value of the `select_type` column.
    SelectType {
        Simple => "SIMPLE",
        Primary => "PRIMARY",
        Subquery => "SUBQUERY",
        Derived => "DERIVED",
        Union => "UNION",
        UnionResult => "UNION RESULT",
    }
}

/// An optional list rule.
///
/// `Unrestricted` is the explicit "nothing configured" state: every value
/// passes, whether the rule is used as a white list or a black list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule<T> {
    /// No list configured.
    Unrestricted,
    /// A non-empty list of entries.
    Restricted(Vec<T>),
}

impl<T> Default for Rule<T> {
    fn default() -> Self {
        Rule::Unrestricted
    }
}

/// Rule over `Extra` annotations.
pub type ExtraList = Rule<Extra>;

/// Rule over `select_type` values.
pub type SelectTypeList = Rule<SelectType>;

impl<T: AsRef<str>> Rule<T> {
    /// Build a rule from entries. An empty list yields [`Rule::Unrestricted`].
    pub fn new<I, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<T>,
    {
        let entries: Vec<T> = entries.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            Rule::Unrestricted
        } else {
            Rule::Restricted(entries)
        }
    }

    /// Whether a list is configured.
    pub fn is_restricted(&self) -> bool {
        matches!(self, Rule::Restricted(_))
    }

    /// Configured entries (empty when unrestricted).
    pub fn entries(&self) -> &[T] {
        match self {
            Rule::Unrestricted => &[],
            Rule::Restricted(entries) => entries,
        }
    }

    /// Whether any token equals any entry, ignoring case.
    fn any_match<'a>(&self, mut tokens: impl Iterator<Item = &'a str>) -> bool {
        let entries = self.entries();
        tokens.any(|token| {
            entries
                .iter()
                .any(|entry| entry.as_ref().eq_ignore_ascii_case(token))
        })
    }
}

fn extra_tokens(extra: &str) -> impl Iterator<Item = &str> {
    extra.split(',').map(str::trim)
}

impl Rule<Extra> {
    /// Whether any comma-separated annotation of `extra` is listed.
    pub fn matches(&self, extra: &str) -> bool {
        self.any_match(extra_tokens(extra))
    }

    /// White-list check: passes when unrestricted or when at least one
    /// annotation of `extra` is listed.
    pub fn check_white_list(&self, extra: &str) -> Result<(), Violation> {
        if self.is_in_white_list(extra) {
            return Ok(());
        }
        Err(Violation::ExtraNotWhiteListed {
            extra: extra.to_string(),
        })
    }

    /// Whether `extra` passes as a white list: unrestricted, or listed.
    pub fn is_in_white_list(&self, extra: &str) -> bool {
        !self.is_restricted() || self.matches(extra)
    }

    /// Whether `extra` is caught as a black list: restricted and listed.
    pub fn is_in_black_list(&self, extra: &str) -> bool {
        self.is_restricted() && self.matches(extra)
    }

    /// Black-list check: fails when any annotation of `extra` is listed.
    pub fn check_black_list(&self, extra: &str) -> Result<(), Violation> {
        if self.is_in_black_list(extra) {
            return Err(Violation::ExtraBlackListed {
                extra: extra.to_string(),
            });
        }
        Ok(())
    }
}

impl Rule<SelectType> {
    /// Whether `select_type` is listed. The value is a single token.
    pub fn matches(&self, select_type: &str) -> bool {
        self.any_match(std::iter::once(select_type))
    }

    /// White-list check: passes when unrestricted or when listed.
    pub fn check_white_list(&self, select_type: &str) -> Result<(), Violation> {
        if self.is_in_white_list(select_type) {
            return Ok(());
        }
        Err(Violation::SelectTypeNotWhiteListed {
            select_type: select_type.to_string(),
        })
    }

    /// Whether `select_type` passes as a white list.
    pub fn is_in_white_list(&self, select_type: &str) -> bool {
        !self.is_restricted() || self.matches(select_type)
    }

    /// Whether `select_type` is caught as a black list.
    pub fn is_in_black_list(&self, select_type: &str) -> bool {
        self.is_restricted() && self.matches(select_type)
    }

    /// Black-list check: fails when listed.
    pub fn check_black_list(&self, select_type: &str) -> Result<(), Violation> {
        if self.is_in_black_list(select_type) {
            return Err(Violation::SelectTypeBlackListed {
                select_type: select_type.to_string(),
            });
        }
        Ok(())
    }
}
