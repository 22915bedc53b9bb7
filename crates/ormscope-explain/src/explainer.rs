use crate::access::{AccessFloor, AccessType, FloorMode};
use crate::error::ExplainResult;
use crate::plan::{PlanRow, PlanTable};
use crate::rules::{Extra, ExtraList, SelectType, SelectTypeList};
use crate::violation::Violation;
use serde::Serialize;

/// Policy applied to every row of a plan.
///
/// All rules default to unrestricted. Rules are fixed once an [`Explainer`]
/// is built from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyRules {
    pub extra_white_list: ExtraList,
    pub extra_black_list: ExtraList,
    pub select_type_white_list: SelectTypeList,
    pub select_type_black_list: SelectTypeList,
    pub min_access_type: AccessFloor,
    pub floor_mode: FloorMode,
}

impl PolicyRules {
    /// Create an unrestricted policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows pass only if at least one `Extra` annotation is listed.
    pub fn with_extra_white_list<I, V>(mut self, list: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Extra>,
    {
        self.extra_white_list = ExtraList::new(list);
        self
    }

    /// Rows fail if any `Extra` annotation is listed.
    pub fn with_extra_black_list<I, V>(mut self, list: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Extra>,
    {
        self.extra_black_list = ExtraList::new(list);
        self
    }

    /// Rows pass only if their `select_type` is listed.
    pub fn with_select_type_white_list<I, V>(mut self, list: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SelectType>,
    {
        self.select_type_white_list = SelectTypeList::new(list);
        self
    }

    /// Rows fail if their `select_type` is listed.
    pub fn with_select_type_black_list<I, V>(mut self, list: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SelectType>,
    {
        self.select_type_black_list = SelectTypeList::new(list);
        self
    }

    /// Require a recognized access type on every row.
    ///
    /// Under the default [`FloorMode::ValidateOnly`] the level is recorded
    /// but not compared; call [`PolicyRules::enforce_access_floor`] to also
    /// reject rows that rank below it.
    pub fn with_min_access_type(mut self, level: AccessType) -> Self {
        self.min_access_type = AccessFloor::AtLeast(level);
        self
    }

    /// Set the access floor directly.
    pub fn with_access_floor(mut self, floor: AccessFloor) -> Self {
        self.min_access_type = floor;
        self
    }

    /// Compare observed access types against the floor level.
    pub fn enforce_access_floor(mut self) -> Self {
        self.floor_mode = FloorMode::Enforce;
        self
    }

    /// Whether no rule is configured at all.
    pub fn is_unrestricted(&self) -> bool {
        !self.extra_white_list.is_restricted()
            && !self.extra_black_list.is_restricted()
            && !self.select_type_white_list.is_restricted()
            && !self.select_type_black_list.is_restricted()
            && self.min_access_type == AccessFloor::Unrestricted
    }
}

/// Rows of one analyzed plan, plus the first violation found.
///
/// When `violation` is set, `rows` still holds every extracted row, but rows
/// after the failing one were not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub rows: Vec<PlanRow>,
    pub violation: Option<Violation>,
}

impl Analysis {
    /// Whether every row passed.
    pub fn is_clean(&self) -> bool {
        self.violation.is_none()
    }
}

/// Checks execution-plan rows against a [`PolicyRules`].
///
/// An explainer holds no mutable state, so repeated analysis of the same
/// rows always produces the same outcome.
#[derive(Debug, Clone, Default)]
pub struct Explainer {
    rules: PolicyRules,
}

impl Explainer {
    pub fn new(rules: PolicyRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PolicyRules {
        &self.rules
    }

    /// Check one row. Rules run in a fixed order and the first failure wins:
    /// extra black list, extra white list, select-type black list,
    /// select-type white list, access-type floor.
    pub fn check_row(&self, row: &PlanRow) -> Result<(), Violation> {
        self.rules.extra_black_list.check_black_list(&row.extra)?;
        self.rules.extra_white_list.check_white_list(&row.extra)?;
        self.rules
            .select_type_black_list
            .check_black_list(&row.select_type)?;
        self.rules
            .select_type_white_list
            .check_white_list(&row.select_type)?;
        self.check_access_type(&row.access_type)
    }

    fn check_access_type(&self, observed: &str) -> Result<(), Violation> {
        let AccessFloor::AtLeast(floor) = self.rules.min_access_type else {
            return Ok(());
        };
        let recognized = match self.rules.floor_mode {
            FloorMode::ValidateOnly => AccessType::parse_exact(observed),
            FloorMode::Enforce => AccessType::parse(observed),
        };
        let Some(access_type) = recognized else {
            return Err(Violation::UnrecognizedAccessType {
                access_type: observed.to_string(),
            });
        };
        if self.rules.floor_mode == FloorMode::Enforce && access_type < floor {
            return Err(Violation::AccessTypeBelowFloor { access_type, floor });
        }
        Ok(())
    }

    /// Check rows in order, stopping at the first violation.
    pub fn analyze(&self, rows: Vec<PlanRow>) -> Analysis {
        let violation = rows.iter().find_map(|row| self.check_row(row).err());
        Analysis { rows, violation }
    }

    /// Extract rows from tabular EXPLAIN output, then [`Explainer::analyze`]
    /// them. Extraction errors are returned before any rule runs.
    pub fn analyze_table(&self, table: &PlanTable) -> ExplainResult<Analysis> {
        let rows = table.extract()?;
        Ok(self.analyze(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64) -> PlanRow {
        PlanRow::new(id)
            .with_select_type("SIMPLE")
            .with_access_type("ref")
            .with_extra("Using where")
    }

    #[test]
    fn test_unrestricted_policy_passes_everything() {
        let explainer = Explainer::default();
        assert!(explainer.rules().is_unrestricted());
        let analysis = explainer.analyze(vec![row(1), PlanRow::new(2)]);
        assert!(analysis.is_clean());
        assert_eq!(analysis.rows.len(), 2);
    }

    #[test]
    fn test_black_list_is_checked_before_white_list() {
        let explainer = Explainer::new(
            PolicyRules::new()
                .with_extra_white_list([Extra::Index])
                .with_extra_black_list([Extra::Where]),
        );
        let err = explainer.check_row(&row(1)).unwrap_err();
        assert_eq!(err.rule(), "extra_black_list");
    }

    #[test]
    fn test_extra_rules_precede_select_type_rules() {
        let explainer = Explainer::new(
            PolicyRules::new()
                .with_extra_white_list([Extra::Index])
                .with_select_type_black_list([SelectType::Simple]),
        );
        let err = explainer.check_row(&row(1)).unwrap_err();
        assert_eq!(err.rule(), "extra_white_list");
    }

    #[test]
    fn test_select_type_black_list_precedes_white_list() {
        let explainer = Explainer::new(
            PolicyRules::new()
                .with_select_type_black_list([SelectType::Simple])
                .with_select_type_white_list([SelectType::Primary]),
        );
        let err = explainer.check_row(&row(1)).unwrap_err();
        assert_eq!(
            err,
            Violation::SelectTypeBlackListed {
                select_type: "SIMPLE".into()
            }
        );
    }

    #[test]
    fn test_floor_only_validates_tokens_by_default() {
        let explainer =
            Explainer::new(PolicyRules::new().with_min_access_type(AccessType::Const));

        // `ref` ranks below `const`, yet passes: the level is not compared.
        assert!(explainer.check_row(&row(1)).is_ok());
        assert!(explainer.check_row(&row(1).with_access_type("all")).is_ok());

        let err = explainer
            .check_row(&row(1).with_access_type("index_merge"))
            .unwrap_err();
        assert_eq!(
            err,
            Violation::UnrecognizedAccessType {
                access_type: "index_merge".into()
            }
        );
        assert!(explainer.check_row(&row(1).with_access_type("")).is_err());
    }

    #[test]
    fn test_upper_case_token_depends_on_floor_mode() {
        let validate = Explainer::new(PolicyRules::new().with_min_access_type(AccessType::Range));
        let err = validate
            .check_row(&row(1).with_access_type("ALL"))
            .unwrap_err();
        assert_eq!(
            err,
            Violation::UnrecognizedAccessType {
                access_type: "ALL".into()
            }
        );
        assert_eq!(err.to_string(), "\"ALL\" is not valid type from row result");
        assert!(validate.check_row(&row(1).with_access_type("Ref")).is_err());

        let enforce = Explainer::new(
            PolicyRules::new()
                .with_min_access_type(AccessType::Index)
                .enforce_access_floor(),
        );
        assert!(enforce.check_row(&row(1).with_access_type("Ref")).is_ok());
        assert!(matches!(
            enforce.check_row(&row(1).with_access_type("ALL")),
            Err(Violation::AccessTypeBelowFloor { .. })
        ));
    }

    #[test]
    fn test_enforced_floor_rejects_lower_levels() {
        let explainer = Explainer::new(
            PolicyRules::new()
                .with_min_access_type(AccessType::Range)
                .enforce_access_floor(),
        );
        assert!(explainer.check_row(&row(1)).is_ok());
        assert!(explainer.check_row(&row(1).with_access_type("range")).is_ok());

        let err = explainer
            .check_row(&row(1).with_access_type("ALL"))
            .unwrap_err();
        assert_eq!(
            err,
            Violation::AccessTypeBelowFloor {
                access_type: AccessType::All,
                floor: AccessType::Range
            }
        );

        // Unrecognized stays distinct from below-floor.
        let err = explainer
            .check_row(&row(1).with_access_type("fulltext"))
            .unwrap_err();
        assert!(matches!(err, Violation::UnrecognizedAccessType { .. }));
    }

    #[test]
    fn test_no_floor_ignores_access_type() {
        let explainer = Explainer::new(PolicyRules::new().enforce_access_floor());
        assert!(explainer.check_row(&row(1).with_access_type("??")).is_ok());
    }
}
