//! Plan row model and extraction from tabular EXPLAIN output.

use crate::error::{ExplainError, ExplainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column names read from an EXPLAIN result, in [`PlanRow`] field order.
pub const PLAN_COLUMNS: [&str; 10] = [
    "id",
    "select_type",
    "table",
    "type",
    "possible_keys",
    "key",
    "key_len",
    "ref",
    "rows",
    "extra",
];

/// One row of an execution plan.
///
/// Serialized names follow the EXPLAIN column headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRow {
    /// Sequence number of the SELECT within the query.
    pub id: i64,
    pub select_type: String,
    pub table: String,
    /// Join / access type (`type` column).
    #[serde(rename = "type")]
    pub access_type: String,
    pub possible_keys: String,
    /// Index actually chosen (`key` column).
    #[serde(rename = "key")]
    pub chosen_key: String,
    #[serde(rename = "key_len")]
    pub key_length: i64,
    /// Columns or constants compared to the index (`ref` column).
    #[serde(rename = "ref")]
    pub reference: String,
    /// Estimated rows to examine (`rows` column).
    #[serde(rename = "rows")]
    pub estimated_rows: i64,
    /// Comma-separated free-text annotations.
    #[serde(rename = "Extra")]
    pub extra: String,
}

impl PlanRow {
    /// Create an empty row with the given id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_select_type(mut self, select_type: impl Into<String>) -> Self {
        self.select_type = select_type.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_access_type(mut self, access_type: impl Into<String>) -> Self {
        self.access_type = access_type.into();
        self
    }

    pub fn with_chosen_key(mut self, key: impl Into<String>) -> Self {
        self.chosen_key = key.into();
        self
    }

    pub fn with_estimated_rows(mut self, rows: i64) -> Self {
        self.estimated_rows = rows;
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }
}

/// Tabular query output: a header plus rows of nullable cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl PlanTable {
    /// Create a table with the given header and no rows.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table whose header is exactly [`PLAN_COLUMNS`].
    pub fn with_plan_columns() -> Self {
        Self::new(PLAN_COLUMNS)
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// Append a row (builder form).
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert every row into a [`PlanRow`].
    ///
    /// Columns are located by name, ignoring ASCII case; columns other than
    /// [`PLAN_COLUMNS`] are ignored. Null integers become `0` and null text
    /// becomes `""`. The first malformed row aborts extraction.
    pub fn extract(&self) -> ExplainResult<Vec<PlanRow>> {
        let index = self.column_index()?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.extract_row(&index, i, row))
            .collect()
    }

    fn column_index(&self) -> ExplainResult<[usize; 10]> {
        let mut index = [0usize; 10];
        for (slot, name) in index.iter_mut().zip(PLAN_COLUMNS) {
            *slot = self
                .columns
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| ExplainError::MissingColumn(name.to_string()))?;
        }
        Ok(index)
    }

    fn extract_row(&self, index: &[usize; 10], i: usize, row: &[Value]) -> ExplainResult<PlanRow> {
        if row.len() != self.columns.len() {
            return Err(ExplainError::RowShape {
                row: i,
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        let cell = |n: usize| (PLAN_COLUMNS[n], &row[index[n]]);

        Ok(PlanRow {
            id: int_cell(cell(0))?,
            select_type: text_cell(cell(1))?,
            table: text_cell(cell(2))?,
            access_type: text_cell(cell(3))?,
            possible_keys: text_cell(cell(4))?,
            chosen_key: text_cell(cell(5))?,
            key_length: int_cell(cell(6))?,
            reference: text_cell(cell(7))?,
            estimated_rows: int_cell(cell(8))?,
            extra: text_cell(cell(9))?,
        })
    }
}

fn int_cell((column, value): (&str, &Value)) -> ExplainResult<i64> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ExplainError::decode(column, format!("{n} is not a 64-bit integer"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|e| ExplainError::decode(column, format!("invalid integer {s:?}: {e}"))),
        other => Err(ExplainError::decode(
            column,
            format!("expected integer, got {other}"),
        )),
    }
}

fn text_cell((column, value): (&str, &Value)) -> ExplainResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ExplainError::decode(column, format!("expected text, got {other}"))),
    }
}
