use starlake_model::SourceDataType;
use std::fmt;

/// One concrete value of a materialized row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    Boolean(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl ResultValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ResultValue::Null)
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Null => f.write_str(""),
            ResultValue::Boolean(value) => write!(f, "{value}"),
            ResultValue::Int(value) => write!(f, "{value}"),
            ResultValue::Double(value) => write!(f, "{value}"),
            ResultValue::String(value) => f.write_str(value),
        }
    }
}

/// One named, typed output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: SourceDataType,
    pub nullable: bool,
}

/// The materialized result of one query: an ordered sequence of rows with
/// named, typed columns matching the final projection.
///
/// This is the only point at which a lazy backend is forced to do work; how
/// the rows were physically encoded before materialization is the backend's
/// concern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterializedResult {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<ResultValue>>,
}

impl MaterializedResult {
    pub fn new(columns: Vec<ResultColumn>, rows: Vec<Vec<ResultValue>>) -> Self {
        debug_assert!(
            rows.iter().all(|row| row.len() == columns.len()),
            "row width must match column count"
        );
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<ResultValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The value at (`row`, `column name`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&ResultValue> {
        let index = self.columns.iter().position(|c| c.name == column)?;
        self.rows.get(row)?.get(index)
    }
}
