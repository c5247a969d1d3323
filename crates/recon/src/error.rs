use std::fmt;

#[derive(Debug)]
pub enum ExtractError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty source path, duplicate provider, etc.).
    ConfigValidation(String),
    /// Missing required column in an input table.
    MissingColumn { table: String, column: String },
    /// Date or timestamp parse error.
    DateParse { table: String, row: usize, column: String, value: String },
    /// Decimal parse error.
    DecimalParse { table: String, row: usize, column: String, value: String },
    /// CSV framing error (bad quoting, ragged row, etc.).
    Csv(String),
    /// IO error (file read/write).
    Io(String),
    /// A monetary sum left the representable decimal range.
    Overflow(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::DateParse { table, row, column, value } => {
                write!(f, "table '{table}', row {row}, column '{column}': cannot parse date '{value}'")
            }
            Self::DecimalParse { table, row, column, value } => {
                write!(f, "table '{table}', row {row}, column '{column}': cannot parse decimal '{value}'")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Overflow(what) => write!(f, "decimal overflow: {what}"),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<csv::Error> for ExtractError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
