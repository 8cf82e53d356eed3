use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// A required column is missing from an input table.
    Schema { table: String, column: String },
    /// The remote tabular service is unreachable or rejected the credential.
    RemoteAccess(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty prefix, bad header row, etc.).
    ConfigValidation(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl ReconError {
    pub fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema { table, column } => {
                write!(f, "table '{table}': missing required column '{column}'")
            }
            Self::RemoteAccess(msg) => write!(f, "remote access error: {msg}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
