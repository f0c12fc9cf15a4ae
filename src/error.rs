use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("table has no column named '{column}'")]
    MissingColumn { column: String },
    #[error("row {row}: cluster label '{value}' is not a non-negative integer")]
    InvalidLabel { row: usize, value: String },
}
