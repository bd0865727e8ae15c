use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
