use thiserror::Error;

use crate::expr::ParseError;

pub type Result<T> = std::result::Result<T, WardenError>;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Invalid filter for rule `{rule}`: {source}")]
    Filter {
        rule: String,
        #[source]
        source: ParseError,
    },

    #[error("Unknown rule `{0}` in configuration")]
    UnknownRule(String),

    #[error("Template error in {file}: {message}")]
    Template { file: String, message: String },

    #[error("Rule error ({rule_id}): {message}")]
    Rule { rule_id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WardenError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}
