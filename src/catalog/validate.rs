use crate::catalog::project::{QuestionInput, TopicInput};
use crate::error::{CatalogError, CatalogResult};

/// Topic fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTopic {
    pub data_structure: String,
}

/// Question fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub question_name: String,
    pub url: String,
    pub level: String,
    pub data_structure: Option<String>,
}

fn required(value: &Option<String>, message: &str) -> CatalogResult<String> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CatalogError::Validation(message.to_string())),
    }
}

pub fn validate_topic(input: &TopicInput) -> CatalogResult<ValidatedTopic> {
    Ok(ValidatedTopic {
        data_structure: required(&input.data_structure, "DataStructure cannot be null or empty")?,
    })
}

pub fn validate_question(input: &QuestionInput) -> CatalogResult<ValidatedQuestion> {
    Ok(ValidatedQuestion {
        question_name: required(&input.question_name, "Question name cannot be null or empty")?,
        url: required(&input.url, "Question URL cannot be null or empty")?,
        level: required(&input.level, "Question level cannot be null or empty")?,
        data_structure: input.data_structure.clone(),
    })
}
