//! Conversions between stored entities and the string-id views handed to
//! callers, plus parsing of caller-supplied ids.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::types::{ObjectId, Question, Topic};
use crate::error::{CatalogError, CatalogResult};

/// Incoming topic fields. Missing or empty values fail validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInput {
    pub data_structure: Option<String>,
}

/// Incoming question fields. Missing or empty required values fail validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    pub question_name: Option<String>,
    pub url: Option<String>,
    pub level: Option<String>,
    pub data_structure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: String,
    pub data_structure: String,
    pub question_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub topic_id: String,
    pub question_name: String,
    pub url: String,
    pub level: String,
    pub data_structure: Option<String>,
}

impl From<&Topic> for TopicView {
    fn from(topic: &Topic) -> Self {
        Self {
            id: topic.id.to_string(),
            data_structure: topic.data_structure.clone(),
            question_ids: topic.question_ids.iter().map(ObjectId::to_string).collect(),
        }
    }
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.to_string(),
            topic_id: question.topic_id.to_string(),
            question_name: question.question_name.clone(),
            url: question.url.clone(),
            level: question.level.clone(),
            data_structure: question.data_structure.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Topic,
    Question,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Topic => f.write_str("Topic"),
            Kind::Question => f.write_str("Question"),
        }
    }
}

pub fn not_found(kind: Kind, raw: &str) -> CatalogError {
    CatalogError::NotFound(format!("{} not found with ID: {}", kind, raw))
}

/// Parse a caller-supplied id. A malformed id cannot name a stored document,
/// so it is reported as not found.
pub fn parse_id(kind: Kind, raw: &str) -> CatalogResult<ObjectId> {
    raw.trim().parse().map_err(|_| not_found(kind, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_view_keeps_id_order() {
        let q1 = ObjectId::new();
        let q2 = ObjectId::new();
        let topic = Topic {
            id: ObjectId::new(),
            data_structure: "Stacks".to_string(),
            question_ids: vec![q2, q1],
        };
        let view = TopicView::from(&topic);
        assert_eq!(view.id, topic.id.to_hex());
        assert_eq!(view.question_ids, vec![q2.to_hex(), q1.to_hex()]);
    }

    #[test]
    fn test_question_view_json_shape() {
        let question = Question {
            id: "65a1f0c2e4b0a1b2c3d4e5f6".parse().unwrap(),
            topic_id: "65a1f0c2e4b0a1b2c3d4e5f7".parse().unwrap(),
            question_name: "Valid Parentheses".to_string(),
            url: "https://leetcode.com/problems/valid-parentheses/".to_string(),
            level: "Easy".to_string(),
            data_structure: Some("Stack".to_string()),
        };
        let json = serde_json::to_value(QuestionView::from(&question)).unwrap();
        assert_eq!(json["id"], "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(json["topicId"], "65a1f0c2e4b0a1b2c3d4e5f7");
        assert_eq!(json["questionName"], "Valid Parentheses");
        assert_eq!(json["dataStructure"], "Stack");
    }

    #[test]
    fn test_parse_id_maps_garbage_to_not_found() {
        match parse_id(Kind::Topic, "abc") {
            Err(CatalogError::NotFound(msg)) => assert_eq!(msg, "Topic not found with ID: abc"),
            other => panic!("unexpected: {:?}", other),
        }
        let id = ObjectId::new();
        assert_eq!(parse_id(Kind::Question, &format!(" {} ", id)).unwrap(), id);
    }
}
