pub mod disk;
#[cfg(test)]
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::catalog::types::{ObjectId, Question, Topic};

pub use disk::DiskStore;

/// Outcome of a conditional topic delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRemoval {
    Deleted,
    Missing,
    /// The topic still lists questions and was left in place.
    NotEmpty,
}

/// Document store holding the `topics` and `questions` collections.
///
/// Every method touches exactly one document. There is no cross-document
/// commit; pairing writes is the catalog manager's job. The list methods are
/// atomic with respect to each other, so concurrent pushes never lose ids.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn insert_topic(&self, topic: &Topic) -> Result<()>;

    async fn find_topic(&self, id: ObjectId) -> Result<Option<Topic>>;

    async fn list_topics(&self) -> Result<Vec<Topic>>;

    /// Overwrite `data_structure` only. Returns the updated topic, or `None`
    /// when no topic has this id.
    async fn set_topic_data_structure(
        &self,
        id: ObjectId,
        data_structure: &str,
    ) -> Result<Option<Topic>>;

    /// Delete the topic only if its `question_ids` is empty.
    async fn delete_topic_if_empty(&self, id: ObjectId) -> Result<TopicRemoval>;

    /// Append `question` to the topic's list unless already present.
    /// Returns false when the topic does not exist.
    async fn push_question_id(&self, topic: ObjectId, question: ObjectId) -> Result<bool>;

    /// Remove every occurrence of `question` from the topic's list.
    /// Returns false when the topic does not exist.
    async fn pull_question_id(&self, topic: ObjectId, question: ObjectId) -> Result<bool>;

    async fn insert_question(&self, question: &Question) -> Result<()>;

    /// Replace a stored question wholesale. Returns false if it does not exist.
    async fn replace_question(&self, question: &Question) -> Result<bool>;

    async fn find_question(&self, id: ObjectId) -> Result<Option<Question>>;

    async fn list_questions(&self) -> Result<Vec<Question>>;

    /// Equality filter on `topic_id`.
    async fn find_questions_by_topic(&self, topic: ObjectId) -> Result<Vec<Question>>;

    /// Returns false if the question did not exist.
    async fn delete_question(&self, id: ObjectId) -> Result<bool>;
}
