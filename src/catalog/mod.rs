pub mod fsck;
pub mod project;
pub mod types;
pub mod validate;

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::store::{EntityStore, TopicRemoval};

use project::{not_found, parse_id, Kind, QuestionInput, QuestionView, TopicInput, TopicView};
use types::{ObjectId, Question, Topic};
use validate::{validate_question, validate_topic};

/// How many drain-then-delete rounds `delete_topic` attempts before giving up
/// on a topic that keeps receiving new questions.
const MAX_CASCADE_ROUNDS: usize = 4;

/// Owns the paired writes between the `topics` and `questions` collections.
///
/// A topic's `question_ids` and each question's `topic_id` live in separate
/// documents. Every operation that touches both runs as a saga: first write,
/// second write, and on failure of the second a compensating undo of the
/// first. If the undo fails too the caller gets
/// `CatalogError::Consistency { compensated: false }` and `fsck` can repair.
pub struct CatalogManager<S> {
    store: Arc<S>,
    /// Shared by every write operation, held exclusively by `fsck` repair, so
    /// a repair never observes or races a saga halfway through.
    repair_gate: RwLock<()>,
}

impl<S: EntityStore> CatalogManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            repair_gate: RwLock::new(()),
        }
    }

    pub async fn get_all_topics(&self) -> CatalogResult<Vec<TopicView>> {
        let topics = self.store.list_topics().await?;
        Ok(topics.iter().map(TopicView::from).collect())
    }

    pub async fn get_topic_by_id(&self, id: &str) -> CatalogResult<TopicView> {
        let topic = self.load_topic(id).await?;
        Ok(TopicView::from(&topic))
    }

    pub async fn get_question(&self, id: &str) -> CatalogResult<QuestionView> {
        let question = self.load_question(id).await?;
        Ok(QuestionView::from(&question))
    }

    /// Questions whose `topic_id` matches, in store order.
    pub async fn get_questions_by_topic(&self, topic_id: &str) -> CatalogResult<Vec<QuestionView>> {
        let topic_id = parse_id(Kind::Topic, topic_id)?;
        let questions = self.store.find_questions_by_topic(topic_id).await?;
        Ok(questions.iter().map(QuestionView::from).collect())
    }

    pub async fn create_topic(&self, input: &TopicInput) -> CatalogResult<TopicView> {
        let valid = validate_topic(input)?;
        let _gate = self.repair_gate.read().await;
        let topic = Topic {
            id: ObjectId::new(),
            data_structure: valid.data_structure,
            question_ids: Vec::new(),
        };
        self.store.insert_topic(&topic).await?;
        info!(topic_id = %topic.id, data_structure = %topic.data_structure, "Topic created");
        Ok(TopicView::from(&topic))
    }

    /// Change `data_structure` only; `question_ids` is left alone.
    pub async fn update_topic(&self, id: &str, input: &TopicInput) -> CatalogResult<TopicView> {
        let valid = validate_topic(input)?;
        let topic_id = parse_id(Kind::Topic, id)?;
        let _gate = self.repair_gate.read().await;
        let topic = self
            .store
            .set_topic_data_structure(topic_id, &valid.data_structure)
            .await?
            .ok_or_else(|| not_found(Kind::Topic, id))?;
        info!(topic_id = %topic.id, data_structure = %topic.data_structure, "Topic updated");
        Ok(TopicView::from(&topic))
    }

    /// Delete a topic and cascade to its questions.
    ///
    /// Each question goes through the same delete saga as `delete_question`, so
    /// the catalog is consistent after every step. The topic document itself is
    /// only removed once its list is empty.
    pub async fn delete_topic(&self, id: &str) -> CatalogResult<()> {
        let _gate = self.repair_gate.read().await;
        let topic_id = self.load_topic(id).await?.id;
        let mut removed = 0usize;

        for round in 0..MAX_CASCADE_ROUNDS {
            let Some(topic) = self.store.find_topic(topic_id).await? else {
                debug!(topic_id = %topic_id, "Topic vanished during cascade");
                return Ok(());
            };

            // Listed ids plus anything carrying the back-reference but not listed.
            let mut owned: BTreeSet<ObjectId> = topic.question_ids.iter().copied().collect();
            for question in self.store.find_questions_by_topic(topic_id).await? {
                owned.insert(question.id);
            }

            for question_id in owned {
                match self.store.find_question(question_id).await? {
                    Some(question) if question.topic_id == topic_id => {
                        self.remove_question(question).await?;
                        removed += 1;
                    }
                    // Dangling or foreign entry: drop it from the list only.
                    _ => {
                        self.store.pull_question_id(topic_id, question_id).await?;
                    }
                }
            }

            match self.store.delete_topic_if_empty(topic_id).await? {
                TopicRemoval::Deleted | TopicRemoval::Missing => {
                    info!(topic_id = %topic_id, removed, "Topic deleted");
                    return Ok(());
                }
                TopicRemoval::NotEmpty => {
                    debug!(topic_id = %topic_id, round, "Topic gained questions during cascade, draining again");
                }
            }
        }

        Err(CatalogError::Consistency {
            operation: "delete_topic",
            detail: format!(
                "topic {} kept gaining questions after {} cascade rounds",
                id, MAX_CASCADE_ROUNDS
            ),
            // Every cascade step left the catalog consistent; nothing to undo.
            compensated: true,
        })
    }

    /// Persist a new question, then list it on its topic.
    pub async fn add_question_to_topic(
        &self,
        topic_id: &str,
        input: &QuestionInput,
    ) -> CatalogResult<QuestionView> {
        let valid = validate_question(input)?;
        let _gate = self.repair_gate.read().await;
        // Checked up front so the common missing-topic case writes nothing.
        let topic = self.load_topic(topic_id).await?;

        let question = Question {
            id: ObjectId::new(),
            topic_id: topic.id,
            question_name: valid.question_name,
            url: valid.url,
            level: valid.level,
            data_structure: valid.data_structure,
        };
        self.store.insert_question(&question).await?;

        let detail = match self.store.push_question_id(topic.id, question.id).await {
            Ok(true) => {
                info!(
                    question_id = %question.id,
                    topic_id = %topic.id,
                    name = %question.question_name,
                    "Question added"
                );
                return Ok(QuestionView::from(&question));
            }
            Ok(false) => format!(
                "topic {} was deleted before question {} could be listed",
                topic.id, question.id
            ),
            Err(e) => format!(
                "failed to list question {} on topic {}: {:#}",
                question.id, topic.id, e
            ),
        };

        warn!(question_id = %question.id, %detail, "Append failed, removing question");
        let compensated = match self.store.delete_question(question.id).await {
            Ok(_) => true,
            Err(e) => {
                error!(question_id = %question.id, "Compensating delete failed: {:#}", e);
                false
            }
        };
        Err(CatalogError::Consistency {
            operation: "add_question_to_topic",
            detail,
            compensated,
        })
    }

    /// Overwrite the descriptive fields; `topic_id` never changes.
    pub async fn update_question(
        &self,
        question_id: &str,
        input: &QuestionInput,
    ) -> CatalogResult<QuestionView> {
        let valid = validate_question(input)?;
        let _gate = self.repair_gate.read().await;
        let mut question = self.load_question(question_id).await?;

        question.question_name = valid.question_name;
        question.url = valid.url;
        question.level = valid.level;
        question.data_structure = valid.data_structure;

        if !self.store.replace_question(&question).await? {
            return Err(not_found(Kind::Question, question_id));
        }
        info!(question_id = %question.id, "Question updated");
        Ok(QuestionView::from(&question))
    }

    /// Delete a question that must belong to `topic_id`, and drop it from the
    /// topic's list.
    pub async fn delete_question(&self, topic_id: &str, question_id: &str) -> CatalogResult<()> {
        let _gate = self.repair_gate.read().await;
        let question = self.load_question(question_id).await?;
        let owner = parse_id(Kind::Topic, topic_id).ok();
        if owner != Some(question.topic_id) {
            return Err(CatalogError::NotFound(format!(
                "Question does not belong to topic with ID: {}",
                topic_id
            )));
        }
        self.remove_question(question).await
    }

    /// Delete saga: remove the document, then pull its id. If the pull fails
    /// the document is put back as it was.
    async fn remove_question(&self, question: Question) -> CatalogResult<()> {
        let deleted = self.store.delete_question(question.id).await?;

        let err = match self.store.pull_question_id(question.topic_id, question.id).await {
            Ok(true) => {
                info!(question_id = %question.id, topic_id = %question.topic_id, "Question deleted");
                return Ok(());
            }
            Ok(false) => {
                warn!(
                    question_id = %question.id,
                    topic_id = %question.topic_id,
                    "Owning topic missing, nothing to unlist"
                );
                return Ok(());
            }
            Err(e) => e,
        };

        warn!(question_id = %question.id, "Unlist failed, restoring question: {:#}", err);
        // Nothing to restore if a concurrent delete got there first.
        let compensated = !deleted
            || match self.store.insert_question(&question).await {
                Ok(()) => true,
                Err(e) => {
                    error!(question_id = %question.id, "Compensating restore failed: {:#}", e);
                    false
                }
            };
        Err(CatalogError::Consistency {
            operation: "delete_question",
            detail: format!(
                "failed to remove question {} from topic {}: {:#}",
                question.id, question.topic_id, err
            ),
            compensated,
        })
    }

    async fn load_topic(&self, raw: &str) -> CatalogResult<Topic> {
        let id = parse_id(Kind::Topic, raw)?;
        self.store
            .find_topic(id)
            .await?
            .ok_or_else(|| not_found(Kind::Topic, raw))
    }

    async fn load_question(&self, raw: &str) -> CatalogResult<Question> {
        let id = parse_id(Kind::Question, raw)?;
        self.store
            .find_question(id)
            .await?
            .ok_or_else(|| not_found(Kind::Question, raw))
    }
}
