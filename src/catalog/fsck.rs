//! Offline consistency audit for the topic/question references.
//!
//! Finds every way the embedded `question_ids` lists and the questions'
//! `topic_id` back-references can disagree, and optionally repairs them.
//! Repairs are ordinary single-document store calls. A repairing run holds
//! the manager's repair gate exclusively, so it waits for in-flight writes to
//! finish and blocks new ones until the pass is done. Writers from another
//! process sharing the same store are not covered.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{info, warn};

use super::types::{ObjectId, Question, Topic};
use super::CatalogManager;
use crate::error::CatalogResult;
use crate::store::EntityStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// Listed id with no question document.
    DanglingId { topic: ObjectId, question: ObjectId },
    /// Listed question that belongs to another topic.
    ForeignId {
        topic: ObjectId,
        question: ObjectId,
        owner: ObjectId,
    },
    /// Id listed more than once on the same topic.
    DuplicateId { topic: ObjectId, question: ObjectId },
    /// Question whose topic exists but does not list it.
    Unlisted { topic: ObjectId, question: ObjectId },
    /// Question whose topic does not exist.
    Orphan { question: ObjectId, topic: ObjectId },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::DanglingId { topic, question } => {
                write!(f, "topic {} lists missing question {}", topic, question)
            }
            Issue::ForeignId {
                topic,
                question,
                owner,
            } => write!(
                f,
                "topic {} lists question {} owned by topic {}",
                topic, question, owner
            ),
            Issue::DuplicateId { topic, question } => {
                write!(f, "topic {} lists question {} more than once", topic, question)
            }
            Issue::Unlisted { topic, question } => {
                write!(f, "question {} is missing from topic {}", question, topic)
            }
            Issue::Orphan { question, topic } => {
                write!(f, "question {} points at missing topic {}", question, topic)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsckReport {
    pub topics: usize,
    pub questions: usize,
    pub issues: Vec<Issue>,
    pub repaired: usize,
}

impl FsckReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Compare both collections and list every disagreement.
pub fn audit(topics: &[Topic], questions: &[Question]) -> Vec<Issue> {
    let by_id: HashMap<ObjectId, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    let mut listed: HashMap<ObjectId, HashSet<ObjectId>> = HashMap::new();
    let mut issues = Vec::new();

    for topic in topics {
        let mut seen = HashSet::new();
        let mut valid = HashSet::new();
        for &question in &topic.question_ids {
            if !seen.insert(question) {
                // Only report duplicates of otherwise-valid entries; a pull
                // already clears every copy of a bad one.
                if valid.contains(&question) {
                    issues.push(Issue::DuplicateId {
                        topic: topic.id,
                        question,
                    });
                }
                continue;
            }
            match by_id.get(&question) {
                None => issues.push(Issue::DanglingId {
                    topic: topic.id,
                    question,
                }),
                Some(q) if q.topic_id != topic.id => issues.push(Issue::ForeignId {
                    topic: topic.id,
                    question,
                    owner: q.topic_id,
                }),
                Some(_) => {
                    valid.insert(question);
                }
            }
        }
        listed.insert(topic.id, valid);
    }

    for question in questions {
        match listed.get(&question.topic_id) {
            None => issues.push(Issue::Orphan {
                question: question.id,
                topic: question.topic_id,
            }),
            Some(ids) if !ids.contains(&question.id) => issues.push(Issue::Unlisted {
                topic: question.topic_id,
                question: question.id,
            }),
            Some(_) => {}
        }
    }

    issues
}

impl<S: EntityStore> CatalogManager<S> {
    /// Audit the catalog. With `repair`, fix each issue found.
    pub async fn fsck(&self, repair: bool) -> CatalogResult<FsckReport> {
        // Audit and repair must see the same snapshot of both collections.
        let _gate = if repair {
            Some(self.repair_gate.write().await)
        } else {
            None
        };
        let topics = self.store.list_topics().await?;
        let questions = self.store.list_questions().await?;
        let issues = audit(&topics, &questions);

        let mut report = FsckReport {
            topics: topics.len(),
            questions: questions.len(),
            issues,
            repaired: 0,
        };

        if repair {
            for issue in &report.issues {
                self.repair(issue).await?;
                report.repaired += 1;
            }
        }

        if report.is_clean() {
            info!(topics = report.topics, questions = report.questions, "Catalog is consistent");
        } else {
            warn!(
                topics = report.topics,
                questions = report.questions,
                issues = report.issues.len(),
                repaired = report.repaired,
                "Catalog inconsistencies found"
            );
        }
        Ok(report)
    }

    async fn repair(&self, issue: &Issue) -> CatalogResult<()> {
        match *issue {
            Issue::DanglingId { topic, question } | Issue::ForeignId { topic, question, .. } => {
                self.store.pull_question_id(topic, question).await?;
            }
            Issue::DuplicateId { topic, question } => {
                // Pull clears every copy; push puts one back at the end.
                self.store.pull_question_id(topic, question).await?;
                self.store.push_question_id(topic, question).await?;
            }
            Issue::Unlisted { topic, question } => {
                self.store.push_question_id(topic, question).await?;
            }
            Issue::Orphan { question, .. } => {
                self.store.delete_question(question).await?;
            }
        }
        info!(%issue, "Repaired");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::catalog::project::{QuestionInput, TopicInput};
    use crate::store::memory::MemoryStore;

    fn question(topic: ObjectId) -> Question {
        Question {
            id: ObjectId::new(),
            topic_id: topic,
            question_name: "Merge Intervals".to_string(),
            url: "https://leetcode.com/problems/merge-intervals/".to_string(),
            level: "Medium".to_string(),
            data_structure: None,
        }
    }

    #[test]
    fn test_audit_classifies_every_issue() {
        let t1 = ObjectId::new();
        let t2 = ObjectId::new();
        let ok = question(t1);
        let foreign = question(t2);
        let unlisted = question(t1);
        let orphan = question(ObjectId::new());
        let dangling = ObjectId::new();

        let topics = vec![
            Topic {
                id: t1,
                data_structure: "Intervals".to_string(),
                question_ids: vec![ok.id, dangling, foreign.id, ok.id],
            },
            Topic {
                id: t2,
                data_structure: "Arrays".to_string(),
                question_ids: vec![foreign.id],
            },
        ];
        let questions = vec![ok.clone(), foreign.clone(), unlisted.clone(), orphan.clone()];

        let issues = audit(&topics, &questions);
        assert_eq!(
            issues,
            vec![
                Issue::DanglingId {
                    topic: t1,
                    question: dangling
                },
                Issue::ForeignId {
                    topic: t1,
                    question: foreign.id,
                    owner: t2
                },
                Issue::DuplicateId {
                    topic: t1,
                    question: ok.id
                },
                Issue::Unlisted {
                    topic: t1,
                    question: unlisted.id
                },
                Issue::Orphan {
                    question: orphan.id,
                    topic: orphan.topic_id
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_fsck_on_consistent_catalog_is_clean() {
        let store = Arc::new(MemoryStore::new());
        let catalog = CatalogManager::new(store);
        let topic = catalog
            .create_topic(&TopicInput {
                data_structure: Some("Tries".to_string()),
            })
            .await
            .unwrap();
        catalog
            .add_question_to_topic(
                &topic.id,
                &QuestionInput {
                    question_name: Some("Implement Trie".to_string()),
                    url: Some("https://leetcode.com/problems/implement-trie-prefix-tree/".to_string()),
                    level: Some("Medium".to_string()),
                    data_structure: None,
                },
            )
            .await
            .unwrap();

        let report = catalog.fsck(false).await.unwrap();
        assert!(report.is_clean());
        assert_eq!((report.topics, report.questions), (1, 1));
    }

    #[tokio::test]
    async fn test_fsck_repair_restores_invariant() {
        let store = Arc::new(MemoryStore::new());
        let t1 = ObjectId::new();
        let ok = question(t1);
        let unlisted = question(t1);
        let orphan = question(ObjectId::new());
        let dangling = ObjectId::new();
        store.put_topic_raw(Topic {
            id: t1,
            data_structure: "Intervals".to_string(),
            question_ids: vec![ok.id, dangling, ok.id],
        });
        for q in [&ok, &unlisted, &orphan] {
            store.put_question_raw(q.clone());
        }

        let catalog = CatalogManager::new(store.clone());
        let report = catalog.fsck(true).await.unwrap();
        assert_eq!(report.issues.len(), 4);
        assert_eq!(report.repaired, 4);

        let after = catalog.fsck(false).await.unwrap();
        assert!(after.is_clean(), "left over: {:?}", after.issues);
        let topic = store.find_topic(t1).await.unwrap().unwrap();
        assert_eq!(topic.question_ids, vec![ok.id, unlisted.id]);
        assert!(store.find_question(orphan.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repair_waits_for_in_flight_writes() {
        let store = Arc::new(MemoryStore::new());
        let t1 = ObjectId::new();
        store.put_topic_raw(Topic {
            id: t1,
            data_structure: "Heaps".to_string(),
            question_ids: vec![ObjectId::new()],
        });
        let catalog = CatalogManager::new(store.clone());

        // A saga holding the gate keeps repair out.
        let saga = catalog.repair_gate.read().await;
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), catalog.fsck(true)).await;
        assert!(blocked.is_err());
        // A read-only audit does not wait.
        let report = catalog.fsck(false).await.unwrap();
        assert_eq!(report.issues.len(), 1);
        drop(saga);

        let report = catalog.fsck(true).await.unwrap();
        assert_eq!(report.repaired, 1);
        assert!(store.find_topic(t1).await.unwrap().unwrap().question_ids.is_empty());
    }
}
