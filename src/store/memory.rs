use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{EntityStore, TopicRemoval};
use crate::catalog::types::{ObjectId, Question, Topic};

#[derive(Default)]
struct Inner {
    topics: BTreeMap<ObjectId, Topic>,
    questions: BTreeMap<ObjectId, Question>,
    /// Operation name -> number of upcoming calls that should fail.
    faults: HashMap<&'static str, usize>,
    writes: usize,
    /// Drop the target topic right before the next push, as a concurrent
    /// `delete_topic` would.
    vanish_on_push: bool,
    /// List a fresh id on the topic whenever `delete_topic_if_empty` runs, as
    /// a stream of concurrent adds would.
    relist_on_delete: bool,
}

impl Inner {
    fn trip(&mut self, op: &'static str) -> Result<()> {
        if let Some(remaining) = self.faults.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                bail!("injected failure in {}", op);
            }
        }
        Ok(())
    }

    fn write(&mut self, op: &'static str) -> Result<()> {
        self.trip(op)?;
        self.writes += 1;
        Ok(())
    }
}

/// In-memory store with fault injection, for exercising partial failures.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls of `op` (a trait method name) fail.
    pub fn fail_next(&self, op: &'static str, times: usize) {
        self.inner.lock().unwrap().faults.insert(op, times);
    }

    pub fn vanish_topic_on_next_push(&self) {
        self.inner.lock().unwrap().vanish_on_push = true;
    }

    pub fn relist_on_delete(&self, enabled: bool) {
        self.inner.lock().unwrap().relist_on_delete = enabled;
    }

    /// Number of successful mutating calls so far.
    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap().writes
    }

    /// Overwrite a topic document directly, bypassing list semantics.
    pub fn put_topic_raw(&self, topic: Topic) {
        self.inner.lock().unwrap().topics.insert(topic.id, topic);
    }

    /// Insert a question document directly.
    pub fn put_question_raw(&self, question: Question) {
        self.inner
            .lock()
            .unwrap()
            .questions
            .insert(question.id, question);
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_topic(&self, topic: &Topic) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("insert_topic")?;
        inner.topics.insert(topic.id, topic.clone());
        Ok(())
    }

    async fn find_topic(&self, id: ObjectId) -> Result<Option<Topic>> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip("find_topic")?;
        Ok(inner.topics.get(&id).cloned())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip("list_topics")?;
        Ok(inner.topics.values().cloned().collect())
    }

    async fn set_topic_data_structure(
        &self,
        id: ObjectId,
        data_structure: &str,
    ) -> Result<Option<Topic>> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("set_topic_data_structure")?;
        Ok(inner.topics.get_mut(&id).map(|topic| {
            topic.data_structure = data_structure.to_string();
            topic.clone()
        }))
    }

    async fn delete_topic_if_empty(&self, id: ObjectId) -> Result<TopicRemoval> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("delete_topic_if_empty")?;
        if inner.relist_on_delete {
            if let Some(topic) = inner.topics.get_mut(&id) {
                topic.question_ids.push(ObjectId::new());
            }
        }
        let removal = match inner.topics.get(&id) {
            None => TopicRemoval::Missing,
            Some(topic) if !topic.question_ids.is_empty() => TopicRemoval::NotEmpty,
            Some(_) => TopicRemoval::Deleted,
        };
        if removal == TopicRemoval::Deleted {
            inner.topics.remove(&id);
        }
        Ok(removal)
    }

    async fn push_question_id(&self, topic: ObjectId, question: ObjectId) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("push_question_id")?;
        if std::mem::take(&mut inner.vanish_on_push) {
            inner.topics.remove(&topic);
        }
        let Some(t) = inner.topics.get_mut(&topic) else {
            return Ok(false);
        };
        if !t.question_ids.contains(&question) {
            t.question_ids.push(question);
        }
        Ok(true)
    }

    async fn pull_question_id(&self, topic: ObjectId, question: ObjectId) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("pull_question_id")?;
        let Some(t) = inner.topics.get_mut(&topic) else {
            return Ok(false);
        };
        t.question_ids.retain(|id| *id != question);
        Ok(true)
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("insert_question")?;
        inner.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn replace_question(&self, question: &Question) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("replace_question")?;
        match inner.questions.get_mut(&question.id) {
            Some(existing) => {
                *existing = question.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_question(&self, id: ObjectId) -> Result<Option<Question>> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip("find_question")?;
        Ok(inner.questions.get(&id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip("list_questions")?;
        Ok(inner.questions.values().cloned().collect())
    }

    async fn find_questions_by_topic(&self, topic: ObjectId) -> Result<Vec<Question>> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip("find_questions_by_topic")?;
        Ok(inner
            .questions
            .values()
            .filter(|q| q.topic_id == topic)
            .cloned()
            .collect())
    }

    async fn delete_question(&self, id: ObjectId) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.write("delete_question")?;
        Ok(inner.questions.remove(&id).is_some())
    }
}
