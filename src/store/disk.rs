use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cnidarium::{Snapshot, StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{EntityStore, TopicRemoval};
use crate::catalog::types::{ObjectId, Question, Topic};

// Key prefixes, no trailing slashes (cnidarium convention)
const TOPIC_PREFIX: &str = "catalog/topics";
const QUESTION_PREFIX: &str = "catalog/questions";
const MEMBER_PREFIX: &str = "catalog/members";

fn topic_key(id: ObjectId) -> String {
    format!("{}/{}", TOPIC_PREFIX, id)
}
fn question_key(id: ObjectId) -> String {
    format!("{}/{}", QUESTION_PREFIX, id)
}
fn member_key(topic: ObjectId, question: ObjectId) -> String {
    format!("{}/{}/{}", MEMBER_PREFIX, topic, question)
}

/// cnidarium-backed store. Each call commits its own delta, so a commit never
/// spans more than one document (plus that document's `topic_id` index entry).
pub struct DiskStore {
    storage: Storage,
    /// Serializes read-modify-write commits. cnidarium rejects a delta built on
    /// an outdated snapshot, and list push/pull must not interleave.
    write_lock: Mutex<()>,
}

impl DiskStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![
            TOPIC_PREFIX.to_string(),
            QUESTION_PREFIX.to_string(),
            MEMBER_PREFIX.to_string(),
        ];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self {
            storage,
            write_lock: Mutex::new(()),
        })
    }

    async fn get_doc<T: DeserializeOwned>(snapshot: &Snapshot, key: &str) -> Result<Option<T>> {
        let Some(bytes) = snapshot.get_raw(key).await? else {
            return Ok(None);
        };
        let doc = serde_json::from_slice(&bytes).with_context(|| format!("decode {}", key))?;
        Ok(Some(doc))
    }

    /// Decode every document under `prefix`, in key order. An undecodable
    /// entry fails the whole scan: callers such as fsck must never act on a
    /// partial view of a collection.
    async fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let snapshot = self.storage.latest_snapshot();
        let mut stream = snapshot.prefix_raw(&format!("{}/", prefix));
        let mut results = Vec::new();

        while let Some(entry) = stream.next().await {
            let (key, value) = entry.context("scan stream")?;
            let doc = serde_json::from_slice::<T>(&value)
                .with_context(|| format!("decode {}", key))?;
            results.push(doc);
        }

        Ok(results)
    }

    async fn commit(&self, delta: StateDelta<Snapshot>) -> Result<()> {
        self.storage
            .commit(delta)
            .await
            .context("cnidarium commit failed")?;
        Ok(())
    }

    fn encode<T: Serialize>(doc: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(doc).context("serialize document")
    }

    /// Load a topic, apply `f`, and write it back, all under the write lock.
    async fn modify_topic<F>(&self, id: ObjectId, f: F) -> Result<Option<Topic>>
    where
        F: FnOnce(&mut Topic) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.storage.latest_snapshot();
        let key = topic_key(id);
        let Some(mut topic) = Self::get_doc::<Topic>(&snapshot, &key).await? else {
            return Ok(None);
        };
        f(&mut topic);

        let mut delta = StateDelta::new(snapshot);
        delta.put_raw(key, Self::encode(&topic)?);
        self.commit(delta).await?;
        Ok(Some(topic))
    }
}

#[async_trait]
impl EntityStore for DiskStore {
    async fn insert_topic(&self, topic: &Topic) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        delta.put_raw(topic_key(topic.id), Self::encode(topic)?);
        self.commit(delta).await?;
        debug!(topic_id = %topic.id, "topic stored");
        Ok(())
    }

    async fn find_topic(&self, id: ObjectId) -> Result<Option<Topic>> {
        let snapshot = self.storage.latest_snapshot();
        Self::get_doc(&snapshot, &topic_key(id)).await
    }

    async fn list_topics(&self) -> Result<Vec<Topic>> {
        self.scan(TOPIC_PREFIX).await
    }

    async fn set_topic_data_structure(
        &self,
        id: ObjectId,
        data_structure: &str,
    ) -> Result<Option<Topic>> {
        let data_structure = data_structure.to_string();
        self.modify_topic(id, move |topic| topic.data_structure = data_structure)
            .await
    }

    async fn delete_topic_if_empty(&self, id: ObjectId) -> Result<TopicRemoval> {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.storage.latest_snapshot();
        let key = topic_key(id);
        let Some(topic) = Self::get_doc::<Topic>(&snapshot, &key).await? else {
            return Ok(TopicRemoval::Missing);
        };
        if !topic.question_ids.is_empty() {
            return Ok(TopicRemoval::NotEmpty);
        }

        let mut delta = StateDelta::new(snapshot);
        delta.delete(key);
        self.commit(delta).await?;
        debug!(topic_id = %id, "topic deleted");
        Ok(TopicRemoval::Deleted)
    }

    async fn push_question_id(&self, topic: ObjectId, question: ObjectId) -> Result<bool> {
        let updated = self
            .modify_topic(topic, move |t| {
                if !t.question_ids.contains(&question) {
                    t.question_ids.push(question);
                }
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn pull_question_id(&self, topic: ObjectId, question: ObjectId) -> Result<bool> {
        let updated = self
            .modify_topic(topic, move |t| t.question_ids.retain(|id| *id != question))
            .await?;
        Ok(updated.is_some())
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        delta.put_raw(question_key(question.id), Self::encode(question)?);
        // Index entry for the topic_id filter; presence is the index
        delta.put_raw(member_key(question.topic_id, question.id), vec![]);
        self.commit(delta).await?;
        debug!(question_id = %question.id, topic_id = %question.topic_id, "question stored");
        Ok(())
    }

    async fn replace_question(&self, question: &Question) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.storage.latest_snapshot();
        let key = question_key(question.id);
        let Some(existing) = Self::get_doc::<Question>(&snapshot, &key).await? else {
            return Ok(false);
        };

        let mut delta = StateDelta::new(snapshot);
        if existing.topic_id != question.topic_id {
            delta.delete(member_key(existing.topic_id, existing.id));
            delta.put_raw(member_key(question.topic_id, question.id), vec![]);
        }
        delta.put_raw(key, Self::encode(question)?);
        self.commit(delta).await?;
        Ok(true)
    }

    async fn find_question(&self, id: ObjectId) -> Result<Option<Question>> {
        let snapshot = self.storage.latest_snapshot();
        Self::get_doc(&snapshot, &question_key(id)).await
    }

    async fn list_questions(&self) -> Result<Vec<Question>> {
        self.scan(QUESTION_PREFIX).await
    }

    async fn find_questions_by_topic(&self, topic: ObjectId) -> Result<Vec<Question>> {
        let snapshot = self.storage.latest_snapshot();
        let prefix = format!("{}/{}/", MEMBER_PREFIX, topic);
        let mut stream = snapshot.prefix_raw(&prefix);
        let mut ids = Vec::new();

        while let Some(entry) = stream.next().await {
            let (key, _) = entry.context("member index stream")?;
            // Key format: "catalog/members/{topic_id}/{question_id}"
            match key.strip_prefix(&prefix).map(str::parse::<ObjectId>) {
                Some(Ok(id)) => ids.push(id),
                _ => warn!(key = %key, "Malformed member index key"),
            }
        }

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match Self::get_doc::<Question>(&snapshot, &question_key(id)).await? {
                Some(question) => results.push(question),
                None => warn!(question_id = %id, "Member index points at a missing question"),
            }
        }
        Ok(results)
    }

    async fn delete_question(&self, id: ObjectId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.storage.latest_snapshot();
        let key = question_key(id);
        let Some(question) = Self::get_doc::<Question>(&snapshot, &key).await? else {
            return Ok(false);
        };

        let mut delta = StateDelta::new(snapshot);
        delta.delete(key);
        delta.delete(member_key(question.topic_id, id));
        self.commit(delta).await?;
        debug!(question_id = %id, "question deleted");
        Ok(true)
    }
}
