//! Training stores
//!
//! A [`TrainingStore`] keeps the material the SQL generator learns from: DDL,
//! free-form documentation and question/SQL example pairs. Every entry gets a
//! deterministic id derived from its content, so training the same text twice
//! is a no-op.

use crate::error::{AiError, AiResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of entries returned per lookup
pub const DEFAULT_N_RESULTS: usize = 10;

/// Kind of training material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingKind {
    Ddl,
    Documentation,
    Sql,
}

impl TrainingKind {
    /// Suffix appended to content ids of this kind
    pub fn id_suffix(self) -> &'static str {
        match self {
            TrainingKind::Ddl => "ddl",
            TrainingKind::Documentation => "doc",
            TrainingKind::Sql => "sql",
        }
    }

    /// Content-derived id: a UUID v5 of `content` plus the kind suffix
    pub fn content_id(self, content: &str) -> String {
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes());
        format!("{}-{}", uuid, self.id_suffix())
    }

    /// Kind encoded in an id produced by [`TrainingKind::content_id`]
    pub fn from_id(id: &str) -> Option<Self> {
        let (_, suffix) = id.rsplit_once('-')?;
        [TrainingKind::Ddl, TrainingKind::Documentation, TrainingKind::Sql]
            .into_iter()
            .find(|kind| kind.id_suffix() == suffix)
    }
}

/// A question and the SQL that answers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSql {
    pub question: String,
    pub sql: String,
}

/// One stored piece of training material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEntry {
    pub id: String,
    pub kind: TrainingKind,
    /// Only set for [`TrainingKind::Sql`] entries trained with a question
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub content: String,
}

/// Retrieval index the SQL generator is trained against.
///
/// Lookups take the user's question so that a vector-backed store can rank by
/// similarity; stores are free to ignore it.
#[async_trait]
pub trait TrainingStore: Send + Sync {
    async fn add_ddl(&self, ddl: &str) -> AiResult<String>;

    async fn add_documentation(&self, documentation: &str) -> AiResult<String>;

    async fn add_question_sql(&self, question: Option<&str>, sql: &str) -> AiResult<String>;

    async fn related_ddl(&self, question: &str) -> AiResult<Vec<String>>;

    async fn related_documentation(&self, question: &str) -> AiResult<Vec<String>>;

    /// Example pairs to show the model; entries trained without a question are skipped
    async fn similar_question_sql(&self, question: &str) -> AiResult<Vec<QuestionSql>>;

    /// Everything stored, in insertion order
    async fn training_data(&self) -> AiResult<Vec<TrainingEntry>>;

    /// Remove one entry, returning whether it existed
    async fn remove(&self, id: &str) -> AiResult<bool>;
}

/// Process-local training store.
///
/// Returns entries in insertion order, at most `n_results` per lookup.
#[derive(Debug)]
pub struct InMemoryTrainingStore {
    entries: RwLock<Vec<TrainingEntry>>,
    n_results: usize,
}

impl Default for InMemoryTrainingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTrainingStore {
    pub fn new() -> Self {
        Self::with_n_results(DEFAULT_N_RESULTS)
    }

    pub fn with_n_results(n_results: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            n_results,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn insert(&self, kind: TrainingKind, question: Option<&str>, content: &str) -> String {
        let id = match question {
            // The id covers both halves of the pair
            Some(question) => {
                let pair = serde_json::json!({ "question": question, "sql": content });
                kind.content_id(&pair.to_string())
            }
            None => kind.content_id(content),
        };

        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.id == id) {
            tracing::debug!(%id, "training entry already present");
        } else {
            entries.push(TrainingEntry {
                id: id.clone(),
                kind,
                question: question.map(str::to_string),
                content: content.to_string(),
            });
            tracing::debug!(%id, ?kind, "training entry added");
        }
        id
    }

    fn contents(&self, kind: TrainingKind) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .take(self.n_results)
            .map(|e| e.content.clone())
            .collect()
    }
}

fn non_empty<'a>(what: &str, text: &'a str) -> AiResult<&'a str> {
    if text.trim().is_empty() {
        Err(AiError::InvalidTraining(format!("{} must not be empty", what)))
    } else {
        Ok(text)
    }
}

#[async_trait]
impl TrainingStore for InMemoryTrainingStore {
    async fn add_ddl(&self, ddl: &str) -> AiResult<String> {
        let ddl = non_empty("DDL", ddl)?;
        Ok(self.insert(TrainingKind::Ddl, None, ddl))
    }

    async fn add_documentation(&self, documentation: &str) -> AiResult<String> {
        let documentation = non_empty("Documentation", documentation)?;
        Ok(self.insert(TrainingKind::Documentation, None, documentation))
    }

    async fn add_question_sql(&self, question: Option<&str>, sql: &str) -> AiResult<String> {
        let sql = non_empty("SQL", sql)?;
        let question = question.filter(|q| !q.trim().is_empty());
        Ok(self.insert(TrainingKind::Sql, question, sql))
    }

    async fn related_ddl(&self, _question: &str) -> AiResult<Vec<String>> {
        Ok(self.contents(TrainingKind::Ddl))
    }

    async fn related_documentation(&self, _question: &str) -> AiResult<Vec<String>> {
        Ok(self.contents(TrainingKind::Documentation))
    }

    async fn similar_question_sql(&self, _question: &str) -> AiResult<Vec<QuestionSql>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| e.kind == TrainingKind::Sql)
            .filter_map(|e| {
                e.question.as_ref().map(|question| QuestionSql {
                    question: question.clone(),
                    sql: e.content.clone(),
                })
            })
            .take(self.n_results)
            .collect())
    }

    async fn training_data(&self) -> AiResult<Vec<TrainingEntry>> {
        Ok(self.entries.read().clone())
    }

    async fn remove(&self, id: &str) -> AiResult<bool> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }
}
