//! Question to SQL to result

use crate::chat::ChatModel;
use crate::error::{AiError, AiResult};
use crate::prompt::{PromptBuilder, extract_sql};
use crate::store::TrainingStore;
use askdb_core::{AskdbError, Connection, QueryResult, SchemaDocument};

/// Material to train the generator with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingData {
    /// `CREATE TABLE` statements, usually a whole schema document
    Ddl(String),
    /// Free-form business knowledge about the data
    Documentation(String),
    /// An example query, optionally with the question it answers.
    ///
    /// Without a question the chat model is asked to phrase one.
    Sql {
        question: Option<String>,
        sql: String,
    },
}

impl From<&SchemaDocument> for TrainingData {
    fn from(document: &SchemaDocument) -> Self {
        TrainingData::Ddl(document.render())
    }
}

/// Outcome of asking one question
#[derive(Debug)]
pub struct Answer {
    pub question: String,
    pub sql: String,
    /// Execution failure is reported here instead of aborting the caller
    pub outcome: Result<QueryResult, AskdbError>,
}

impl Answer {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Text-to-SQL generator built from a chat model and a training store
pub struct TextToSql<M, S> {
    chat: M,
    store: S,
    prompts: PromptBuilder,
}

impl<M: ChatModel, S: TrainingStore> TextToSql<M, S> {
    pub fn new(chat: M, store: S) -> Self {
        Self {
            chat,
            store,
            prompts: PromptBuilder::default(),
        }
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn chat(&self) -> &M {
        &self.chat
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add training material, returning its store id
    #[tracing::instrument(skip_all)]
    pub async fn train(&self, data: TrainingData) -> AiResult<String> {
        let id = match data {
            TrainingData::Ddl(ddl) => {
                reject_empty("DDL", &ddl)?;
                self.store.add_ddl(&ddl).await?
            }
            TrainingData::Documentation(documentation) => {
                reject_empty("Documentation", &documentation)?;
                self.store.add_documentation(&documentation).await?
            }
            TrainingData::Sql { question, sql } => {
                reject_empty("SQL", &sql)?;
                let question = match question.filter(|q| !q.trim().is_empty()) {
                    Some(question) => question,
                    None => self.generate_question(&sql).await?,
                };
                self.store.add_question_sql(Some(&question), &sql).await?
            }
        };
        tracing::info!(%id, "trained");
        Ok(id)
    }

    /// Ask the model which question `sql` answers
    pub async fn generate_question(&self, sql: &str) -> AiResult<String> {
        let reply = self.chat.complete(&self.prompts.question_prompt(sql)).await?;
        let question = reply.trim();
        if question.is_empty() {
            return Err(AiError::InvalidResponse(
                "Model returned an empty question".to_string(),
            ));
        }
        Ok(question.to_string())
    }

    /// Translate `question` into SQL using the trained material
    #[tracing::instrument(skip(self))]
    pub async fn generate_sql(&self, question: &str) -> AiResult<String> {
        let examples = self.store.similar_question_sql(question).await?;
        let ddl = self.store.related_ddl(question).await?;
        let documentation = self.store.related_documentation(question).await?;
        tracing::debug!(
            examples = examples.len(),
            ddl = ddl.len(),
            documentation = documentation.len(),
            "building prompt"
        );

        let messages = self
            .prompts
            .sql_prompt(question, &ddl, &documentation, &examples);
        let reply = self.chat.complete(&messages).await?;

        let sql = extract_sql(&reply);
        tracing::info!(%sql, "generated SQL");
        Ok(sql)
    }

    /// Execute `sql` on `conn`
    pub async fn run_sql(&self, conn: &dyn Connection, sql: &str) -> askdb_core::Result<QueryResult> {
        conn.query(sql, &[]).await
    }

    /// Generate SQL for `question` and run it.
    ///
    /// Chat and store failures are returned as errors; a query that fails to
    /// execute is reported in [`Answer::outcome`].
    pub async fn ask(&self, conn: &dyn Connection, question: &str) -> AiResult<Answer> {
        let sql = self.generate_sql(question).await?;
        let outcome = self.run_sql(conn, &sql).await;
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "generated SQL failed to execute");
        }

        Ok(Answer {
            question: question.to_string(),
            sql,
            outcome,
        })
    }
}

fn reject_empty(what: &str, text: &str) -> AiResult<()> {
    if text.trim().is_empty() {
        return Err(AiError::InvalidTraining(format!("{} must not be empty", what)));
    }
    Ok(())
}
