//! Text-to-SQL orchestration
//!
//! Two collaborators are injected independently into [`TextToSql`]:
//!
//! - a [`ChatModel`] that turns a prompt into a completion (OpenAI, or a test double)
//! - a [`TrainingStore`] that keeps DDL, documentation and example SQL and hands
//!   back the entries relevant to a question
//!
//! Neither knows about the other; the orchestrator builds prompts from what the
//! store returns and runs the generated SQL through an `askdb_core::Connection`.

mod chat;
mod error;
pub mod prompt;
mod store;
mod text_to_sql;

pub use chat::{
    ChatMessage, ChatModel, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OpenAiChat, OpenAiConfig,
    ProviderMetadata, Role,
};
pub use error::{AiError, AiResult};
pub use store::{InMemoryTrainingStore, QuestionSql, TrainingEntry, TrainingKind, TrainingStore};
pub use text_to_sql::{Answer, TextToSql, TrainingData};
