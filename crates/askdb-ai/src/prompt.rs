//! Prompt assembly and SQL extraction

use crate::chat::ChatMessage;
use crate::store::QuestionSql;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_DIALECT: &str = "SQLite";

/// Rough prompt budget, counted in characters (about four per token)
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 14_000 * 4;

static SQL_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```sql\b\s*(.*?)```").expect("valid regex"));

static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(.*?)```").expect("valid regex"));

static BARE_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\b((?:WITH|SELECT)\b.*?)(?:;|\z)").expect("valid regex"));

/// Builds the conversations sent to the chat model
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    dialect: String,
    max_context_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DIALECT)
    }
}

impl PromptBuilder {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// Conversation asking for SQL that answers `question`.
    ///
    /// DDL and documentation go into the system message until the context
    /// budget is spent; the remaining items are dropped. Example pairs become
    /// prior user/assistant turns and the question comes last.
    pub fn sql_prompt(
        &self,
        question: &str,
        ddl: &[String],
        documentation: &[String],
        examples: &[QuestionSql],
    ) -> Vec<ChatMessage> {
        let mut system = format!(
            "You are a {dialect} expert. Write one SQL query that answers the user's question. \
             Base the query only on the context below and follow the response guidelines.\n",
            dialect = self.dialect
        );

        let mut budget = self.max_context_chars.saturating_sub(system.len());
        append_section(&mut system, "===Tables", ddl, &mut budget);
        append_section(&mut system, "===Additional Context", documentation, &mut budget);

        system.push_str(&format!(
            "\n===Response Guidelines\n\
             1. If the context is sufficient, answer with a valid SQL query and no explanation.\n\
             2. If the context is insufficient, explain why the query cannot be written.\n\
             3. Use the most relevant tables.\n\
             4. If the question was asked and answered before, repeat that answer exactly.\n\
             5. The query must be {dialect}-compliant, executable and free of syntax errors.\n",
            dialect = self.dialect
        ));

        let mut messages = Vec::with_capacity(examples.len() * 2 + 2);
        messages.push(ChatMessage::system(system));
        for example in examples {
            messages.push(ChatMessage::user(&example.question));
            messages.push(ChatMessage::assistant(&example.sql));
        }
        messages.push(ChatMessage::user(question));
        messages
    }

    /// Conversation asking which business question `sql` answers
    pub fn question_prompt(&self, sql: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(
                "The user will give you a SQL query. Reply with the business question the query \
                 answers, without any explanation. Do not mention table names in the question.",
            ),
            ChatMessage::user(sql),
        ]
    }
}

fn append_section(prompt: &mut String, heading: &str, items: &[String], budget: &mut usize) {
    if items.is_empty() {
        return;
    }

    let mut section = format!("\n{}\n\n", heading);
    let mut included = 0;
    for item in items {
        let needed = item.len() + 2;
        if needed + section.len() > *budget {
            tracing::debug!(heading, skipped = items.len() - included, "prompt budget exhausted");
            break;
        }
        section.push_str(item);
        section.push_str("\n\n");
        included += 1;
    }

    if included > 0 {
        *budget -= section.len();
        prompt.push_str(&section);
    }
}

/// Pull the SQL statement out of a model reply.
///
/// Tries, in order: the first ```` ```sql ```` block, the first fenced block of
/// any kind, the first statement starting with `SELECT` or `WITH`. Falls back
/// to the trimmed reply.
pub fn extract_sql(reply: &str) -> String {
    for pattern in [&*SQL_FENCE, &*ANY_FENCE, &*BARE_STATEMENT] {
        if let Some(sql) = pattern
            .captures(reply)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|sql| !sql.is_empty())
        {
            return sql.to_string();
        }
    }
    reply.trim().to_string()
}
