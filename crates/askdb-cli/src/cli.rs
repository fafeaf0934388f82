//! askdb - ask questions about a SQLite database in plain language

mod config;
mod demo;
mod logging;
mod output;

use anyhow::{Context, Result};
use askdb_ai::{InMemoryTrainingStore, OpenAiChat, OpenAiConfig, TextToSql, TrainingData};
use askdb_core::{ConnectionConfig, PrimaryKeyStyle, SchemaDocument};
use askdb_driver_sqlite::{ReflectOptions, SqliteConnection, SqliteDriver};
use clap::{Parser, Subcommand};
use config::{FileConfig, Overrides, Settings};
use logging::LogFormat;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "askdb", version, about)]
struct Cli {
    /// Configuration file (defaults to <config dir>/askdb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "ASKDB_DATABASE")]
    database: Option<PathBuf>,

    /// Chat model name
    #[arg(long, global = true, env = "ASKDB_MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    api_base: Option<String>,

    /// API key for the chat model
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the schema document of the database
    Schema {
        /// Render composite primary keys as a table constraint
        #[arg(long)]
        composite_pk: bool,

        /// Print the reflected tables as JSON instead of DDL
        #[arg(long)]
        json: bool,
    },

    /// Create and populate the demo tables
    Seed,

    /// Translate questions into SQL and run them
    Ask {
        /// Seed the demo tables first
        #[arg(long)]
        seed: bool,

        /// File with business documentation to train on
        #[arg(long)]
        documentation: Option<PathBuf>,

        /// File with an example query to train on
        #[arg(long)]
        example_sql: Option<PathBuf>,

        /// Render composite primary keys as a table constraint
        #[arg(long)]
        composite_pk: bool,

        /// Questions to ask, each answered in turn
        #[arg(required = true)]
        questions: Vec<String>,
    },

    /// Seed, train and answer the built-in demo questions
    Demo,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let composite_pk = match &self.command {
            Command::Schema { composite_pk, .. } | Command::Ask { composite_pk, .. } => *composite_pk,
            Command::Seed | Command::Demo => false,
        };

        Overrides {
            database: self.database.clone(),
            model: self.model.clone(),
            api_base: self.api_base.clone(),
            api_key: self.api_key.clone(),
            log_format: self.log_format,
            composite_pk,
        }
    }
}

type Agent = TextToSql<OpenAiChat, InMemoryTrainingStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = FileConfig::load_or_default(cli.config.as_deref())?;
    let settings = Settings::resolve(cli.overrides(), file);
    logging::init(settings.log_format)?;
    tracing::debug!(?settings, "settings resolved");

    match cli.command {
        Command::Schema { json, .. } => print_schema(&settings, json),
        Command::Seed => {
            let conn = open_database(&settings, false)?;
            demo::seed(&conn)
        }
        Command::Ask {
            seed,
            documentation,
            example_sql,
            questions,
            ..
        } => {
            let conn = open_database(&settings, false)?;
            if seed {
                demo::seed(&conn)?;
            }
            let schema = reflect(&conn, &settings)?;
            let agent = build_agent(&settings)?;
            train_schema(&agent, &schema).await?;

            if let Some(path) = documentation {
                let text = read_training_file(&path)?;
                agent.train(TrainingData::Documentation(text)).await?;
            }
            if let Some(path) = example_sql {
                let sql = read_training_file(&path)?;
                agent.train(TrainingData::Sql { question: None, sql }).await?;
            }

            answer_all(&agent, &conn, questions.iter().map(String::as_str)).await
        }
        Command::Demo => {
            let conn = open_database(&settings, false)?;
            demo::seed(&conn)?;
            let schema = reflect(&conn, &settings)?;
            println!("{}\n", schema);

            let agent = build_agent(&settings)?;
            train_schema(&agent, &schema).await?;
            agent
                .train(TrainingData::Documentation(demo::DOCUMENTATION.to_string()))
                .await?;
            agent
                .train(TrainingData::Sql {
                    question: None,
                    sql: demo::EXAMPLE_SQL.to_string(),
                })
                .await?;

            answer_all(&agent, &conn, demo::QUESTIONS).await
        }
    }
}

fn open_database(settings: &Settings, read_only: bool) -> Result<SqliteConnection> {
    let path = settings.database.to_string_lossy();
    let mut config = ConnectionConfig::new_sqlite(&path);
    if read_only {
        config = config.with_param("read_only", true);
    }
    SqliteDriver::new()
        .open(&config)
        .with_context(|| format!("Failed to open database {:?}", settings.database))
}

/// Reflect through the open connection so `~/` and `:memory:` resolve once
fn reflect(conn: &SqliteConnection, settings: &Settings) -> Result<SchemaDocument> {
    let options = ReflectOptions::default().with_primary_key_style(settings.primary_key_style);
    conn.reflect_schema(options)
        .with_context(|| format!("Failed to reflect schema of {}", conn.path()))
}

fn print_schema(settings: &Settings, json: bool) -> Result<()> {
    let conn = open_database(settings, true)?;
    let schema = reflect(&conn, settings)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else if schema.is_empty() {
        tracing::warn!(database = ?settings.database, "database has no user tables");
    } else {
        println!("{}", schema);
    }
    Ok(())
}

fn build_agent(settings: &Settings) -> Result<Agent> {
    let api_key = settings
        .api_key
        .clone()
        .context("No API key configured; set OPENAI_API_KEY or pass --api-key")?;
    let chat = OpenAiChat::new(OpenAiConfig {
        api_key,
        model: settings.model.clone(),
        temperature: settings.temperature,
        base_url: settings.api_base.clone(),
        max_tokens: None,
    })?;
    Ok(TextToSql::new(chat, InMemoryTrainingStore::new()))
}

async fn train_schema(agent: &Agent, schema: &SchemaDocument) -> Result<()> {
    if schema.is_empty() {
        tracing::warn!("database has no user tables; nothing to train on");
        return Ok(());
    }
    if schema.style() == PrimaryKeyStyle::PerColumn
        && schema.tables().iter().any(|t| t.has_composite_key())
    {
        tracing::info!("composite primary keys rendered per column; pass --composite-pk for valid DDL");
    }
    agent.train(TrainingData::from(schema)).await?;
    Ok(())
}

fn read_training_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

async fn answer_all<'a>(
    agent: &Agent,
    conn: &SqliteConnection,
    questions: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let mut failures = 0;
    for question in questions {
        let answer = agent
            .ask(conn, question)
            .await
            .with_context(|| format!("Failed to answer {:?}", question))?;
        if !answer.is_success() {
            failures += 1;
        }
        println!("{}", output::render_answer(&answer));
    }

    if failures > 0 {
        tracing::warn!(failures, "some generated queries failed to execute");
    }
    Ok(())
}
