//! Process-wide resources: one database connection and one model client.

use std::{fmt, time::Duration};

use tracing::info;

use crate::{
    config::Config,
    error::{AppError, describe},
    llm::{LlmClient, LlmProvider},
    pipeline::Pipeline,
    store::{PostgresStore, connect_with_retry}
};

/// Why a session could not start.
#[derive(Debug)]
pub enum StartupError {
    /// Knowledge base unreachable
    Database(AppError),
    /// Model endpoint unreachable or model missing
    Model(AppError)
}

impl StartupError {
    /// What the user can do about it
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Database(_) => {
                "Check that PostgreSQL is running and that DATABASE_URL or DATABASE_PASSWORD is set."
            }
            Self::Model(_) => {
                "Check that the model endpoint is reachable; for Ollama run `ollama serve` and `ollama pull <model>`."
            }
        }
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "knowledge base unavailable: {}", describe(e)),
            Self::Model(e) => write!(f, "language model unavailable: {}", describe(e))
        }
    }
}

impl std::error::Error for StartupError {}

/// Connected store plus model client, alive for the whole process.
pub struct Session {
    config: Config,
    model:  LlmClient,
    store:  PostgresStore
}

impl Session {
    /// Connect the store and probe the model once
    ///
    /// The database is tried first, with the configured retry budget.
    pub async fn open(config: Config, provider: LlmProvider) -> Result<Self, StartupError> {
        let store =
            connect_with_retry(&config.database, &config.retry, config.pipeline.sample_rows)
                .await
                .map_err(StartupError::Database)?;
        let model = LlmClient::with_timeout(
            provider,
            config.retry.clone(),
            Duration::from_secs(config.llm.timeout_secs)
        );
        model.ping().await.map_err(StartupError::Model)?;
        info!(model = model.model_name(), "session opened");
        Ok(Self {
            config,
            model,
            store
        })
    }

    /// Turn runner borrowing this session's handles
    pub fn pipeline(&self) -> Pipeline<'_, LlmClient, PostgresStore> {
        Pipeline::new(&self.model, &self.store, self.config.pipeline.clone())
    }

    pub fn model(&self) -> &LlmClient {
        &self.model
    }

    pub fn store(&self) -> &PostgresStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// End the session; the database connection closes with the client
    pub fn close(self) {
        info!(connection_lost = self.store.is_closed(), "session closed");
    }
}
