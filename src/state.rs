use std::sync::Arc;

use sqlx::SqlitePool;

use crate::chat::ChatSessions;
use crate::config::AppConfig;
use crate::date_key::LocalCalendar;
use crate::db;
use crate::interpreter::{HttpInterpreter, Interpreter};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub interpreter: Arc<dyn Interpreter>,
    pub calendar: LocalCalendar,
    pub sessions: ChatSessions,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let db = db::connect(&config.database_url).await?;

        let interpreter = Arc::new(HttpInterpreter::new(
            &config.interpreter.url,
            config.interpreter.timeout,
        )?) as Arc<dyn Interpreter>;

        let calendar = match config.utc_offset {
            Some(offset) => LocalCalendar::new(offset),
            None => LocalCalendar::system(),
        };

        Ok(Self::from_parts(db, Arc::new(config), interpreter, calendar))
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        interpreter: Arc<dyn Interpreter>,
        calendar: LocalCalendar,
    ) -> Self {
        let sessions = ChatSessions::new(config.chat_session_ttl);
        Self {
            db,
            config,
            interpreter,
            calendar,
            sessions,
        }
    }

    /// Fresh in-memory database with default config; for tests and demos.
    pub async fn in_memory(
        interpreter: Arc<dyn Interpreter>,
        calendar: LocalCalendar,
    ) -> anyhow::Result<Self> {
        let config = AppConfig::from_env_with(|k| {
            (k == "DATABASE_URL").then(|| "sqlite::memory:".to_string())
        })?;
        let db = db::connect(&config.database_url).await?;
        Ok(Self::from_parts(db, Arc::new(config), interpreter, calendar))
    }
}

#[cfg(test)]
pub(crate) async fn test_state(interpreter: Arc<dyn Interpreter>) -> AppState {
    AppState::in_memory(interpreter, LocalCalendar::new(time::UtcOffset::UTC))
        .await
        .expect("in-memory state")
}
