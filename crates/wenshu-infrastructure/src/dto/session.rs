//! Session DTOs and migrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use version_migrate::{IntoDomain, MigratesTo, Versioned};
use wenshu_core::autofill::mode_from_transcript;
use wenshu_core::session::{Message, Session, SessionMode};

/// Session DTO V1.0.0, written before the interaction mode was persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct SessionV1_0_0 {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session DTO V1.1.0.
/// Added `mode` so autofill state survives a restart without reading the
/// transcript.
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.1.0")]
pub struct SessionV1_1_0 {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub mode: SessionMode,
}

/// V1.0.0 sessions get the mode their transcript implies.
impl MigratesTo<SessionV1_1_0> for SessionV1_0_0 {
    fn migrate(self) -> SessionV1_1_0 {
        let mode = mode_from_transcript(&self.messages);
        SessionV1_1_0 {
            id: self.id,
            title: self.title,
            messages: self.messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
            mode,
        }
    }
}

impl IntoDomain<Session> for SessionV1_1_0 {
    fn into_domain(self) -> Session {
        Session {
            id: self.id,
            title: self.title,
            messages: self.messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
            mode: Some(self.mode),
        }
    }
}

impl version_migrate::FromDomain<Session> for SessionV1_1_0 {
    fn from_domain(session: Session) -> Self {
        let mode = session
            .mode
            .unwrap_or_else(|| mode_from_transcript(&session.messages));
        SessionV1_1_0 {
            id: session.id,
            title: session.title,
            messages: session.messages,
            created_at: session.created_at,
            updated_at: session.updated_at,
            mode,
        }
    }
}

/// Builds the migrator for the `session` entity.
pub fn create_session_migrator()
-> Result<version_migrate::Migrator, version_migrate::MigrationError> {
    let mut migrator = version_migrate::Migrator::builder().build();

    // V1.0.0 -> V1.1.0 -> Session
    let session_path = version_migrate::Migrator::define("session")
        .from::<SessionV1_0_0>()
        .step::<SessionV1_1_0>()
        .into_with_save::<Session>();
    migrator.register(session_path)?;

    Ok(migrator)
}
