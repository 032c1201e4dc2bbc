//! SQLite persona repository.
//!
//! Implements `PersonaRepository` from `lectern-core`. `config` and
//! `profile` are stored as JSON text columns.

use chrono::{DateTime, Utc};
use sqlx::Row;

use lectern_core::persona::repository::PersonaRepository;
use lectern_types::error::RepositoryError;
use lectern_types::persona::{Persona, PersonaConfig, PersonaId, PersonaKind, PersonaProfile};

use super::pool::DatabasePool;

pub struct SqlitePersonaRepository {
    pool: DatabasePool,
}

impl SqlitePersonaRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct PersonaRow {
    id: String,
    name: String,
    kind: String,
    description: String,
    config: String,
    profile: String,
    created_at: String,
    updated_at: String,
}

impl PersonaRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            description: row.try_get("description")?,
            config: row.try_get("config")?,
            profile: row.try_get("profile")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_persona(self) -> Result<Persona, RepositoryError> {
        let id = self
            .id
            .parse::<PersonaId>()
            .map_err(|e| RepositoryError::Query(format!("invalid persona id: {e}")))?;
        // Tags written by a newer build read back as unspecified.
        let kind = self.kind.parse().unwrap_or(PersonaKind::Unspecified);
        let config: PersonaConfig = serde_json::from_str(&self.config)
            .map_err(|e| RepositoryError::Query(format!("invalid persona config JSON: {e}")))?;
        let profile: PersonaProfile = serde_json::from_str(&self.profile)
            .map_err(|e| RepositoryError::Query(format!("invalid persona profile JSON: {e}")))?;

        Ok(Persona {
            id,
            name: self.name,
            kind,
            description: self.description,
            config,
            profile,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(e.to_string()))
}

impl PersonaRepository for SqlitePersonaRepository {
    async fn create(&self, persona: &Persona) -> Result<Persona, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO personas (id, name, kind, description, config, profile, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(persona.id.to_string())
        .bind(&persona.name)
        .bind(persona.kind.to_string())
        .bind(&persona.description)
        .bind(to_json(&persona.config)?)
        .bind(to_json(&persona.profile)?)
        .bind(persona.created_at.to_rfc3339())
        .bind(persona.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(persona.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("persona '{}' already exists", persona.id)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get_by_id(&self, id: &PersonaId) -> Result<Option<Persona>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM personas WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            PersonaRow::from_row(&row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_persona()
        })
        .transpose()
    }

    async fn list(&self, kind: Option<PersonaKind>) -> Result<Vec<Persona>, RepositoryError> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query("SELECT * FROM personas WHERE kind = ? ORDER BY created_at ASC, id ASC")
                    .bind(kind.to_string())
                    .fetch_all(&self.pool.reader)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM personas ORDER BY created_at ASC, id ASC")
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                PersonaRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_persona()
            })
            .collect()
    }

    async fn update(&self, persona: &Persona) -> Result<Persona, RepositoryError> {
        let result = sqlx::query(
            "UPDATE personas SET name = ?, kind = ?, description = ?, config = ?, profile = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&persona.name)
        .bind(persona.kind.to_string())
        .bind(&persona.description)
        .bind(to_json(&persona.config)?)
        .bind(to_json(&persona.profile)?)
        .bind(persona.updated_at.to_rfc3339())
        .bind(persona.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(persona.clone())
    }

    async fn delete(&self, id: &PersonaId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM personas WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
