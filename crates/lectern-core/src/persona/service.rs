//! Persona service: validation and timestamps on top of the repository.

use chrono::Utc;
use tracing::info;

use lectern_types::error::PersonaError;
use lectern_types::persona::{Persona, PersonaDraft, PersonaId, PersonaKind};

use super::repository::PersonaRepository;

/// Longest accepted persona name, in characters.
const MAX_NAME_LEN: usize = 100;

/// Persona catalog operations.
///
/// Generic over `PersonaRepository` so lectern-core never depends on
/// lectern-infra.
pub struct PersonaService<R: PersonaRepository> {
    repo: R,
}

impl<R: PersonaRepository> PersonaService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Create a persona from a draft. The name is required.
    pub async fn create(&self, draft: PersonaDraft) -> Result<Persona, PersonaError> {
        let name = validate_name(&draft.name)?;
        let now = Utc::now();
        let persona = Persona {
            id: PersonaId::new(),
            name,
            kind: draft.kind,
            description: draft.description,
            config: draft.config,
            profile: draft.profile,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&persona).await?;
        info!(persona_id = %created.id, kind = %created.kind, "created persona");
        Ok(created)
    }

    /// Get a persona by id.
    pub async fn get(&self, id: &PersonaId) -> Result<Persona, PersonaError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(PersonaError::NotFound)
    }

    /// List personas, optionally filtered by kind.
    pub async fn list(&self, kind: Option<PersonaKind>) -> Result<Vec<Persona>, PersonaError> {
        Ok(self.repo.list(kind).await?)
    }

    /// Replace a persona's editable fields, keeping its id and creation time.
    pub async fn update(&self, id: &PersonaId, draft: PersonaDraft) -> Result<Persona, PersonaError> {
        let existing = self.get(id).await?;
        let name = validate_name(&draft.name)?;
        let persona = Persona {
            name,
            kind: draft.kind,
            description: draft.description,
            config: draft.config,
            profile: draft.profile,
            updated_at: Utc::now(),
            ..existing
        };

        let updated = self.repo.update(&persona).await?;
        info!(persona_id = %updated.id, "updated persona");
        Ok(updated)
    }

    pub async fn delete(&self, id: &PersonaId) -> Result<(), PersonaError> {
        self.repo.delete(id).await?;
        info!(persona_id = %id, "deleted persona");
        Ok(())
    }
}

fn validate_name(raw: &str) -> Result<String, PersonaError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PersonaError::InvalidName("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(PersonaError::InvalidName(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
