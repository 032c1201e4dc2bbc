//! PersonaRepository trait definition.

use lectern_types::error::RepositoryError;
use lectern_types::persona::{Persona, PersonaId, PersonaKind};

/// Repository trait for persona persistence.
///
/// Implementations live in lectern-infra (e.g., `SqlitePersonaRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait PersonaRepository: Send + Sync {
    /// Insert a new persona.
    fn create(
        &self,
        persona: &Persona,
    ) -> impl std::future::Future<Output = Result<Persona, RepositoryError>> + Send;

    /// Get a persona by id. `Ok(None)` when it does not exist.
    fn get_by_id(
        &self,
        id: &PersonaId,
    ) -> impl std::future::Future<Output = Result<Option<Persona>, RepositoryError>> + Send;

    /// List personas, optionally restricted to one kind, oldest first.
    fn list(
        &self,
        kind: Option<PersonaKind>,
    ) -> impl std::future::Future<Output = Result<Vec<Persona>, RepositoryError>> + Send;

    /// Replace a persona. `RepositoryError::NotFound` when it does not exist.
    fn update(
        &self,
        persona: &Persona,
    ) -> impl std::future::Future<Output = Result<Persona, RepositoryError>> + Send;

    /// Delete a persona. `RepositoryError::NotFound` when it does not exist.
    fn delete(
        &self,
        id: &PersonaId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
