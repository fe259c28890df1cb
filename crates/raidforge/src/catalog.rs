//! Read-only pokemon catalog and per-user ownership.
//!
//! Templates and inventories are owned by another service; the raid
//! server only reads them when a room is created or joined and when a
//! battle turn needs skill damage.

use std::collections::HashMap;
use std::future::Future;

use raidforge_protocol::{OwnedPokemon, PokemonId, PokemonTemplate, UserId};

/// The catalog backend failed.
#[derive(Debug, thiserror::Error)]
#[error("catalog unavailable: {0}")]
pub struct CatalogError(pub String);

/// Lookup of pokemon templates and the pokemon each user owns.
pub trait UserCatalog: Send + Sync + 'static {
    /// Every pokemon `user_id` owns, with their current skill loadouts.
    fn owned_pokemon(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<OwnedPokemon>, CatalogError>> + Send;

    /// A pokemon template with full skill definitions, or `None`.
    fn pokemon_with_skills(
        &self,
        pokemon_id: PokemonId,
    ) -> impl Future<Output = Result<Option<PokemonTemplate>, CatalogError>> + Send;
}

/// A fixed, in-process catalog for development and tests.
///
/// ```rust
/// use raidforge::MemoryCatalog;
/// use raidforge_protocol::{PokemonId, PokemonTemplate, UserId};
///
/// let catalog = MemoryCatalog::new()
///     .with_template(PokemonTemplate {
///         id: PokemonId(25),
///         name: "Pikachu".into(),
///         hp: 50,
///         skills: vec![],
///     })
///     .with_owned(UserId(1), PokemonId(25));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    templates: HashMap<PokemonId, PokemonTemplate>,
    owned: HashMap<UserId, Vec<OwnedPokemon>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: PokemonTemplate) -> Self {
        self.templates.insert(template.id, template);
        self
    }

    /// Gives `user_id` a fresh copy of a registered template. Unknown
    /// templates are ignored.
    pub fn with_owned(mut self, user_id: UserId, pokemon_id: PokemonId) -> Self {
        if let Some(template) = self.templates.get(&pokemon_id) {
            self.owned
                .entry(user_id)
                .or_default()
                .push(OwnedPokemon::from(template));
        }
        self
    }
}

impl UserCatalog for MemoryCatalog {
    async fn owned_pokemon(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OwnedPokemon>, CatalogError> {
        Ok(self.owned.get(&user_id).cloned().unwrap_or_default())
    }

    async fn pokemon_with_skills(
        &self,
        pokemon_id: PokemonId,
    ) -> Result<Option<PokemonTemplate>, CatalogError> {
        Ok(self.templates.get(&pokemon_id).cloned())
    }
}
