use std::collections::BTreeMap;
use std::time::SystemTime;

use gb_core::GameBoxError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("game \"{0}\" was not found")]
    NotFound(String),
    #[error("game \"{0}\" has expired")]
    Expired(String),
    #[error("invalid game record: {0}")]
    Invalid(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STORE_NOT_FOUND",
            Self::Expired(_) => "STORE_EXPIRED",
            Self::Invalid(_) => "STORE_INVALID",
            Self::Backend(_) => "STORE_BACKEND",
        }
    }
}

impl From<StoreError> for GameBoxError {
    fn from(error: StoreError) -> Self {
        GameBoxError::new(error.code(), error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGame {
    pub id: String,
    pub title: String,
    pub game_type: String,
    pub html: String,
    pub created_at: SystemTime,
    pub expires_at: Option<SystemTime>,
}

impl StoredGame {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub title: String,
    pub game_type: String,
    pub html: String,
    pub expires_at: Option<SystemTime>,
}

/// Partial update; `None` leaves a field untouched. `expires_at:
/// Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamePatch {
    pub title: Option<String>,
    pub html: Option<String>,
    pub expires_at: Option<Option<SystemTime>>,
}

/// Persistence for built games. Expiry is reported, not enforced: callers
/// check [`StoredGame::is_expired`] against their own clock.
pub trait GameStore {
    fn create(&mut self, game: NewGame, now: SystemTime) -> Result<StoredGame, StoreError>;
    fn get(&self, id: &str) -> Result<StoredGame, StoreError>;
    fn update(&mut self, id: &str, patch: GamePatch) -> Result<StoredGame, StoreError>;
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    next_id: u64,
    games: BTreeMap<String, StoredGame>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl GameStore for InMemoryGameStore {
    fn create(&mut self, game: NewGame, now: SystemTime) -> Result<StoredGame, StoreError> {
        if game.html.trim().is_empty() {
            return Err(StoreError::Invalid("html is empty".to_string()));
        }
        self.next_id += 1;
        let stored = StoredGame {
            id: format!("game-{}", self.next_id),
            title: game.title,
            game_type: game.game_type,
            html: game.html,
            created_at: now,
            expires_at: game.expires_at,
        };
        self.games.insert(stored.id.clone(), stored.clone());
        tracing::debug!(id = %stored.id, "game stored");
        Ok(stored)
    }

    fn get(&self, id: &str) -> Result<StoredGame, StoreError> {
        self.games
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn update(&mut self, id: &str, patch: GamePatch) -> Result<StoredGame, StoreError> {
        if patch.html.as_deref().is_some_and(|html| html.trim().is_empty()) {
            return Err(StoreError::Invalid("html is empty".to_string()));
        }
        let game = self
            .games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(title) = patch.title {
            game.title = title;
        }
        if let Some(html) = patch.html {
            game.html = html;
        }
        if let Some(expires_at) = patch.expires_at {
            game.expires_at = expires_at;
        }
        Ok(game.clone())
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.games
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
