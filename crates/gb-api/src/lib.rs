pub mod session;
pub mod store;

use std::time::{Duration, SystemTime};

use gb_assembler::build_document;
use gb_core::{AssembledDocument, GameBoxError};
use gb_rules::{calculate_advanced_score, calculate_game_score, AdvancedScoreSettings, PlayStats, ScoreConfigTable};
use gb_sandbox::DocumentEnvironment;

pub use gb_assembler::{BuildOptions, BuildOutput};
pub use session::{GameSession, RetryPolicy, SessionOptions, SessionStatus, MAX_RECORDED_ERRORS};
pub use store::{GamePatch, GameStore, InMemoryGameStore, NewGame, StoreError, StoredGame};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateGameOptions {
    pub title: Option<String>,
    pub game_type: String,
    pub ttl: Option<Duration>,
}

pub fn build_game_document(raw: &str, title: Option<&str>) -> BuildOutput {
    build_document(
        raw,
        &BuildOptions {
            title: title.map(str::to_string),
        },
    )
}

/// Builds `raw` and persists the resulting document.
pub fn create_game<S: GameStore>(
    store: &mut S,
    raw: &str,
    options: CreateGameOptions,
    now: SystemTime,
) -> Result<StoredGame, GameBoxError> {
    let output = build_game_document(raw, options.title.as_deref());
    let title = options
        .title
        .unwrap_or_else(|| gb_core::DEFAULT_GAME_TITLE.to_string());
    let stored = store.create(
        NewGame {
            title,
            game_type: options.game_type,
            html: output.document.into_string(),
            expires_at: options.ttl.map(|ttl| now + ttl),
        },
        now,
    )?;
    tracing::info!(id = %stored.id, format = %output.format, "game created");
    Ok(stored)
}

/// Mounts a stored game. Expired games are refused; documents that no longer
/// validate are mounted as degraded rather than rejected.
pub fn open_game<E: DocumentEnvironment>(
    env: E,
    container: &str,
    game: &StoredGame,
    options: SessionOptions,
    now: SystemTime,
) -> Result<GameSession<E>, GameBoxError> {
    if game.is_expired(now) {
        return Err(StoreError::Expired(game.id.clone()).into());
    }
    let document = AssembledDocument::new(game.html.as_str())
        .unwrap_or_else(|_| AssembledDocument::degraded(game.html.as_str()));
    GameSession::start(env, container, document, options)
}

pub fn score_play(
    table: &ScoreConfigTable,
    game_type: &str,
    play: &PlayStats,
    settings: Option<&AdvancedScoreSettings>,
) -> u64 {
    match settings {
        Some(settings) => calculate_advanced_score(table, game_type, play, settings),
        None => calculate_game_score(table, game_type, play),
    }
}
