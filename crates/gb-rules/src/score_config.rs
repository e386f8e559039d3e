use std::collections::BTreeMap;

use gb_core::{GameBoxError, ScoreStats};
use serde::{Deserialize, Serialize};

pub const FALLBACK_GAME_TYPE: &str = "quiz";

/// Scoring coefficients for one game type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameScoreConfig {
    pub base_unit: f64,
    pub time_weight: f64,
    pub wrong_penalty: f64,
    pub hint_penalty: f64,
}

impl GameScoreConfig {
    pub const fn new(base_unit: f64, time_weight: f64, wrong_penalty: f64, hint_penalty: f64) -> Self {
        Self {
            base_unit,
            time_weight,
            wrong_penalty,
            hint_penalty,
        }
    }

    pub fn stats_for(&self, play: &PlayStats) -> ScoreStats {
        ScoreStats {
            correct: play.correct,
            wrong: play.wrong,
            hints: play.hints,
            base_unit: self.base_unit,
            time_left: play.time_left,
            total_time: play.total_time,
            k: self.time_weight,
            w: self.wrong_penalty,
            h: self.hint_penalty,
        }
    }

    fn validate(&self, game_type: &str) -> Result<(), GameBoxError> {
        let coefficients = [
            ("baseUnit", self.base_unit),
            ("timeWeight", self.time_weight),
            ("wrongPenalty", self.wrong_penalty),
            ("hintPenalty", self.hint_penalty),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(GameBoxError::new(
                    "CONFIG_INVALID_COEFFICIENT",
                    format!(
                        "Score config \"{}\" has invalid {}: {}.",
                        game_type, name, value
                    ),
                ));
            }
        }
        Ok(())
    }
}

const QUIZ_CONFIG: GameScoreConfig = GameScoreConfig::new(1.0, 0.7, 0.25, 0.0);

const DEFAULT_CONFIGS: &[(&str, GameScoreConfig)] = &[
    ("quiz", QUIZ_CONFIG),
    ("trueFalse", GameScoreConfig::new(1.0, 0.7, 0.25, 0.0)),
    ("ordering", GameScoreConfig::new(1.0, 0.5, 0.0, 0.2)),
    ("matching", GameScoreConfig::new(1.0, 0.6, 0.1, 0.0)),
    ("memory", GameScoreConfig::new(2.0, 0.8, 0.2, 0.15)),
    ("wordSearch", GameScoreConfig::new(1.0, 0.6, 0.1, 0.0)),
    ("flashcards", GameScoreConfig::new(1.0, 0.0, 0.0, 0.0)),
];

/// Per-game-type coefficients. Lookups for unknown types use the quiz entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreConfigTable {
    configs: BTreeMap<String, GameScoreConfig>,
}

impl Default for ScoreConfigTable {
    fn default() -> Self {
        Self {
            configs: DEFAULT_CONFIGS
                .iter()
                .map(|(game_type, config)| ((*game_type).to_string(), *config))
                .collect(),
        }
    }
}

impl ScoreConfigTable {
    /// Reads a JSON object of `gameType -> coefficients` and lays it over the
    /// built-in table.
    pub fn from_json(text: &str) -> Result<Self, GameBoxError> {
        let overrides: BTreeMap<String, GameScoreConfig> =
            serde_json::from_str(text).map_err(|error| {
                GameBoxError::new(
                    "CONFIG_PARSE_ERROR",
                    format!("Failed to parse score config: {}", error),
                )
            })?;

        let mut table = Self::default();
        for (game_type, config) in overrides {
            table.insert(game_type, config)?;
        }
        Ok(table)
    }

    pub fn insert(
        &mut self,
        game_type: impl Into<String>,
        config: GameScoreConfig,
    ) -> Result<(), GameBoxError> {
        let game_type = game_type.into();
        config.validate(&game_type)?;
        self.configs.insert(game_type, config);
        Ok(())
    }

    pub fn get(&self, game_type: &str) -> GameScoreConfig {
        self.configs
            .get(game_type)
            .or_else(|| self.configs.get(FALLBACK_GAME_TYPE))
            .copied()
            .unwrap_or(QUIZ_CONFIG)
    }

    pub fn contains(&self, game_type: &str) -> bool {
        self.configs.contains_key(game_type)
    }

    pub fn game_types(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }
}

/// What a player did, independent of the game type's coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayStats {
    pub correct: u32,
    pub wrong: u32,
    pub hints: u32,
    pub time_left: f64,
    pub total_time: f64,
}

/// Per-game switches and coefficient overrides applied before scoring. An
/// absent switch is off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedScoreSettings {
    pub time_bonus: bool,
    pub negative_marking: bool,
    pub time_weight: Option<f64>,
    pub wrong_penalty: Option<f64>,
    pub hint_penalty: Option<f64>,
}

impl AdvancedScoreSettings {
    pub fn apply(&self, config: GameScoreConfig) -> GameScoreConfig {
        GameScoreConfig {
            base_unit: config.base_unit,
            time_weight: if self.time_bonus {
                self.time_weight.unwrap_or(config.time_weight)
            } else {
                0.0
            },
            wrong_penalty: if self.negative_marking {
                self.wrong_penalty.unwrap_or(config.wrong_penalty)
            } else {
                0.0
            },
            hint_penalty: self.hint_penalty.unwrap_or(config.hint_penalty),
        }
    }
}
