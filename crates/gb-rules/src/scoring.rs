use gb_core::ScoreStats;

use crate::score_config::{AdvancedScoreSettings, PlayStats, ScoreConfigTable};

/// Leaderboard score: `round(max(0, base + timeBonus - penalties) * 100)`.
///
/// `total_time` below one second counts as one. Non-finite inputs never yield
/// a negative or panicking result.
pub fn score(stats: &ScoreStats) -> u64 {
    let base = f64::from(stats.correct) * stats.base_unit;
    let time_bonus = stats.k * (stats.time_left / stats.total_time.max(1.0)) * base;
    let wrong_penalty = stats.w * f64::from(stats.wrong);
    let hint_penalty = stats.h * f64::from(stats.hints);
    let raw = base + time_bonus - wrong_penalty - hint_penalty;
    // Float to int casts saturate and map NaN to zero.
    (raw.max(0.0) * 100.0).round() as u64
}

pub fn calculate_game_score(table: &ScoreConfigTable, game_type: &str, play: &PlayStats) -> u64 {
    score(&table.get(game_type).stats_for(play))
}

pub fn calculate_advanced_score(
    table: &ScoreConfigTable,
    game_type: &str,
    play: &PlayStats,
    settings: &AdvancedScoreSettings,
) -> u64 {
    score(&settings.apply(table.get(game_type)).stats_for(play))
}
