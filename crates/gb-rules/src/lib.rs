pub mod score_config;
pub mod scoring;
pub mod wheel;

pub use score_config::{AdvancedScoreSettings, GameScoreConfig, PlayStats, ScoreConfigTable};
pub use scoring::{calculate_advanced_score, calculate_game_score, score};
pub use wheel::{
    landing_angle, resolve, resolve_degrees, resolve_index, segment_arc, segment_width,
    SegmentArc, POINTER_ANGLE,
};
