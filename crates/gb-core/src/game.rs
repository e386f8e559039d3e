use serde::{Deserialize, Serialize};

use crate::error::GameBoxError;

/// One prize slice of a wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub label: String,
    #[serde(default)]
    pub points: f64,
}

impl Segment {
    pub fn new(label: impl Into<String>, points: f64) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

/// Ordered, non-empty list of wheel segments. Index 0 starts at the pointer
/// reference angle and the rest follow clockwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SegmentSet {
    segments: Vec<Segment>,
}

impl SegmentSet {
    pub fn new(segments: Vec<Segment>) -> Result<Self, GameBoxError> {
        if segments.is_empty() {
            return Err(GameBoxError::new(
                "SEGMENTS_EMPTY",
                "A wheel needs at least one segment.",
            ));
        }
        if let Some(bad) = segments.iter().find(|segment| !segment.points.is_finite()) {
            return Err(GameBoxError::new(
                "SEGMENTS_POINTS_INVALID",
                format!("Segment \"{}\" has non-finite points.", bad.label),
            ));
        }
        Ok(Self { segments })
    }

    pub fn from_labels<I, S>(labels: I) -> Result<Self, GameBoxError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            labels
                .into_iter()
                .map(|label| Segment::new(label, 0.0))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    // Never empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn first(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }
}

impl<'de> Deserialize<'de> for SegmentSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let segments = Vec::<Segment>::deserialize(deserializer)?;
        SegmentSet::new(segments).map_err(serde::de::Error::custom)
    }
}

/// Raw play statistics plus the four scoring coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStats {
    pub correct: u32,
    pub wrong: u32,
    pub hints: u32,
    pub base_unit: f64,
    pub time_left: f64,
    pub total_time: f64,
    pub k: f64,
    pub w: f64,
    pub h: f64,
}
