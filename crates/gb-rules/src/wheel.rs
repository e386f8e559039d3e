//! Wheel outcome resolution.
//!
//! Segment `i` occupies the local arc `[i * width, (i + 1) * width)` of the
//! wheel. After the wheel has rotated by `final_angle`, the local angle under
//! the fixed pointer decides the winner.

use std::f64::consts::{PI, TAU};

use gb_core::{GameBoxError, Segment, SegmentSet};

/// Pointer position in the wheel's frame ("up" on screen).
pub const POINTER_ANGLE: f64 = 1.5 * PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentArc {
    pub start: f64,
    pub end: f64,
}

impl SegmentArc {
    pub fn mid(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

pub fn segment_width(segment_count: usize) -> f64 {
    TAU / segment_count.max(1) as f64
}

/// Index of the segment under the pointer. Boundaries resolve to the lower
/// index; non-finite angles and rounding overflow fall back to 0.
pub fn resolve_index(final_angle: f64, segment_count: usize) -> usize {
    if segment_count == 0 {
        return 0;
    }
    if !final_angle.is_finite() {
        tracing::warn!(final_angle, "non-finite wheel angle; defaulting to first segment");
        return 0;
    }

    let normalized = final_angle.rem_euclid(TAU);
    let relative = (POINTER_ANGLE - normalized).rem_euclid(TAU);
    let index = (relative / segment_width(segment_count)).floor();
    if index < 0.0 || index >= segment_count as f64 {
        tracing::warn!(
            final_angle,
            index,
            segment_count,
            "wheel index out of range; defaulting to first segment"
        );
        return 0;
    }
    index as usize
}

pub fn resolve(final_angle: f64, segments: &SegmentSet) -> &Segment {
    let index = resolve_index(final_angle, segments.len());
    segments.get(index).unwrap_or_else(|| segments.first())
}

pub fn resolve_degrees(final_degrees: f64, segments: &SegmentSet) -> &Segment {
    resolve(final_degrees.to_radians(), segments)
}

pub fn segment_arc(segments: &SegmentSet, index: usize) -> Result<SegmentArc, GameBoxError> {
    check_index(segments, index)?;
    let width = segment_width(segments.len());
    Ok(SegmentArc {
        start: index as f64 * width,
        end: (index + 1) as f64 * width,
    })
}

/// Final rotation that stops the pointer over the middle of segment `index`
/// after `full_turns` complete revolutions.
pub fn landing_angle(
    segments: &SegmentSet,
    index: usize,
    full_turns: u32,
) -> Result<f64, GameBoxError> {
    let arc = segment_arc(segments, index)?;
    let rest = (POINTER_ANGLE - arc.mid()).rem_euclid(TAU);
    Ok(rest + f64::from(full_turns) * TAU)
}

fn check_index(segments: &SegmentSet, index: usize) -> Result<(), GameBoxError> {
    if index >= segments.len() {
        return Err(GameBoxError::new(
            "SEGMENTS_INDEX_OUT_OF_RANGE",
            format!(
                "Segment index {} is out of range for {} segments.",
                index,
                segments.len()
            ),
        ));
    }
    Ok(())
}
