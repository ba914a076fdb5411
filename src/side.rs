//! Choose which body side to measure from.
//!
//! The choice compares the mean x coordinate of all visible left landmarks
//! against all visible right landmarks. This is a heuristic for side-on
//! photos and can pick the wrong side when the subject is rotated towards
//! the camera; callers that know the side should pass it explicitly instead.

use crate::pose::{constants::SYMMETRIC_PARTS, KeypointSet, Side};
use num_traits::ToPrimitive;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SideResolution {
    pub(crate) side: Side,
    pub(crate) diagnostics: Vec<String>,
}

fn mean(xs: &[f64]) -> Option<f64> {
    Some(xs.iter().sum::<f64>() / xs.len().to_f64()?)
}

pub(crate) fn resolve_side(keypoints: &KeypointSet) -> SideResolution {
    let mut diagnostics = Vec::new();
    let mut left_xs = Vec::with_capacity(SYMMETRIC_PARTS.len());
    let mut right_xs = Vec::with_capacity(SYMMETRIC_PARTS.len());

    for part in SYMMETRIC_PARTS.iter() {
        let (left_kind, right_kind) = part.pair();
        let left = keypoints.get(left_kind);
        let right = keypoints.get(right_kind);

        match (left, right) {
            (None, None) => diagnostics.push(format!(
                "Neither left nor right {} landmark could be detected.",
                part.name()
            )),
            (None, Some(_)) => diagnostics.push(format!(
                "Left {} landmark (ID {}) could not be detected; defaulting to RIGHT for {}.",
                part.name(),
                left_kind as usize,
                part.name()
            )),
            (Some(_), None) => diagnostics.push(format!(
                "Right {} landmark (ID {}) could not be detected; defaulting to LEFT for {}.",
                part.name(),
                right_kind as usize,
                part.name()
            )),
            (Some(_), Some(_)) => {}
        }

        left_xs.extend(left.map(|p| p.x()));
        right_xs.extend(right.map(|p| p.x()));
    }

    let side = match (left_xs.is_empty(), right_xs.is_empty()) {
        (true, true) => {
            diagnostics.push(
                "No symmetric landmarks available to decide side. Defaulting to LEFT.".to_owned(),
            );
            Side::Left
        }
        (true, false) => {
            diagnostics.push("No left-side landmarks available. Defaulting to RIGHT.".to_owned());
            Side::Right
        }
        (false, true) => {
            diagnostics.push("No right-side landmarks available. Defaulting to LEFT.".to_owned());
            Side::Left
        }
        (false, false) => match (mean(&left_xs), mean(&right_xs)) {
            (Some(avg_left), Some(avg_right)) => {
                let side = if avg_left < avg_right {
                    Side::Left
                } else {
                    Side::Right
                };
                diagnostics.push(format!(
                    "Chosen side based on average x-coordinates: {} (Left avg: {:.3}, Right avg: {:.3})",
                    side, avg_left, avg_right
                ));
                side
            }
            _ => Side::Left,
        },
    };

    debug!(message = "resolved side", %side, left = left_xs.len(), right = right_xs.len());

    SideResolution { side, diagnostics }
}
