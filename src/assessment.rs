use crate::{
    angles::{compute_posture_angles, PostureAngles},
    error::Error,
    pose::{KeypointSet, Side},
    rules::{AngleConfigTable, AngleEvaluation},
    side::{resolve_side, SideResolution},
};
use num_traits::ToPrimitive;
use serde::Serialize;
use std::{fmt, str::FromStr};
use tracing::debug;

const SCORE_STEP: u8 = 20;
const MAX_PENALIZED_FAILURES: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub(crate) enum Rating {
    Great,
    #[serde(rename = "OK")]
    Ok,
    Poor,
    #[serde(rename = "No angles measured")]
    NoAnglesMeasured,
}

impl Rating {
    fn from_score(score: u8) -> Self {
        if score >= 80 {
            Self::Great
        } else if score >= 60 {
            Self::Ok
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Great => "Great",
            Self::Ok => "OK",
            Self::Poor => "Poor",
            Self::NoAnglesMeasured => "No angles measured",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AssessmentReport {
    pub(crate) evaluations: Vec<AngleEvaluation>,
    pub(crate) score: u8,
    pub(crate) rating: Rating,
    pub(crate) messages: Vec<String>,
}

impl AssessmentReport {
    pub(crate) fn out_of_range(&self) -> usize {
        self.evaluations
            .iter()
            .filter(|e| e.ok == Some(false))
            .count()
    }

    pub(crate) fn summary(&self) -> String {
        format!("Overall assessment: {}% ({})", self.score, self.rating)
    }
}

/// 100 for no failures, minus 20 per failure, floored at 20.
pub(crate) fn score_for(out_of_range: usize) -> u8 {
    let penalized = out_of_range
        .min(MAX_PENALIZED_FAILURES)
        .to_u8()
        .unwrap_or(u8::MAX);
    100 - SCORE_STEP * penalized
}

/// Evaluate every measured angle in canonical order and score the result.
///
/// Angles without a measurement are skipped entirely. Angles without a config
/// record appear in the report but are not scored.
pub(crate) fn assess(angles: &PostureAngles, config: &AngleConfigTable) -> AssessmentReport {
    let evaluations: Vec<_> = angles
        .iter()
        .filter_map(|(name, value)| value.map(|value| config.evaluate(name, value)))
        .collect();

    let scored = evaluations.iter().filter(|e| e.ok.is_some()).count();
    let out_of_range = evaluations
        .iter()
        .filter(|e| e.ok == Some(false))
        .count();

    let (score, rating) = if scored == 0 {
        (0, Rating::NoAnglesMeasured)
    } else {
        let score = score_for(out_of_range);
        (score, Rating::from_score(score))
    };

    let mut messages = Vec::with_capacity(evaluations.len() + 1);
    for evaluation in &evaluations {
        messages.push(evaluation.message.clone());
        if evaluation.ok == Some(false) {
            messages.extend(evaluation.remedies.iter().map(|r| format!("Try: {}", r)));
        }
    }

    debug!(
        message = "assessed posture",
        evaluated = evaluations.len(),
        scored,
        out_of_range,
        score
    );

    let mut report = AssessmentReport {
        evaluations,
        score,
        rating,
        messages,
    };
    let summary = report.summary();
    report.messages.push(summary);
    report
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SideChoice {
    Auto,
    Fixed(Side),
}

impl Default for SideChoice {
    fn default() -> Self {
        Self::Auto
    }
}

impl FromStr for SideChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            s.parse().map(Self::Fixed)
        }
    }
}

/// Everything derived from one image's keypoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Analysis {
    pub(crate) side: Side,
    pub(crate) side_diagnostics: Vec<String>,
    pub(crate) angles: PostureAngles,
    pub(crate) report: AssessmentReport,
}

/// Run the full pipeline for one image. The side is fixed once here and used
/// for every angle.
pub(crate) fn analyze(
    keypoints: &KeypointSet,
    side: SideChoice,
    config: &AngleConfigTable,
) -> Analysis {
    let SideResolution { side, diagnostics } = match side {
        SideChoice::Auto => resolve_side(keypoints),
        SideChoice::Fixed(side) => SideResolution {
            side,
            diagnostics: vec![format!("Side fixed by caller: {}", side)],
        },
    };
    let angles = compute_posture_angles(keypoints, side);
    let report = assess(&angles, config);
    Analysis {
        side,
        side_diagnostics: diagnostics,
        angles,
        report,
    }
}
