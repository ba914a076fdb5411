use crate::error::Error;
use num_traits::FromPrimitive;
use ordered_float::NotNan;
use std::{
    collections::BTreeMap,
    fmt,
    ops::{Div, Sub},
    str::FromStr,
};

/// MediaPipe pose landmark numbering. The discriminants are the ids the pose
/// model emits and must not be reordered.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    num_derive::FromPrimitive,
)]
pub(crate) enum KeypointKind {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl KeypointKind {
    pub(crate) fn from_idx(id: usize) -> Result<Self, Error> {
        Self::from_usize(id).ok_or(Error::ConvertUSizeToKeypointKind(id))
    }
}

fn finite(value: f64) -> Result<f64, Error> {
    let value = NotNan::new(value)
        .map_err(|e| Error::ConstructNotNan(e, value))?
        .into_inner();
    if value.is_infinite() {
        return Err(Error::InfiniteCoordinate(value));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub(crate) struct Point {
    x: f64,
    y: f64,
}

impl Point {
    pub(crate) fn new(x: f64, y: f64) -> Result<Self, Error> {
        Ok(Self {
            x: finite(x)?,
            y: finite(y)?,
        })
    }

    /// Largest absolute component.
    #[inline]
    pub(crate) fn max_abs(self) -> f64 {
        self.x.abs().max(self.y.abs())
    }

    #[inline]
    pub(crate) fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub(crate) fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub(crate) fn x(self) -> f64 {
        self.x
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Div<f64> for Point {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self::Output {
            x: self.x / rhs,
            y: self.y / rhs,
        }
    }
}

/// Sparse set of detected landmarks for a single image.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct KeypointSet {
    points: BTreeMap<KeypointKind, Point>,
}

impl KeypointSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, kind: KeypointKind, point: Point) -> Option<Point> {
        self.points.insert(kind, point)
    }

    /// Insert a landmark by its raw pose-model id.
    pub(crate) fn insert_id(&mut self, id: usize, point: Point) -> Result<Option<Point>, Error> {
        Ok(self.insert(KeypointKind::from_idx(id)?, point))
    }

    pub(crate) fn get(&self, kind: KeypointKind) -> Option<Point> {
        self.points.get(&kind).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }
}

impl std::iter::FromIterator<(KeypointKind, Point)> for KeypointSet {
    fn from_iter<I: IntoIterator<Item = (KeypointKind, Point)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        })
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(Error::UnknownSide(s.to_owned())),
        }
    }
}

/// Body parts that exist as a left/right landmark pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BodyPart {
    Ear,
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
}

impl BodyPart {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Ear => "ear",
            Self::Shoulder => "shoulder",
            Self::Elbow => "elbow",
            Self::Wrist => "wrist",
            Self::Hip => "hip",
            Self::Knee => "knee",
            Self::Ankle => "ankle",
        }
    }

    pub(crate) fn keypoint(self, side: Side) -> KeypointKind {
        let (left, right) = self.pair();
        match side {
            Side::Left => left,
            Side::Right => right,
        }
    }

    pub(crate) fn pair(self) -> (KeypointKind, KeypointKind) {
        use KeypointKind::*;
        match self {
            Self::Ear => (LeftEar, RightEar),
            Self::Shoulder => (LeftShoulder, RightShoulder),
            Self::Elbow => (LeftElbow, RightElbow),
            Self::Wrist => (LeftWrist, RightWrist),
            Self::Hip => (LeftHip, RightHip),
            Self::Knee => (LeftKnee, RightKnee),
            Self::Ankle => (LeftAnkle, RightAnkle),
        }
    }
}

pub(crate) mod constants {
    use super::BodyPart::{self, *};

    pub(crate) const SYMMETRIC_PARTS: [BodyPart; 7] =
        [Ear, Shoulder, Elbow, Wrist, Hip, Knee, Ankle];
}
