use crate::{
    error::Error,
    geometry::angle_at_vertex,
    pose::{BodyPart, KeypointKind, KeypointSet, Side},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub(crate) enum AngleName {
    #[serde(rename = "knee_angle")]
    Knee,
    #[serde(rename = "hip_angle")]
    Hip,
    #[serde(rename = "elbow_angle")]
    Elbow,
    #[serde(rename = "head_to_shoulder_angle")]
    HeadToShoulder,
}

impl AngleName {
    /// Canonical evaluation order.
    pub(crate) const ALL: [AngleName; 4] = [
        AngleName::Knee,
        AngleName::Hip,
        AngleName::Elbow,
        AngleName::HeadToShoulder,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Knee => "knee_angle",
            Self::Hip => "hip_angle",
            Self::Elbow => "elbow_angle",
            Self::HeadToShoulder => "head_to_shoulder_angle",
        }
    }

    /// Body parts forming the angle, vertex in the middle.
    pub(crate) fn parts(self) -> (BodyPart, BodyPart, BodyPart) {
        use BodyPart::*;
        match self {
            Self::Knee => (Hip, Knee, Ankle),
            Self::Hip => (Shoulder, Hip, Knee),
            Self::Elbow => (Shoulder, Elbow, Wrist),
            Self::HeadToShoulder => (Ear, Shoulder, Hip),
        }
    }

    pub(crate) fn keypoints(self, side: Side) -> (KeypointKind, KeypointKind, KeypointKind) {
        let (a, vertex, c) = self.parts();
        (a.keypoint(side), vertex.keypoint(side), c.keypoint(side))
    }
}

impl fmt::Display for AngleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AngleName {
    type Err = Error;

    /// Accepts both `knee_angle` and the short `knee`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let name = lowered.strip_suffix("_angle").unwrap_or(&lowered);
        match name {
            "knee" => Ok(Self::Knee),
            "hip" => Ok(Self::Hip),
            "elbow" => Ok(Self::Elbow),
            "head_to_shoulder" | "neck" => Ok(Self::HeadToShoulder),
            _ => Err(Error::UnknownAngle(s.to_owned())),
        }
    }
}

/// One measurement per [`AngleName`]; `None` when the landmarks were missing
/// or the geometry was degenerate.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub(crate) struct PostureAngles {
    #[serde(rename = "knee_angle")]
    pub(crate) knee: Option<f64>,
    #[serde(rename = "hip_angle")]
    pub(crate) hip: Option<f64>,
    #[serde(rename = "elbow_angle")]
    pub(crate) elbow: Option<f64>,
    #[serde(rename = "head_to_shoulder_angle")]
    pub(crate) head_to_shoulder: Option<f64>,
}

impl PostureAngles {
    pub(crate) fn get(&self, name: AngleName) -> Option<f64> {
        match name {
            AngleName::Knee => self.knee,
            AngleName::Hip => self.hip,
            AngleName::Elbow => self.elbow,
            AngleName::HeadToShoulder => self.head_to_shoulder,
        }
    }

    fn slot(&mut self, name: AngleName) -> &mut Option<f64> {
        match name {
            AngleName::Knee => &mut self.knee,
            AngleName::Hip => &mut self.hip,
            AngleName::Elbow => &mut self.elbow,
            AngleName::HeadToShoulder => &mut self.head_to_shoulder,
        }
    }

    /// Iterate in canonical order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (AngleName, Option<f64>)> + '_ {
        AngleName::ALL.iter().map(move |&name| (name, self.get(name)))
    }
}

fn measure(keypoints: &KeypointSet, name: AngleName, side: Side) -> Option<f64> {
    let (a, vertex, c) = name.keypoints(side);
    angle_at_vertex(keypoints.get(a)?, keypoints.get(vertex)?, keypoints.get(c)?)
}

pub(crate) fn compute_posture_angles(keypoints: &KeypointSet, side: Side) -> PostureAngles {
    let mut angles = PostureAngles::default();
    for &name in AngleName::ALL.iter() {
        *angles.slot(name) = measure(keypoints, name, side);
    }
    angles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{KeypointKind::*, Point};
    use assert_approx_eq::assert_approx_eq;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y).unwrap()
    }

    fn seated_left_points() -> Vec<(KeypointKind, Point)> {
        vec![
            (LeftEar, p(0.45, 0.10)),
            (LeftShoulder, p(0.50, 0.25)),
            (LeftElbow, p(0.50, 0.45)),
            (LeftWrist, p(0.70, 0.45)),
            (LeftHip, p(0.50, 0.60)),
            (LeftKnee, p(0.75, 0.60)),
            (LeftAnkle, p(0.75, 0.90)),
        ]
    }

    fn seated_left() -> KeypointSet {
        seated_left_points().into_iter().collect()
    }

    mod angle_name_tests {
        use super::AngleName;

        #[test]
        fn parse_accepts_long_and_short_names() {
            assert_eq!("knee_angle".parse::<AngleName>().unwrap(), AngleName::Knee);
            assert_eq!("Hip".parse::<AngleName>().unwrap(), AngleName::Hip);
            assert_eq!(
                "head_to_shoulder_angle".parse::<AngleName>().unwrap(),
                AngleName::HeadToShoulder
            );
            assert!("wrist_angle".parse::<AngleName>().is_err());
        }

        #[test]
        fn display_round_trips() {
            for name in AngleName::ALL.iter() {
                assert_eq!(name.to_string().parse::<AngleName>().unwrap(), *name);
            }
        }
    }

    #[test]
    fn triples_are_side_dependent() {
        assert_eq!(
            AngleName::Knee.keypoints(Side::Left),
            (LeftHip, LeftKnee, LeftAnkle)
        );
        assert_eq!(
            AngleName::HeadToShoulder.keypoints(Side::Right),
            (RightEar, RightShoulder, RightHip)
        );
    }

    #[test]
    fn all_four_angles_on_left() {
        let angles = compute_posture_angles(&seated_left(), Side::Left);
        assert_approx_eq!(angles.knee.unwrap(), 90.0);
        assert_approx_eq!(angles.hip.unwrap(), 90.0);
        assert_approx_eq!(angles.elbow.unwrap(), 90.0);
        // ear is up and slightly forward of the shoulder
        assert_approx_eq!(angles.head_to_shoulder.unwrap(), 161.565051177, 1e-6);
    }

    #[test]
    fn wrong_side_is_all_undefined() {
        let angles = compute_posture_angles(&seated_left(), Side::Right);
        assert!(angles.iter().all(|(_, value)| value.is_none()));
    }

    #[test]
    fn missing_wrist_leaves_only_elbow_undefined() {
        let keypoints: KeypointSet = seated_left_points()
            .into_iter()
            .filter(|&(kind, _)| kind != LeftWrist)
            .collect();
        let angles = compute_posture_angles(&keypoints, Side::Left);
        assert_eq!(angles.elbow, None);
        assert!(angles.knee.is_some());
        assert!(angles.hip.is_some());
        assert!(angles.head_to_shoulder.is_some());
    }

    #[test]
    fn degenerate_vertex_is_undefined() {
        let mut keypoints = seated_left();
        keypoints.insert(LeftKnee, p(0.50, 0.60));
        let angles = compute_posture_angles(&keypoints, Side::Left);
        assert_eq!(angles.knee, None);
        assert_eq!(angles.hip, None);
    }

    #[test]
    fn iteration_is_canonical() {
        let names: Vec<_> = PostureAngles::default().iter().map(|(n, _)| n).collect();
        assert_eq!(names, AngleName::ALL.to_vec());
    }
}
