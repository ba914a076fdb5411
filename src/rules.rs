use crate::{angles::AngleName, error::Error};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};
use tracing::{info, warn};

pub(crate) mod defaults {
    pub(crate) const KNEE_TARGET: f64 = 100.0;
    pub(crate) const KNEE_TOLERANCE: f64 = 5.0;
    pub(crate) const HIP_TARGET: f64 = 100.0;
    pub(crate) const HIP_TOLERANCE: f64 = 5.0;
    pub(crate) const ELBOW_TARGET: f64 = 95.0;
    pub(crate) const ELBOW_TOLERANCE: f64 = 5.0;
    pub(crate) const HEAD_TO_SHOULDER_TARGET: f64 = 160.0;
    pub(crate) const HEAD_TO_SHOULDER_TOLERANCE: f64 = 5.0;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AngleConfig {
    pub(crate) description: String,
    pub(crate) target: f64,
    pub(crate) tolerance: f64,
    pub(crate) remedies: Vec<String>,
}

impl AngleConfig {
    pub(crate) fn new<S>(description: S, target: f64, tolerance: f64, remedies: &[&str]) -> Self
    where
        S: Into<String>,
    {
        Self {
            description: description.into(),
            target,
            tolerance,
            remedies: remedies.iter().map(|&r| r.to_owned()).collect(),
        }
    }

    /// Default record for `name`.
    pub(crate) fn default_for(name: AngleName) -> Self {
        use self::defaults::*;
        match name {
            AngleName::Knee => Self::new(
                "Knee angle",
                KNEE_TARGET,
                KNEE_TOLERANCE,
                &["Lower or raise your seat so that your thighs and shins form the target knee angle."],
            ),
            AngleName::Hip => Self::new(
                "Hip angle",
                HIP_TARGET,
                HIP_TOLERANCE,
                &["Adjust seat depth, seat tilt or desk height to open or close the hip angle."],
            ),
            AngleName::Elbow => Self::new(
                "Elbow angle",
                ELBOW_TARGET,
                ELBOW_TOLERANCE,
                &["Adjust the armrest or desk height so that your forearms rest level with the keyboard."],
            ),
            AngleName::HeadToShoulder => Self::new(
                "Head to Shoulder angle",
                HEAD_TO_SHOULDER_TARGET,
                HEAD_TO_SHOULDER_TOLERANCE,
                &[
                    "Raise or lower your monitor to reduce neck bending.",
                    "Keep your head upright; adjust the screen distance.",
                ],
            ),
        }
    }
}

/// Outcome of checking one measured angle against its [`AngleConfig`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AngleEvaluation {
    pub(crate) angle: AngleName,
    pub(crate) value: f64,
    /// `None` when the angle has no config record.
    pub(crate) ok: Option<bool>,
    pub(crate) diff: Option<f64>,
    pub(crate) message: String,
    pub(crate) remedies: Vec<String>,
}

/// Per-angle targets. Angles without a record are reported but never scored.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AngleConfigTable {
    angles: BTreeMap<AngleName, AngleConfig>,
}

impl Default for AngleConfigTable {
    fn default() -> Self {
        AngleName::ALL
            .iter()
            .map(|&name| (name, AngleConfig::default_for(name)))
            .collect()
    }
}

impl std::iter::FromIterator<(AngleName, AngleConfig)> for AngleConfigTable {
    fn from_iter<I: IntoIterator<Item = (AngleName, AngleConfig)>>(iter: I) -> Self {
        Self {
            angles: iter.into_iter().collect(),
        }
    }
}

impl AngleConfigTable {
    pub(crate) fn get(&self, name: AngleName) -> Option<&AngleConfig> {
        self.angles.get(&name)
    }

    pub(crate) fn insert(&mut self, name: AngleName, config: AngleConfig) -> Option<AngleConfig> {
        self.angles.insert(name, config)
    }

    pub(crate) fn remove(&mut self, name: AngleName) -> Option<AngleConfig> {
        self.angles.remove(&name)
    }

    /// Overwrite the supplied fields of the record named `name`.
    ///
    /// Unknown names leave the table untouched and return
    /// [`Error::UnknownAngle`]. Values are not range checked here.
    pub(crate) fn update(
        &mut self,
        name: &str,
        target: Option<f64>,
        tolerance: Option<f64>,
    ) -> Result<(), Error> {
        let angle = name.parse::<AngleName>()?;
        self.update_angle(angle, target, tolerance)
    }

    pub(crate) fn update_angle(
        &mut self,
        name: AngleName,
        target: Option<f64>,
        tolerance: Option<f64>,
    ) -> Result<(), Error> {
        let record = self
            .angles
            .get_mut(&name)
            .ok_or_else(|| Error::UnknownAngle(name.to_string()))?;

        if let Some(target) = target {
            record.target = target;
        }
        if let Some(tolerance) = tolerance {
            if tolerance < 0.0 {
                warn!(message = "negative tolerance accepted", angle = %name, tolerance);
            }
            record.tolerance = tolerance;
        }

        info!(
            message = "updated angle config",
            angle = %name,
            target = record.target,
            tolerance = record.tolerance
        );
        Ok(())
    }

    /// Check a measured angle against its record. The tolerance band is
    /// inclusive on both ends.
    pub(crate) fn evaluate(&self, name: AngleName, value: f64) -> AngleEvaluation {
        assert!(value.is_finite(), "evaluate called with {}", value);

        let record = match self.get(name) {
            Some(record) => record,
            None => {
                return AngleEvaluation {
                    angle: name,
                    value,
                    ok: None,
                    diff: None,
                    message: format!("No recommended config found for {}.", name),
                    remedies: Vec::new(),
                }
            }
        };

        let diff = (value - record.target).abs();
        let ok = diff <= record.tolerance;

        let (message, remedies) = if ok {
            (
                format!("{} is good ({:.1}°).", record.description, value),
                Vec::new(),
            )
        } else {
            (
                format!(
                    "{} is out of range by {:.1}° (measured {:.1}°, target ~{}° ±{}).",
                    record.description, diff, value, record.target, record.tolerance
                ),
                record.remedies.clone(),
            )
        };

        AngleEvaluation {
            angle: name,
            value,
            ok: Some(ok),
            diff: Some(diff),
            message,
            remedies,
        }
    }
}

/// Handle to a config table shared between a writer (the user adjusting
/// thresholds) and concurrent analyses, which read a snapshot per run.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedConfig {
    inner: Arc<RwLock<AngleConfigTable>>,
}

impl SharedConfig {
    pub(crate) fn new(table: AngleConfigTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    pub(crate) fn snapshot(&self) -> Result<AngleConfigTable, Error> {
        Ok(self
            .inner
            .read()
            .map_err(|_| Error::ConfigLockPoisoned)?
            .clone())
    }

    pub(crate) fn get(&self, name: AngleName) -> Result<Option<AngleConfig>, Error> {
        Ok(self
            .inner
            .read()
            .map_err(|_| Error::ConfigLockPoisoned)?
            .get(name)
            .cloned())
    }

    pub(crate) fn update(
        &self,
        name: &str,
        target: Option<f64>,
        tolerance: Option<f64>,
    ) -> Result<(), Error> {
        self.inner
            .write()
            .map_err(|_| Error::ConfigLockPoisoned)?
            .update(name, target, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod update_tests {
        use super::{AngleConfigTable, AngleName};
        use crate::error::Error;

        #[test]
        fn only_supplied_fields_change() {
            let mut table = AngleConfigTable::default();
            table.update("knee_angle", Some(90.0), None).unwrap();
            let knee = table.get(AngleName::Knee).unwrap();
            assert_eq!(knee.target, 90.0);
            assert_eq!(knee.tolerance, 5.0);

            table.update("knee", None, Some(10.0)).unwrap();
            let knee = table.get(AngleName::Knee).unwrap();
            assert_eq!(knee.target, 90.0);
            assert_eq!(knee.tolerance, 10.0);
        }

        #[test]
        fn unknown_name_is_a_no_op() {
            let mut table = AngleConfigTable::default();
            let result = table.update("wrist_angle", Some(1.0), Some(1.0));
            assert!(matches!(result, Err(Error::UnknownAngle(ref name)) if name == "wrist_angle"));
            assert_eq!(table, AngleConfigTable::default());
        }

        #[test]
        fn removed_angle_is_unknown() {
            let mut table = AngleConfigTable::default();
            table.remove(AngleName::Elbow);
            assert!(table.update("elbow_angle", Some(1.0), None).is_err());
        }

        #[test]
        fn out_of_range_values_are_accepted() {
            let mut table = AngleConfigTable::default();
            table.update("hip_angle", Some(-20.0), Some(400.0)).unwrap();
            let hip = table.get(AngleName::Hip).unwrap();
            assert_eq!(hip.target, -20.0);
            assert_eq!(hip.tolerance, 400.0);
        }
    }

    mod evaluate_tests {
        use super::{AngleConfigTable, AngleName};

        #[test]
        fn within_band_is_good() {
            let evaluation = AngleConfigTable::default().evaluate(AngleName::Knee, 102.34);
            assert_eq!(evaluation.ok, Some(true));
            assert_eq!(evaluation.message, "Knee angle is good (102.3°).");
            assert!(evaluation.remedies.is_empty());
        }

        #[test]
        fn band_edge_is_inclusive() {
            let table = AngleConfigTable::default();
            assert_eq!(table.evaluate(AngleName::Knee, 105.0).ok, Some(true));
            assert_eq!(table.evaluate(AngleName::Knee, 95.0).ok, Some(true));
            assert_eq!(table.evaluate(AngleName::Knee, 105.000_001).ok, Some(false));
            assert_eq!(table.evaluate(AngleName::Knee, 94.999_999).ok, Some(false));
        }

        #[test]
        fn out_of_range_carries_remedies() {
            let evaluation = AngleConfigTable::default().evaluate(AngleName::HeadToShoulder, 140.0);
            assert_eq!(evaluation.ok, Some(false));
            assert_eq!(evaluation.diff, Some(20.0));
            assert_eq!(
                evaluation.message,
                "Head to Shoulder angle is out of range by 20.0° (measured 140.0°, target ~160° ±5)."
            );
            assert_eq!(evaluation.remedies.len(), 2);
        }

        #[test]
        fn missing_record_is_undecided() {
            let empty: AngleConfigTable = std::iter::empty().collect();
            let evaluation = empty.evaluate(AngleName::Elbow, 80.0);
            assert_eq!(evaluation.ok, None);
            assert_eq!(evaluation.diff, None);
            assert_eq!(evaluation.message, "No recommended config found for elbow_angle.");
            assert!(evaluation.remedies.is_empty());
        }

        #[test]
        fn updated_target_applies_to_later_evaluations() {
            let mut table = AngleConfigTable::default();
            let before = table.evaluate(AngleName::Knee, 107.0);

            table.update("knee_angle", Some(90.0), Some(10.0)).unwrap();
            assert_eq!(table.evaluate(AngleName::Knee, 95.0).ok, Some(true));

            table.update("knee_angle", Some(100.0), Some(5.0)).unwrap();
            let after = table.evaluate(AngleName::Knee, 107.0);
            assert_eq!(after.ok, Some(false));
            assert_eq!(after.diff, Some(7.0));
            assert_eq!(before, after);
        }

        #[test]
        #[should_panic(expected = "evaluate called with NaN")]
        fn non_finite_value_is_fatal() {
            AngleConfigTable::default().evaluate(AngleName::Knee, f64::NAN);
        }

        #[test]
        fn repeated_evaluation_is_identical() {
            let table = AngleConfigTable::default();
            assert_eq!(
                table.evaluate(AngleName::Hip, 87.25),
                table.evaluate(AngleName::Hip, 87.25)
            );
        }
    }

    mod shared_config_tests {
        use super::{AngleConfigTable, AngleName, SharedConfig};

        #[test]
        fn snapshot_is_isolated_from_later_writes() {
            let shared = SharedConfig::new(AngleConfigTable::default());
            let snapshot = shared.snapshot().unwrap();
            shared.update("elbow_angle", Some(120.0), None).unwrap();

            assert_eq!(snapshot.get(AngleName::Elbow).unwrap().target, 95.0);
            assert_eq!(shared.get(AngleName::Elbow).unwrap().unwrap().target, 120.0);
        }

        #[test]
        fn concurrent_readers_see_a_whole_record() {
            let shared = SharedConfig::default();
            crossbeam::thread::scope(|scope| {
                for _ in 0..4 {
                    let reader = shared.clone();
                    scope.spawn(move |_| {
                        for _ in 0..100 {
                            let knee = reader.get(AngleName::Knee).unwrap().unwrap();
                            assert!(
                                (knee.target, knee.tolerance) == (100.0, 5.0)
                                    || (knee.target, knee.tolerance) == (90.0, 10.0)
                            );
                        }
                    });
                }
                let writer = shared.clone();
                scope.spawn(move |_| {
                    for i in 0..100 {
                        let (target, tolerance) = if i % 2 == 0 { (90.0, 10.0) } else { (100.0, 5.0) };
                        writer
                            .update("knee_angle", Some(target), Some(tolerance))
                            .unwrap();
                    }
                });
            })
            .unwrap();
        }
    }
}
