//! Angle config loading from TOML and `--set` overrides.
//!
//! ```toml
//! [knee_angle]
//! target = 90.0
//! tolerance = 10.0
//!
//! [elbow_angle]
//! enabled = false
//! ```

use crate::{
    angles::AngleName,
    error::Error,
    rules::{AngleConfig, AngleConfigTable, SharedConfig},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, str::FromStr};
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AngleSection {
    description: Option<String>,
    target: Option<f64>,
    tolerance: Option<f64>,
    remedies: Option<Vec<String>>,
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    knee_angle: Option<AngleSection>,
    hip_angle: Option<AngleSection>,
    elbow_angle: Option<AngleSection>,
    head_to_shoulder_angle: Option<AngleSection>,
}

fn check_target(angle: AngleName, value: f64) -> Result<f64, Error> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidConfigValue {
            angle,
            field: "target",
            value,
        })
    }
}

fn check_tolerance(angle: AngleName, value: f64) -> Result<f64, Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidConfigValue {
            angle,
            field: "tolerance",
            value,
        })
    }
}

impl ConfigFile {
    pub(crate) fn from_toml(contents: &str, path: &Path) -> Result<Self, Error> {
        toml::from_str(contents).map_err(|e| Error::ParseConfigFile(e, path.to_path_buf()))
    }

    pub(crate) fn load<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| Error::ReadFile(e, path.to_path_buf()))?;
        Self::from_toml(&contents, path)
    }

    fn section(&self, name: AngleName) -> Option<&AngleSection> {
        match name {
            AngleName::Knee => self.knee_angle.as_ref(),
            AngleName::Hip => self.hip_angle.as_ref(),
            AngleName::Elbow => self.elbow_angle.as_ref(),
            AngleName::HeadToShoulder => self.head_to_shoulder_angle.as_ref(),
        }
    }

    /// Merge the file over the default table. Every value is checked before
    /// anything is returned.
    pub(crate) fn into_table(self) -> Result<AngleConfigTable, Error> {
        let mut table = AngleConfigTable::default();

        for &name in AngleName::ALL.iter() {
            let section = match self.section(name) {
                Some(section) => section,
                None => continue,
            };

            if section.enabled == Some(false) {
                info!(message = "angle disabled by config file", angle = %name);
                table.remove(name);
                continue;
            }

            let mut record = AngleConfig::default_for(name);
            if let Some(description) = &section.description {
                record.description = description.clone();
            }
            if let Some(target) = section.target {
                record.target = check_target(name, target)?;
            }
            if let Some(tolerance) = section.tolerance {
                record.tolerance = check_tolerance(name, tolerance)?;
            }
            if let Some(remedies) = &section.remedies {
                record.remedies = remedies.clone();
            }
            table.insert(name, record);
        }

        Ok(table)
    }
}

#[derive(Serialize)]
struct RenderedTable<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    knee_angle: Option<&'a AngleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hip_angle: Option<&'a AngleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elbow_angle: Option<&'a AngleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_to_shoulder_angle: Option<&'a AngleConfig>,
}

/// Render the table in the same layout [`ConfigFile`] reads. Disabled angles
/// are omitted.
pub(crate) fn render(table: &AngleConfigTable) -> Result<String, Error> {
    let rendered = RenderedTable {
        knee_angle: table.get(AngleName::Knee),
        hip_angle: table.get(AngleName::Hip),
        elbow_angle: table.get(AngleName::Elbow),
        head_to_shoulder_angle: table.get(AngleName::HeadToShoulder),
    };
    toml::to_string_pretty(&rendered).map_err(Error::SerializeConfig)
}

/// A `<angle>=<target>[,<tolerance>]` override from the command line. Either
/// number may be left empty, e.g. `knee=,10`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConfigOverride {
    pub(crate) angle: String,
    pub(crate) target: Option<f64>,
    pub(crate) tolerance: Option<f64>,
}

fn parse_number(s: &str) -> Result<Option<f64>, Error> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let value = s
        .parse::<f64>()
        .map_err(|e| Error::ParseOverrideNumber(e, s.to_owned()))?;
    if value.is_finite() {
        Ok(Some(value))
    } else {
        Err(Error::ParseOverride(s.to_owned()))
    }
}

impl FromStr for ConfigOverride {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut halves = s.splitn(2, '=');
        let angle = halves.next().unwrap_or_default().trim();
        let values = halves
            .next()
            .ok_or_else(|| Error::ParseOverride(s.to_owned()))?;

        let mut numbers = values.splitn(2, ',');
        let target = parse_number(numbers.next().unwrap_or_default())?;
        let tolerance = parse_number(numbers.next().unwrap_or_default())?;

        if angle.is_empty() || (target.is_none() && tolerance.is_none()) {
            return Err(Error::ParseOverride(s.to_owned()));
        }
        if tolerance.map_or(false, |t| t < 0.0) {
            return Err(Error::ParseOverride(s.to_owned()));
        }

        Ok(Self {
            angle: angle.to_owned(),
            target,
            tolerance,
        })
    }
}

/// Apply overrides in order. Unknown angles are logged and skipped; the
/// number of applied overrides is returned.
pub(crate) fn apply_overrides(
    config: &SharedConfig,
    overrides: &[ConfigOverride],
) -> Result<usize, Error> {
    let mut applied = 0;
    for o in overrides {
        match config.update(&o.angle, o.target, o.tolerance) {
            Ok(()) => applied += 1,
            Err(Error::UnknownAngle(name)) => {
                warn!(message = "ignoring override for unknown angle", angle = %name)
            }
            Err(e) => return Err(e),
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(contents: &str) -> Result<AngleConfigTable, Error> {
        ConfigFile::from_toml(contents, Path::new("test.toml"))?.into_table()
    }

    mod config_file_tests {
        use super::{table, AngleConfigTable, AngleName, ConfigFile, Error};

        #[test]
        fn empty_file_is_defaults() {
            assert_eq!(table("").unwrap(), AngleConfigTable::default());
        }

        #[test]
        fn partial_section_keeps_other_fields() {
            let table = table("[knee_angle]\ntarget = 90.0\n").unwrap();
            let knee = table.get(AngleName::Knee).unwrap();
            assert_eq!(knee.target, 90.0);
            assert_eq!(knee.tolerance, 5.0);
            assert_eq!(knee.description, "Knee angle");
        }

        #[test]
        fn disabled_angle_is_removed() {
            let table = table("[elbow_angle]\nenabled = false\n").unwrap();
            assert!(table.get(AngleName::Elbow).is_none());
            assert!(table.get(AngleName::Knee).is_some());
        }

        #[test]
        fn negative_tolerance_is_rejected() {
            let result = table("[hip_angle]\ntolerance = -1.0\n");
            assert!(matches!(
                result,
                Err(Error::InvalidConfigValue {
                    angle: AngleName::Hip,
                    field: "tolerance",
                    ..
                })
            ));
        }

        #[test]
        fn unknown_keys_are_rejected() {
            assert!(table("[wrist_angle]\ntarget = 1.0\n").is_err());
            assert!(table("[knee_angle]\ntarget = \"ninety\"\n").is_err());
        }

        #[test]
        fn load_reads_from_disk() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("ergo.toml");
            std::fs::write(&path, "[head_to_shoulder_angle]\nremedies = [\"Sit up.\"]\n").unwrap();
            let table = ConfigFile::load(&path).unwrap().into_table().unwrap();
            assert_eq!(
                table.get(AngleName::HeadToShoulder).unwrap().remedies,
                vec!["Sit up.".to_owned()]
            );
        }
    }

    mod render_tests {
        use super::{render, table, AngleConfigTable, AngleName};

        #[test]
        fn rendered_table_reads_back() {
            let mut original = AngleConfigTable::default();
            original.update_angle(AngleName::Hip, Some(98.0), Some(8.0)).unwrap();
            let rendered = render(&original).unwrap();
            assert_eq!(table(&rendered).unwrap(), original);
        }

        #[test]
        fn canonical_order() {
            let rendered = render(&AngleConfigTable::default()).unwrap();
            let knee = rendered.find("[knee_angle]").unwrap();
            let hip = rendered.find("[hip_angle]").unwrap();
            let elbow = rendered.find("[elbow_angle]").unwrap();
            let head = rendered.find("[head_to_shoulder_angle]").unwrap();
            assert!(knee < hip && hip < elbow && elbow < head);
        }
    }

    mod override_tests {
        use super::{apply_overrides, AngleName, ConfigOverride, SharedConfig};

        #[test]
        fn target_and_tolerance() {
            let o: ConfigOverride = "knee_angle=90,10".parse().unwrap();
            assert_eq!(o.angle, "knee_angle");
            assert_eq!(o.target, Some(90.0));
            assert_eq!(o.tolerance, Some(10.0));
        }

        #[test]
        fn either_number_may_be_omitted() {
            let o: ConfigOverride = "hip=98".parse().unwrap();
            assert_eq!((o.target, o.tolerance), (Some(98.0), None));
            let o: ConfigOverride = "hip=,8".parse().unwrap();
            assert_eq!((o.target, o.tolerance), (None, Some(8.0)));
        }

        #[test]
        fn invalid_input_is_rejected() {
            for input in ["knee", "knee=", "knee=,", "=90", "knee=ninety", "knee=90,-1", "knee=NaN"]
                .iter()
            {
                assert!(input.parse::<ConfigOverride>().is_err(), "{}", input);
            }
        }

        #[test]
        fn unknown_angles_are_skipped() {
            let shared = SharedConfig::default();
            let overrides = vec![
                "wrist=10".parse().unwrap(),
                "elbow=100,2".parse().unwrap(),
            ];
            assert_eq!(apply_overrides(&shared, &overrides).unwrap(), 1);
            let elbow = shared.get(AngleName::Elbow).unwrap().unwrap();
            assert_eq!((elbow.target, elbow.tolerance), (100.0, 2.0));
        }
    }
}
