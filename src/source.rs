use crate::{
    error::Error,
    pose::{KeypointSet, Point},
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

const KEYPOINT_FILE_EXTENSION: &str = "json";

/// Result of running a pose model on one image.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Detection {
    Keypoints {
        keypoints: KeypointSet,
        diagnostic: String,
    },
    NoDetection,
}

pub(crate) trait PoseSource {
    /// Detect a single person's landmarks in the image identified by `image`.
    fn detect(&self, image: &Path) -> Result<Detection, Error>;
}

#[derive(Debug, Deserialize)]
struct KeypointFile {
    #[serde(default)]
    keypoints: Option<BTreeMap<usize, [f64; 2]>>,
    #[serde(default)]
    diagnostic: Option<String>,
}

/// Reads landmarks that an external pose model exported as JSON, one file per
/// image: `{"keypoints": {"23": [x, y], ...}, "diagnostic": "..."}`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct KeypointFileSource;

impl KeypointFileSource {
    pub(crate) fn parse(contents: &str, path: &Path) -> Result<Detection, Error> {
        let file: KeypointFile = serde_json::from_str(contents)
            .map_err(|e| Error::ParseKeypointFile(e, path.to_path_buf()))?;

        let raw = match file.keypoints {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Detection::NoDetection),
        };

        let mut keypoints = KeypointSet::new();
        for (id, [x, y]) in raw {
            keypoints.insert_id(id, Point::new(x, y)?)?;
        }

        trace!(message = "parsed keypoint file", path = ?path, count = keypoints.len());

        Ok(Detection::Keypoints {
            keypoints,
            diagnostic: file.diagnostic.unwrap_or_default(),
        })
    }
}

impl PoseSource for KeypointFileSource {
    fn detect(&self, image: &Path) -> Result<Detection, Error> {
        let contents =
            fs::read_to_string(image).map_err(|e| Error::ReadFile(e, image.to_path_buf()))?;
        Self::parse(&contents, image)
    }
}

fn is_keypoint_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(KEYPOINT_FILE_EXTENSION))
}

/// Expand the given paths into a list of keypoint files. Directories are
/// scanned one level deep and their entries sorted; files are kept as given.
pub(crate) fn keypoint_files<P>(paths: &[P]) -> Result<Vec<PathBuf>, Error>
where
    P: AsRef<Path>,
{
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut entries = fs::read_dir(path)
                .map_err(|e| Error::ReadDir(e, path.to_path_buf()))?
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| Error::ReadDir(e, path.to_path_buf()))?;
            entries.retain(|entry| is_keypoint_file(entry));
            entries.sort();
            debug!(message = "scanned directory", path = ?path, files = entries.len());
            files.extend(entries);
        } else {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
