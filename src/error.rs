#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to convert usize value to keypoint kind: {0}")]
    ConvertUSizeToKeypointKind(usize),

    #[error("failed to construct NotNan from f64: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f64),

    #[error("keypoint coordinate is infinite: {0}")]
    InfiniteCoordinate(f64),

    #[error("unknown angle: {0}")]
    UnknownAngle(String),

    #[error("unknown side: {0}")]
    UnknownSide(String),

    #[error("invalid {field} for {angle}: {value}")]
    InvalidConfigValue {
        angle: crate::angles::AngleName,
        field: &'static str,
        value: f64,
    },

    #[error("failed to parse override {0:?}: expected <angle>=<target>[,<tolerance>]")]
    ParseOverride(String),

    #[error("failed to parse number {1:?} in override")]
    ParseOverrideNumber(#[source] std::num::ParseFloatError, String),

    #[error("angle config lock was poisoned")]
    ConfigLockPoisoned,

    #[error("failed to read {1:?}")]
    ReadFile(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to list directory {1:?}")]
    ReadDir(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to parse keypoint file {1:?}")]
    ParseKeypointFile(#[source] serde_json::Error, std::path::PathBuf),

    #[error("failed to parse config file {1:?}")]
    ParseConfigFile(#[source] toml::de::Error, std::path::PathBuf),

    #[error("failed to serialize angle config")]
    SerializeConfig(#[source] toml::ser::Error),

    #[error("analysis worker panicked")]
    WorkerPanicked,

    #[error("failed to serialize analysis")]
    SerializeAnalysis(#[source] serde_json::Error),
}
