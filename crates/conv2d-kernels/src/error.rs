use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvError {
    #[error("Channel mismatch: input has {input_channels} channels, kernel has {kernel_channels}")]
    ShapeMismatch {
        input_channels: usize,
        kernel_channels: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Buffer length mismatch for {what}: expected {expected}, got {actual}")]
    DataLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T, E = ConvError> = std::result::Result<T, E>;

/// A geometry diagnostic from [`check_geometry`](crate::kernels::geometry::check_geometry).
///
/// `rule` is a `GEOM-NNN` id: 001 zero stride, 002 channel mismatch,
/// 003 empty or oversized kernel (errors); 004 even kernel and 005 stride > 1
/// under symmetric padding, 006 unreached output cells (warnings);
/// 007 empty output map (info). `location` names the offending setting.
#[derive(Debug, Clone)]
pub struct Violation {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        write!(f, "[{prefix}] {}: {}", self.rule, self.message)
    }
}
