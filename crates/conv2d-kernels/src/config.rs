use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::kernels::geometry::{PaddingMode, Stride, WindowExtent};
use crate::kernels::Backend;

/// Convolution settings, loadable from YAML.
///
/// Every field is optional; the defaults reproduce the reference policy
/// with unit stride on the scalar backend.
///
/// ```yaml
/// stride: [2, 1]
/// padding: same
/// extent: full_grid
/// backend: rayon
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvConfig {
    pub stride: Stride,
    pub padding: PaddingMode,
    pub extent: WindowExtent,
    pub backend: Backend,
}

impl ConvConfig {
    /// Reference policy with the given stride.
    #[must_use]
    pub fn with_stride(stride: impl Into<Stride>) -> Self {
        Self {
            stride: stride.into(),
            ..Self::default()
        }
    }
}

/// Parse a YAML config file into a [`ConvConfig`].
///
/// # Errors
///
/// Returns [`ConvError::Io`](crate::error::ConvError::Io) if the file cannot
/// be read, or [`ConvError::Yaml`](crate::error::ConvError::Yaml) if the YAML
/// is malformed.
pub fn parse_config(path: &Path) -> Result<ConvConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a YAML config from a string.
pub fn parse_config_str(yaml: &str) -> Result<ConvConfig> {
    let config: ConvConfig = serde_yaml::from_str(yaml)?;
    Ok(config)
}
