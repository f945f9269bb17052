//! Convolution geometry: stride, padding, output and visited extents.
//!
//! The reference policy pads each spatial axis by `(k - 1) / 2` on both
//! sides, declares an output of `h / stride_h x w / stride_w`, and slides
//! the window over `[0, h - kh)` x `[0, w - kw)` only. Output cells beyond
//! the slide range stay zero. [`PaddingMode::Same`] and
//! [`WindowExtent::FullGrid`] replace those two rules independently.

use serde::{Deserialize, Serialize};

use crate::config::ConvConfig;
use crate::error::{ConvError, Result, Severity, Violation};

/// Window step along height and width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StrideRepr", into = "StrideRepr")]
pub struct Stride {
    pub h: usize,
    pub w: usize,
}

impl Stride {
    pub const UNIT: Self = Self { h: 1, w: 1 };

    #[must_use]
    pub const fn new(h: usize, w: usize) -> Self {
        Self { h, w }
    }

    /// # Errors
    ///
    /// Returns [`ConvError::InvalidArgument`] if either component is zero.
    pub fn validate(self) -> Result<Self> {
        if self.h == 0 || self.w == 0 {
            return Err(ConvError::InvalidArgument(format!(
                "stride must be positive, got ({}, {})",
                self.h, self.w
            )));
        }
        Ok(self)
    }
}

impl Default for Stride {
    fn default() -> Self {
        Self::UNIT
    }
}

/// A scalar stride applies to both axes.
impl From<usize> for Stride {
    fn from(s: usize) -> Self {
        Self { h: s, w: s }
    }
}

impl From<(usize, usize)> for Stride {
    fn from((h, w): (usize, usize)) -> Self {
        Self { h, w }
    }
}

impl From<[usize; 2]> for Stride {
    fn from([h, w]: [usize; 2]) -> Self {
        Self { h, w }
    }
}

/// YAML form of a stride: `2` or `[2, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum StrideRepr {
    Scalar(usize),
    Pair([usize; 2]),
}

impl From<StrideRepr> for Stride {
    fn from(repr: StrideRepr) -> Self {
        match repr {
            StrideRepr::Scalar(s) => s.into(),
            StrideRepr::Pair(p) => p.into(),
        }
    }
}

impl From<Stride> for StrideRepr {
    fn from(s: Stride) -> Self {
        if s.h == s.w {
            Self::Scalar(s.h)
        } else {
            Self::Pair([s.h, s.w])
        }
    }
}

/// How the zero border around the input is sized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    /// `(k - 1) / 2` on both sides. Same-size only for odd `k`.
    #[default]
    Symmetric,
    /// `(k - 1) / 2` before, `k - 1 - (k - 1) / 2` after.
    Same,
}

/// Which output cells the sliding window visits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowExtent {
    /// Window origins in `[0, h - kh)` x `[0, w - kw)`; trailing cells stay zero.
    #[default]
    Reference,
    /// Every cell of the declared output grid.
    FullGrid,
}

/// Zero border widths, in elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Padding {
    fn for_mode(mode: PaddingMode, kh: usize, kw: usize) -> Self {
        let top = (kh - 1) / 2;
        let left = (kw - 1) / 2;
        match mode {
            PaddingMode::Symmetric => Self {
                top,
                bottom: top,
                left,
                right: left,
            },
            PaddingMode::Same => Self {
                top,
                bottom: kh - 1 - top,
                left,
                right: kw - 1 - left,
            },
        }
    }
}

/// Number of window origins in `range(0, extent, step)`.
fn slide_count(extent: usize, step: usize) -> usize {
    extent.div_ceil(step)
}

/// Resolved sizes for one single-kernel convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub channels: usize,
    pub in_h: usize,
    pub in_w: usize,
    pub kh: usize,
    pub kw: usize,
    pub stride: Stride,
    pub padding: Padding,
    pub padded_h: usize,
    pub padded_w: usize,
    pub out_h: usize,
    pub out_w: usize,
    /// Output rows actually written; the rest stay zero.
    pub visited_h: usize,
    /// Output columns actually written.
    pub visited_w: usize,
}

impl ConvGeometry {
    /// Resolve the geometry of `input` (`c x h x w`) convolved with
    /// `kernel` (`c x kh x kw`).
    ///
    /// # Errors
    ///
    /// - [`ConvError::ShapeMismatch`] if the channel counts differ
    /// - [`ConvError::InvalidArgument`] for a zero stride, an empty kernel,
    ///   or a kernel larger than the input
    pub fn plan(
        input: [usize; 3],
        kernel: [usize; 3],
        stride: Stride,
        padding: PaddingMode,
        extent: WindowExtent,
    ) -> Result<Self> {
        let [channels, in_h, in_w] = input;
        let [kernel_channels, kh, kw] = kernel;
        if channels != kernel_channels {
            return Err(ConvError::ShapeMismatch {
                input_channels: channels,
                kernel_channels,
            });
        }
        let stride = stride.validate()?;
        if kh == 0 || kw == 0 {
            return Err(ConvError::InvalidArgument(format!(
                "kernel spatial extent must be non-empty, got {kh}x{kw}"
            )));
        }
        if kh > in_h || kw > in_w {
            return Err(ConvError::InvalidArgument(format!(
                "kernel {kh}x{kw} larger than input {in_h}x{in_w}"
            )));
        }

        let out_h = in_h / stride.h;
        let out_w = in_w / stride.w;
        let mut pad = Padding::for_mode(padding, kh, kw);

        let (visited_h, visited_w) = match extent {
            WindowExtent::Reference => (
                slide_count(in_h - kh, stride.h).min(out_h),
                slide_count(in_w - kw, stride.w).min(out_w),
            ),
            WindowExtent::FullGrid => (out_h, out_w),
        };

        // The last visited window must fit inside the padded input.
        if visited_h > 0 {
            let needed = (visited_h - 1) * stride.h + kh;
            pad.bottom += needed.saturating_sub(in_h + pad.top + pad.bottom);
        }
        if visited_w > 0 {
            let needed = (visited_w - 1) * stride.w + kw;
            pad.right += needed.saturating_sub(in_w + pad.left + pad.right);
        }

        Ok(Self {
            channels,
            in_h,
            in_w,
            kh,
            kw,
            stride,
            padding: pad,
            padded_h: in_h + pad.top + pad.bottom,
            padded_w: in_w + pad.left + pad.right,
            out_h,
            out_w,
            visited_h,
            visited_w,
        })
    }

    /// Element count of the padded input.
    #[must_use]
    pub fn padded_len(&self) -> usize {
        self.channels * self.padded_h * self.padded_w
    }

    #[must_use]
    pub fn out_len(&self) -> usize {
        self.out_h * self.out_w
    }

    /// Output cells the window never reaches.
    #[must_use]
    pub fn unreached_cells(&self) -> usize {
        self.out_len() - self.visited_h * self.visited_w
    }
}

fn violation(severity: Severity, rule: &str, message: String, location: &str) -> Violation {
    Violation {
        severity,
        rule: rule.to_string(),
        message,
        location: Some(location.to_string()),
    }
}

/// Report problems and approximation quirks for a convolution of
/// `input` with `kernel` under `config`, without running it.
///
/// Any [`Severity::Error`] means the convolution would fail.
pub fn check_geometry(input: [usize; 3], kernel: [usize; 3], config: &ConvConfig) -> Vec<Violation> {
    let mut violations = Vec::new();
    let [c, h, w] = input;
    let [kc, kh, kw] = kernel;
    let stride = config.stride;

    if stride.h == 0 || stride.w == 0 {
        violations.push(violation(
            Severity::Error,
            "GEOM-001",
            format!("stride must be positive, got ({}, {})", stride.h, stride.w),
            "stride",
        ));
    }
    if c != kc {
        violations.push(violation(
            Severity::Error,
            "GEOM-002",
            format!("input has {c} channels, kernel has {kc}"),
            "kernel.channels",
        ));
    }
    if kh == 0 || kw == 0 || kh > h || kw > w {
        violations.push(violation(
            Severity::Error,
            "GEOM-003",
            format!("kernel {kh}x{kw} must be non-empty and fit input {h}x{w}"),
            "kernel.extent",
        ));
    }

    if config.padding == PaddingMode::Symmetric {
        if (kh != 0 && kh % 2 == 0) || (kw != 0 && kw % 2 == 0) {
            violations.push(violation(
                Severity::Warning,
                "GEOM-004",
                format!("even kernel {kh}x{kw} with symmetric padding shrinks the padded input"),
                "padding",
            ));
        }
        if stride.h > 1 || stride.w > 1 {
            violations.push(violation(
                Severity::Warning,
                "GEOM-005",
                format!(
                    "stride ({}, {}) with symmetric padding only approximates same-size output",
                    stride.h, stride.w
                ),
                "padding",
            ));
        }
    }

    let Ok(geom) = ConvGeometry::plan(input, kernel, stride, config.padding, config.extent) else {
        return violations;
    };
    if geom.out_len() == 0 {
        violations.push(violation(
            Severity::Info,
            "GEOM-007",
            format!("output map is empty ({}x{})", geom.out_h, geom.out_w),
            "output",
        ));
    } else if geom.unreached_cells() > 0 {
        violations.push(violation(
            Severity::Warning,
            "GEOM-006",
            format!(
                "{} of {} output cells are never visited and stay zero",
                geom.unreached_cells(),
                geom.out_len()
            ),
            "extent",
        ));
    }

    violations
}
