//! # conv2d-kernels
//!
//! 2D convolution from first principles.
//!
//! A reference implementation of the multi-channel convolution used by CNN
//! layers: zero "same" padding, configurable stride, and an explicit
//! windowed multiply-accumulate per output cell.
//!
//! ## Modules
//!
//! - [`kernels`] — Flat-slice scalar kernel, single-kernel and kernel-bank convolution
//! - [`tensor`] — Dense row-major tensors of rank 2, 3 and 4
//! - [`config`] — YAML-loadable convolution settings
//! - [`error`] — Error type and geometry diagnostics
//!
//! ## Example
//!
//! ```
//! use conv2d_kernels::kernels::conv2d::convolve;
//! use conv2d_kernels::tensor::{Tensor3, Tensor4};
//!
//! let input = Tensor3::from_fn([1, 4, 4], |_, _, _| 1.0);
//! let bank = Tensor4::from_vec([1, 1, 1, 1], vec![1.0]).unwrap();
//! let out = convolve(&input, &bank, 1).unwrap();
//! assert_eq!(out.shape(), [1, 4, 4]);
//! ```

pub mod config;
pub mod error;
pub mod kernels;
pub mod tensor;

pub use config::{parse_config, parse_config_str, ConvConfig};
pub use error::{ConvError, Result};
pub use kernels::conv2d::{convolve, convolve_one, convolve_parallel, Conv2d};
pub use kernels::geometry::{check_geometry, ConvGeometry, PaddingMode, Stride, WindowExtent};
pub use kernels::Backend;
pub use tensor::{Tensor2, Tensor3, Tensor4};
