//! Convolution kernels: flat-slice scalar reference plus tensor-level
//! single-kernel and multi-kernel entry points.

// Kernel code naturally uses single-character math variable names (c, h, w, i, j).
#![allow(
    clippy::many_single_char_names,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::needless_range_loop,
    clippy::float_cmp,
    clippy::doc_markdown
)]

use serde::{Deserialize, Serialize};

pub mod conv2d;
pub mod geometry;
pub mod ops;

#[cfg(kani)]
mod kani_proofs;

/// Backend selector for the multi-kernel loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Output channels in index order on the calling thread.
    #[default]
    Scalar,
    /// One rayon task per output channel, joined in index order.
    Rayon,
}
