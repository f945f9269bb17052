//! 2D convolution kernel.
//!
//! Windowed multiply-accumulate over a zero-bordered copy of the input.
//! Input layout: c x h x w (row-major).
//! Single kernel layout: c x kh x kw. Kernel bank layout: oc x c x kh x kw.
//! Output layout: oc x (h / stride_h) x (w / stride_w).
//!
//! Sizes, padding and the set of visited windows come from
//! [`ConvGeometry`]; see [`geometry`](super::geometry) for the policies.

use rayon::prelude::*;
use tracing::{debug, trace};

use super::geometry::{check_geometry, ConvGeometry, Stride};
use super::ops::{blit_plane, dot};
use super::Backend;
use crate::config::ConvConfig;
use crate::error::{ConvError, Result, Severity};
use crate::tensor::{Tensor2, Tensor3, Tensor4};

/// Build the zero-bordered copy of `input` described by `geom`.
///
/// # Panics
///
/// Panics if `input` does not hold `channels x in_h x in_w` elements.
pub fn pad_input(input: &[f32], geom: &ConvGeometry) -> Vec<f32> {
    let plane_in = geom.in_h * geom.in_w;
    let plane_pad = geom.padded_h * geom.padded_w;
    assert_eq!(input.len(), geom.channels * plane_in, "input length mismatch");

    let mut padded = vec![0.0f32; geom.padded_len()];
    for c in 0..geom.channels {
        blit_plane(
            &input[c * plane_in..(c + 1) * plane_in],
            geom.in_h,
            geom.in_w,
            &mut padded[c * plane_pad..(c + 1) * plane_pad],
            geom.padded_w,
            geom.padding.top,
            geom.padding.left,
        );
    }
    padded
}

/// Sum of `window * kernel` over channels and both spatial axes, for the
/// window whose top-left corner sits at `(i, j)` of the padded input.
fn window_sum(padded: &[f32], kernel: &[f32], geom: &ConvGeometry, i: usize, j: usize) -> f32 {
    let mut sum = 0.0f32;
    for c in 0..geom.channels {
        for r in 0..geom.kh {
            let p = (c * geom.padded_h + i + r) * geom.padded_w + j;
            let k = (c * geom.kh + r) * geom.kw;
            sum += dot(&padded[p..p + geom.kw], &kernel[k..k + geom.kw]);
        }
    }
    sum
}

/// Scalar reference implementation of single-kernel 2D convolution.
///
/// - `input`: flattened `c x in_h x in_w`
/// - `kernel`: flattened `c x kh x kw`
/// - `output`: flattened `out_h x out_w`; cleared, then written at the
///   `visited_h x visited_w` window positions
///
/// # Panics
///
/// Panics if any buffer length disagrees with `geom`.
pub fn conv2d_single_scalar(input: &[f32], kernel: &[f32], geom: &ConvGeometry, output: &mut [f32]) {
    assert_eq!(
        kernel.len(),
        geom.channels * geom.kh * geom.kw,
        "kernel length mismatch"
    );
    assert_eq!(
        output.len(),
        geom.out_len(),
        "output length mismatch: expected {}",
        geom.out_len()
    );

    let padded = pad_input(input, geom);
    output.fill(0.0);
    for idx_h in 0..geom.visited_h {
        let i = idx_h * geom.stride.h;
        for idx_w in 0..geom.visited_w {
            let j = idx_w * geom.stride.w;
            output[idx_h * geom.out_w + idx_w] = window_sum(&padded, kernel, geom, i, j);
        }
    }
}

/// Convolve `input` (`c x h x w`) with one `kernel` (`c x kh x kw`) under
/// the reference policy.
///
/// # Errors
///
/// [`ConvError::ShapeMismatch`](crate::error::ConvError::ShapeMismatch) on a
/// channel mismatch; [`ConvError::InvalidArgument`](crate::error::ConvError::InvalidArgument)
/// for a zero stride or a kernel that is empty or larger than the input.
pub fn convolve_one(input: &Tensor3, kernel: &Tensor3, stride: impl Into<Stride>) -> Result<Tensor2> {
    Conv2d::new(ConvConfig::with_stride(stride)).forward_one(input, kernel)
}

/// Convolve `input` with every kernel of `bank` (`oc x c x kh x kw`) and
/// stack the maps into an `oc x (h / stride_h) x (w / stride_w)` tensor.
///
/// A scalar `stride` applies to both axes.
///
/// # Errors
///
/// Same as [`convolve_one`]; the first failing kernel aborts the call.
pub fn convolve(input: &Tensor3, bank: &Tensor4, stride: impl Into<Stride>) -> Result<Tensor3> {
    Conv2d::new(ConvConfig::with_stride(stride)).forward(input, bank)
}

/// [`convolve`] with one rayon task per output channel.
///
/// # Errors
///
/// Same as [`convolve`].
pub fn convolve_parallel(input: &Tensor3, bank: &Tensor4, stride: impl Into<Stride>) -> Result<Tensor3> {
    let config = ConvConfig {
        backend: Backend::Rayon,
        ..ConvConfig::with_stride(stride)
    };
    Conv2d::new(config).forward(input, bank)
}

/// A convolution operator bound to a [`ConvConfig`].
///
/// Holds no state besides the configuration; every call builds its own
/// padded input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conv2d {
    config: ConvConfig,
}

impl Conv2d {
    #[must_use]
    pub fn new(config: ConvConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ConvConfig {
        &self.config
    }

    /// Resolve the geometry for an input and kernel shape.
    ///
    /// # Errors
    ///
    /// See [`ConvGeometry::plan`].
    pub fn plan(&self, input: [usize; 3], kernel: [usize; 3]) -> Result<ConvGeometry> {
        ConvGeometry::plan(
            input,
            kernel,
            self.config.stride,
            self.config.padding,
            self.config.extent,
        )
    }

    /// Single-kernel convolution.
    ///
    /// # Errors
    ///
    /// See [`convolve_one`].
    pub fn forward_one(&self, input: &Tensor3, kernel: &Tensor3) -> Result<Tensor2> {
        self.single(input, kernel.as_slice(), kernel.shape())
    }

    fn single(&self, input: &Tensor3, kernel: &[f32], kernel_shape: [usize; 3]) -> Result<Tensor2> {
        let geom = self.plan(input.shape(), kernel_shape)?;
        let mut out = Tensor2::zeros(geom.out_h, geom.out_w);
        conv2d_single_scalar(input.as_slice(), kernel, &geom, out.as_mut_slice());
        Ok(out)
    }

    /// Multi-kernel convolution on the configured backend.
    ///
    /// # Errors
    ///
    /// See [`convolve`].
    pub fn forward(&self, input: &Tensor3, bank: &Tensor4) -> Result<Tensor3> {
        let kernel_shape = bank.kernel_shape();
        if !bank.is_empty() && kernel_shape[0] != input.channels() {
            return Err(ConvError::ShapeMismatch {
                input_channels: input.channels(),
                kernel_channels: kernel_shape[0],
            });
        }
        let stride = self.config.stride.validate()?;
        let [_, h, w] = input.shape();
        let map_shape = [h / stride.h, w / stride.w];

        debug!(
            input = ?input.shape(),
            bank = ?bank.shape(),
            stride_h = stride.h,
            stride_w = stride.w,
            backend = ?self.config.backend,
            "conv2d forward"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            for v in check_geometry(input.shape(), kernel_shape, &self.config) {
                if v.severity == Severity::Warning {
                    debug!(rule = %v.rule, "{}", v.message);
                }
            }
        }

        let run = |n: usize| {
            trace!(channel = n, "convolving output channel");
            self.single(input, bank.kernel_slice(n), kernel_shape)
        };
        let maps = match self.config.backend {
            Backend::Scalar => (0..bank.len()).map(&run).collect::<Result<Vec<_>>>()?,
            Backend::Rayon => (0..bank.len())
                .into_par_iter()
                .map(&run)
                .collect::<Result<Vec<_>>>()?,
        };
        Tensor3::stack(maps, map_shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::geometry::{PaddingMode, WindowExtent};

    fn ramp(shape: [usize; 3]) -> Tensor3 {
        let [_, h, w] = shape;
        Tensor3::from_fn(shape, |c, r, col| ((c * h + r) * w + col) as f32)
    }

    fn identity3x3(channels: usize) -> Tensor3 {
        Tensor3::from_fn([channels, 3, 3], |_, r, c| if r == 1 && c == 1 { 1.0 } else { 0.0 })
    }

    fn same_full_grid(stride: impl Into<Stride>) -> Conv2d {
        Conv2d::new(ConvConfig {
            stride: stride.into(),
            padding: PaddingMode::Same,
            extent: WindowExtent::FullGrid,
            ..ConvConfig::default()
        })
    }

    // ---------------------------------------------------------------
    // Reference policy
    // ---------------------------------------------------------------

    #[test]
    fn unit_kernel_on_ones_leaves_last_row_and_col_zero() {
        let input = Tensor3::from_fn([1, 4, 4], |_, _, _| 1.0);
        let kernel = Tensor3::from_vec([1, 1, 1], vec![1.0]).unwrap();
        let out = convolve_one(&input, &kernel, (1, 1)).unwrap();

        assert_eq!(out.shape(), [4, 4]);
        for r in 0..4 {
            for c in 0..4 {
                let expected = if r < 3 && c < 3 { 1.0 } else { 0.0 };
                assert_eq!(out[[r, c]], expected, "cell ({r}, {c})");
            }
        }
    }

    #[test]
    fn window_origin_is_in_padded_coordinates() {
        // 4x4 ramp 0..16, 3x3 ones: only (0,0) is visited, and its window
        // covers the one-element border plus input[0..2, 0..2].
        let input = ramp([1, 4, 4]);
        let kernel = Tensor3::from_fn([1, 3, 3], |_, _, _| 1.0);
        let out = convolve_one(&input, &kernel, 1).unwrap();

        assert_eq!(out[[0, 0]], 0.0 + 1.0 + 4.0 + 5.0);
        assert_eq!(out.as_slice().iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn identity_kernel_copies_visited_region() {
        let input = ramp([1, 5, 5]);
        let out = convolve_one(&input, &identity3x3(1), 1).unwrap();

        assert_eq!(out.shape(), [5, 5]);
        assert_eq!(out.row(0), &[0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(out.row(1), &[5.0, 6.0, 0.0, 0.0, 0.0]);
        assert_eq!(out.row(2), &[0.0; 5]);
    }

    #[test]
    fn channels_are_summed() {
        let input = Tensor3::from_fn([2, 3, 3], |c, _, _| (c + 1) as f32);
        let kernel = Tensor3::from_vec([2, 1, 1], vec![1.0, 10.0]).unwrap();
        let out = convolve_one(&input, &kernel, 1).unwrap();

        assert_eq!(out[[0, 0]], 21.0);
        assert_eq!(out[[1, 1]], 21.0);
        assert_eq!(out[[2, 2]], 0.0);
    }

    #[test]
    fn stride_two_shape_and_values() {
        let input = ramp([1, 6, 6]);
        let kernel = Tensor3::from_vec([1, 1, 1], vec![1.0]).unwrap();
        let out = convolve_one(&input, &kernel, 2).unwrap();

        // range(0, 5, 2) = [0, 2, 4]: all three rows/cols fit in 6 / 2.
        assert_eq!(out.shape(), [3, 3]);
        assert_eq!(out.row(0), &[0.0, 2.0, 4.0]);
        assert_eq!(out.row(2), &[24.0, 26.0, 28.0]);
    }

    #[test]
    fn input_smaller_than_stride_gives_empty_map() {
        let input = Tensor3::zeros([1, 2, 2]);
        let kernel = Tensor3::from_vec([1, 1, 1], vec![1.0]).unwrap();
        let out = convolve_one(&input, &kernel, 3).unwrap();
        assert_eq!(out.shape(), [0, 0]);
    }

    #[test]
    fn channel_mismatch() {
        let input = Tensor3::zeros([3, 4, 4]);
        let kernel = Tensor3::zeros([2, 1, 1]);
        let err = convolve_one(&input, &kernel, 1).unwrap_err();
        assert!(matches!(
            err,
            ConvError::ShapeMismatch {
                input_channels: 3,
                kernel_channels: 2
            }
        ));
    }

    #[test]
    fn zero_stride_rejected() {
        let input = Tensor3::zeros([1, 4, 4]);
        let kernel = Tensor3::zeros([1, 1, 1]);
        assert!(matches!(
            convolve_one(&input, &kernel, (0, 1)),
            Err(ConvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_kernel_rejected() {
        let input = Tensor3::zeros([1, 5, 5]);
        let kernel = Tensor3::zeros([1, 0, 1]);
        assert!(matches!(
            convolve_one(&input, &kernel, 1),
            Err(ConvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_kernel_rejected() {
        let input = Tensor3::zeros([1, 2, 2]);
        let kernel = Tensor3::zeros([1, 3, 3]);
        assert!(matches!(
            convolve_one(&input, &kernel, 1),
            Err(ConvError::InvalidArgument(_))
        ));
    }

    // ---------------------------------------------------------------
    // Same padding, full grid
    // ---------------------------------------------------------------

    #[test]
    fn full_grid_identity_is_exact_copy() {
        let input = ramp([2, 5, 4]);
        let out = same_full_grid(1)
            .forward_one(&input, &Tensor3::from_fn([2, 3, 3], |c, r, col| {
                if c == 0 && r == 1 && col == 1 { 1.0 } else { 0.0 }
            }))
            .unwrap();
        assert_eq!(out.as_slice(), input.channel(0));
    }

    #[test]
    fn full_grid_identity_with_stride_subsamples() {
        let input = ramp([1, 6, 6]);
        let out = same_full_grid(2).forward_one(&input, &identity3x3(1)).unwrap();
        assert_eq!(out.shape(), [3, 3]);
        assert_eq!(out.row(0), &[0.0, 2.0, 4.0]);
        assert_eq!(out.row(1), &[12.0, 14.0, 16.0]);
        assert_eq!(out.row(2), &[24.0, 26.0, 28.0]);
    }

    #[test]
    fn full_grid_even_kernel_pads_after() {
        let input = Tensor3::from_vec([1, 3, 3], (1..=9).map(|v| v as f32).collect()).unwrap();
        let kernel = Tensor3::from_fn([1, 2, 2], |_, _, _| 1.0);
        let out = same_full_grid(1).forward_one(&input, &kernel).unwrap();
        assert_eq!(
            out.as_slice(),
            &[12.0, 16.0, 9.0, 24.0, 28.0, 15.0, 15.0, 17.0, 9.0]
        );
    }

    // ---------------------------------------------------------------
    // Kernel bank
    // ---------------------------------------------------------------

    #[test]
    fn bank_matches_individual_kernels() {
        let input = ramp([2, 6, 6]);
        let k0 = Tensor3::from_fn([2, 3, 3], |c, r, col| (c + r + col) as f32 * 0.5);
        let k1 = Tensor3::from_fn([2, 3, 3], |c, r, col| if (c + r + col) % 2 == 0 { 1.0 } else { -1.0 });
        let bank = Tensor4::from_kernels(&[k0.clone(), k1.clone()]).unwrap();

        let out = convolve(&input, &bank, 1).unwrap();
        assert_eq!(out.shape()[0], 2);
        assert_eq!(out.map(0), convolve_one(&input, &k0, 1).unwrap());
        assert_eq!(out.map(1), convolve_one(&input, &k1, 1).unwrap());

        let mut flat = convolve_one(&input, &k0, 1).unwrap().into_vec();
        flat.extend(convolve_one(&input, &k1, 1).unwrap().into_vec());
        assert_eq!(out.into_vec(), flat);
    }

    #[test]
    fn scalar_stride_equals_pair() {
        let input = ramp([1, 7, 7]);
        let bank = Tensor4::from_kernels(&[identity3x3(1)]).unwrap();
        assert_eq!(
            convolve(&input, &bank, 2).unwrap(),
            convolve(&input, &bank, (2, 2)).unwrap()
        );
    }

    #[test]
    fn bank_channel_mismatch_aborts() {
        let input = Tensor3::zeros([1, 4, 4]);
        let bank = Tensor4::zeros([3, 2, 1, 1]);
        assert!(matches!(
            convolve(&input, &bank, 1),
            Err(ConvError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            convolve_parallel(&input, &bank, 1),
            Err(ConvError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn bank_reports_channel_mismatch_before_stride() {
        let input = Tensor3::zeros([1, 4, 4]);
        let bank = Tensor4::zeros([1, 2, 1, 1]);
        let expect_mismatch = |r: Result<Tensor3>| {
            assert!(matches!(
                r,
                Err(ConvError::ShapeMismatch {
                    input_channels: 1,
                    kernel_channels: 2
                })
            ));
        };
        expect_mismatch(convolve(&input, &bank, (0, 1)));
        expect_mismatch(convolve_parallel(&input, &bank, (0, 1)));
        assert!(matches!(
            convolve_one(&input, &bank.kernel(0), (0, 1)),
            Err(ConvError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn bank_zero_stride_rejected() {
        let input = Tensor3::zeros([1, 4, 4]);
        let bank = Tensor4::zeros([2, 1, 1, 1]);
        assert!(matches!(
            convolve(&input, &bank, (1, 0)),
            Err(ConvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn operator_keeps_its_config() {
        let config = ConvConfig {
            padding: PaddingMode::Same,
            ..ConvConfig::with_stride((2, 1))
        };
        let conv = Conv2d::new(config);
        assert_eq!(conv.config(), &config);
        assert_eq!(conv.config().stride, Stride::new(2, 1));
    }

    #[test]
    fn empty_bank_gives_empty_output() {
        let input = Tensor3::zeros([1, 4, 4]);
        let bank = Tensor4::zeros([0, 1, 1, 1]);
        let out = convolve(&input, &bank, 2).unwrap();
        assert_eq!(out.shape(), [0, 2, 2]);
    }

    #[test]
    fn parallel_is_bit_identical() {
        let input = Tensor3::from_fn([3, 9, 8], |c, r, col| ((c * 31 + r * 7 + col * 3) % 11) as f32 * 0.37 - 1.5);
        let kernels: Vec<Tensor3> = (0..5)
            .map(|n| Tensor3::from_fn([3, 3, 2], |c, r, col| ((n + c * 5 + r * 3 + col) % 7) as f32 * 0.11 - 0.3))
            .collect();
        let bank = Tensor4::from_kernels(&kernels).unwrap();

        let seq = convolve(&input, &bank, (2, 1)).unwrap();
        let par = convolve_parallel(&input, &bank, (2, 1)).unwrap();
        assert_eq!(seq, par);
    }

    // ---------------------------------------------------------------
    // Flat-slice kernel
    // ---------------------------------------------------------------

    #[test]
    fn scalar_kernel_clears_stale_output() {
        let geom = Conv2d::default().plan([1, 3, 3], [1, 1, 1]).unwrap();
        let input = [1.0f32; 9];
        let mut output = [7.0f32; 9];
        conv2d_single_scalar(&input, &[2.0], &geom, &mut output);
        assert_eq!(output, [2.0, 2.0, 0.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "output length mismatch")]
    fn scalar_kernel_output_length_checked() {
        let geom = Conv2d::default().plan([1, 3, 3], [1, 1, 1]).unwrap();
        let mut output = [0.0f32; 4];
        conv2d_single_scalar(&[0.0; 9], &[1.0], &geom, &mut output);
    }

    #[test]
    fn pad_input_places_interior() {
        let geom = Conv2d::default().plan([1, 3, 2], [1, 3, 1]).unwrap();
        let padded = pad_input(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &geom);
        assert_eq!((geom.padded_h, geom.padded_w), (5, 2));
        assert_eq!(
            padded,
            vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 0.0]
        );
    }
}
