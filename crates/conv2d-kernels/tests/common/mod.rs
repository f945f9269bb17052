//! Shared helpers for the convolution falsification tests.

#![allow(dead_code)]

use conv2d_kernels::tensor::{Tensor3, Tensor4};

/// Deterministic pseudo-random tensor with values in roughly `[-1, 1]`.
pub fn hashed_tensor3(shape: [usize; 3], seed: usize) -> Tensor3 {
    Tensor3::from_fn(shape, |c, h, w| {
        let v = (seed * 131 + c * 31 + h * 17 + w * 7) % 23;
        v as f32 / 11.0 - 1.0
    })
}

/// Deterministic kernel bank of `oc` kernels shaped `kernel`.
pub fn hashed_bank(oc: usize, kernel: [usize; 3], seed: usize) -> Tensor4 {
    let kernels: Vec<Tensor3> = (0..oc)
        .map(|n| hashed_tensor3(kernel, seed + n + 1))
        .collect();
    Tensor4::from_kernels(&kernels).expect("kernels share a shape")
}

/// Asserts two slices agree element-wise within an absolute tolerance.
pub fn assert_close(a: &[f32], b: &[f32], tol: f32, context: &str) {
    assert_eq!(a.len(), b.len(), "{context}: length mismatch");
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!(
            (x - y).abs() <= tol,
            "{context}: element [{i}] differs: {x} vs {y} (tol={tol})"
        );
    }
}

/// Direct zero-padded convolution with explicit padding, evaluated at
/// `out_h x out_w` origins spaced by the stride. Independent of the crate's
/// padded-buffer construction.
#[allow(clippy::too_many_arguments)]
pub fn direct_conv(
    input: &Tensor3,
    kernel: &Tensor3,
    pad_top: usize,
    pad_left: usize,
    stride: (usize, usize),
    out_h: usize,
    out_w: usize,
) -> Vec<f32> {
    let [c, h, w] = input.shape();
    let [_, kh, kw] = kernel.shape();
    let mut out = vec![0.0f32; out_h * out_w];
    for oh in 0..out_h {
        for ow in 0..out_w {
            let mut sum = 0.0f32;
            for ci in 0..c {
                for r in 0..kh {
                    for s in 0..kw {
                        let y = (oh * stride.0 + r) as isize - pad_top as isize;
                        let x = (ow * stride.1 + s) as isize - pad_left as isize;
                        if y >= 0 && x >= 0 && (y as usize) < h && (x as usize) < w {
                            sum += input[[ci, y as usize, x as usize]] * kernel[[ci, r, s]];
                        }
                    }
                }
            }
            out[oh * out_w + ow] = sum;
        }
    }
    out
}
