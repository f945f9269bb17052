//! Shared primitives for the windowed convolution: row dot product and
//! plane copy into a zero-bordered buffer.

/// Dot product of two slices.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for i in 0..a.len() {
        sum += a[i] * b[i];
    }
    sum
}

/// Copy an `h x w` plane into `dst`, a row-major plane `dst_w` wide,
/// with its top-left corner at `(top, left)`.
pub fn blit_plane(src: &[f32], h: usize, w: usize, dst: &mut [f32], dst_w: usize, top: usize, left: usize) {
    debug_assert_eq!(src.len(), h * w);
    debug_assert!(left + w <= dst_w);
    for r in 0..h {
        let d = (top + r) * dst_w + left;
        dst[d..d + w].copy_from_slice(&src[r * w..(r + 1) * w]);
    }
}
