//! Kani bounded model checking harnesses for the convolution geometry.
//!
//! Run with `cargo kani`. Sizes are bounded for tractability.

use super::conv2d;
use super::geometry::{ConvGeometry, PaddingMode, Stride, WindowExtent};

fn any_geometry(padding: PaddingMode, extent: WindowExtent) -> ConvGeometry {
    let h: usize = kani::any();
    let w: usize = kani::any();
    let kh: usize = kani::any();
    let kw: usize = kani::any();
    let sh: usize = kani::any();
    let sw: usize = kani::any();
    kani::assume((1..=8).contains(&h) && (1..=8).contains(&w));
    kani::assume((1..=h).contains(&kh) && (1..=w).contains(&kw));
    kani::assume((1..=4).contains(&sh) && (1..=4).contains(&sw));

    match ConvGeometry::plan([1, h, w], [1, kh, kw], Stride::new(sh, sw), padding, extent) {
        Ok(g) => g,
        Err(_) => unreachable!("bounded inputs are valid"),
    }
}

fn assert_windows_fit(g: &ConvGeometry) {
    assert!(g.visited_h <= g.out_h);
    assert!(g.visited_w <= g.out_w);
    assert_eq!(g.out_h, g.in_h / g.stride.h);
    assert_eq!(g.out_w, g.in_w / g.stride.w);
    if g.visited_h > 0 {
        assert!((g.visited_h - 1) * g.stride.h + g.kh <= g.padded_h);
    }
    if g.visited_w > 0 {
        assert!((g.visited_w - 1) * g.stride.w + g.kw <= g.padded_w);
    }
}

/// KANI-C2D-001: every visited window of the reference policy lies inside
/// the padded input and inside the declared output.
#[kani::proof]
#[kani::unwind(9)]
fn verify_reference_windows_in_bounds() {
    let g = any_geometry(PaddingMode::Symmetric, WindowExtent::Reference);
    assert_windows_fit(&g);
}

/// KANI-C2D-002: full-grid traversal visits every output cell and still
/// stays inside the padded input, for either padding mode.
#[kani::proof]
#[kani::unwind(9)]
fn verify_full_grid_windows_in_bounds() {
    let padding = if kani::any() {
        PaddingMode::Symmetric
    } else {
        PaddingMode::Same
    };
    let g = any_geometry(padding, WindowExtent::FullGrid);
    assert_windows_fit(&g);
    assert_eq!(g.unreached_cells(), 0);
}

/// KANI-C2D-003: a zero input convolves to a zero output.
#[kani::proof]
#[kani::unwind(17)]
fn verify_zero_input_zero_output() {
    const H: usize = 4;
    const W: usize = 4;
    let g = match ConvGeometry::plan(
        [1, H, W],
        [1, 3, 3],
        Stride::UNIT,
        PaddingMode::Symmetric,
        WindowExtent::Reference,
    ) {
        Ok(g) => g,
        Err(_) => unreachable!(),
    };
    let kernel: [f32; 9] = kani::any();
    kani::assume(kernel.iter().all(|x| x.is_finite()));

    let input = [0.0f32; H * W];
    let mut output = [1.0f32; H * W];
    conv2d::conv2d_single_scalar(&input, &kernel, &g, &mut output);
    assert!(output.iter().all(|&v| v == 0.0));
}
