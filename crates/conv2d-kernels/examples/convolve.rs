//! Convolve a small synthetic image with an edge-detector bank and print
//! the output maps plus any geometry diagnostics.
//!
//! Usage:
//!   cargo run --example convolve
//!   RUST_LOG=debug cargo run --example convolve -- conv.yaml

use std::path::PathBuf;
use std::process;

use conv2d_kernels::error::Severity;
use conv2d_kernels::{check_geometry, parse_config, Conv2d, ConvConfig, Tensor3, Tensor4};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn severity_tag(s: Severity) -> &'static str {
    match s {
        Severity::Error => "ERROR",
        Severity::Warning => "WARN",
        Severity::Info => "INFO",
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => parse_config(&path).unwrap_or_else(|e| {
            eprintln!("Failed to parse {}: {e}", path.display());
            process::exit(1);
        }),
        None => ConvConfig::default(),
    };
    info!(?config, "loaded config");

    // 8x8 single-channel image with a bright vertical bar.
    let image = Tensor3::from_fn([1, 8, 8], |_, _, w| if (3..5).contains(&w) { 1.0 } else { 0.0 });

    #[rustfmt::skip]
    let bank = Tensor4::from_vec([2, 1, 3, 3], vec![
        // vertical edges
        -1.0, 0.0, 1.0,
        -1.0, 0.0, 1.0,
        -1.0, 0.0, 1.0,
        // horizontal edges
        -1.0, -1.0, -1.0,
         0.0,  0.0,  0.0,
         1.0,  1.0,  1.0,
    ])
    .unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    for v in check_geometry(image.shape(), bank.kernel_shape(), &config) {
        let loc = v.location.as_deref().unwrap_or("?");
        println!("[{}] {} at {}: {}", severity_tag(v.severity), v.rule, loc, v.message);
    }

    let out = Conv2d::new(config).forward(&image, &bank).unwrap_or_else(|e| {
        eprintln!("Convolution failed: {e}");
        process::exit(1);
    });

    let [oc, oh, _] = out.shape();
    for n in 0..oc {
        println!("\nOutput channel {n}:");
        let map = out.map(n);
        for r in 0..oh {
            let row: Vec<String> = map.row(r).iter().map(|v| format!("{v:5.1}")).collect();
            println!("  {}", row.join(" "));
        }
    }
}
