//! Example: quantify a synthetic crack.
//!
//! Draws a meandering crack of varying width into a PNG mask, runs the full
//! pipeline on it (all metrics, all overlays) and prints the result next to
//! the values known from construction.
//!
//! Run from the workspace root:
//!   cargo run -p crack-metrology --example synthetic_crack -- --help
//!   cargo run -p crack-metrology --example synthetic_crack

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crack_metrology::{MetricKind, QuantifyConfig, QuantifyRequest, Quantifier};
use image::{GrayImage, Luma};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(about = "Generate a synthetic crack mask and quantify it")]
struct Args {
    /// Output directory for the mask, overlays and metrics table.
    #[arg(long, default_value = "outputs/synthetic")]
    out: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Widest point of the crack, in pixels.
    #[arg(long, default_value_t = 14.0)]
    max_width_px: f32,

    #[arg(long, default_value_t = 0.05)]
    pixel_size_mm: f64,
}

#[derive(Serialize)]
struct Construction {
    area_px: usize,
    max_width_px: f32,
}

/// Crack centered on a sine wave; its half width swells from 1 px at the
/// ends to `max_width / 2` in the middle. Columns within `margin` of the
/// border stay empty so both crack tips lie inside the image.
fn draw_crack(w: u32, h: u32, max_width: f32) -> (GrayImage, Construction) {
    let margin = w / 10;
    let span = (w - 2 * margin) as f32;
    let mut area_px = 0;

    let img = GrayImage::from_fn(w, h, |x, y| {
        if x < margin || x >= w - margin {
            return Luma([0]);
        }
        let t = (x - margin) as f32 / span;
        let yc = h as f32 * 0.5 + (t * std::f32::consts::TAU).sin() * h as f32 * 0.2;
        let half = 1.0 + (max_width * 0.5 - 1.0) * (t * std::f32::consts::PI).sin();
        if (y as f32 - yc).abs() <= half {
            area_px += 1;
            Luma([255])
        } else {
            Luma([0])
        }
    });

    (
        img,
        Construction {
            area_px,
            max_width_px: max_width,
        },
    )
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.width < 20 || args.height < 20 {
        bail!("image must be at least 20x20, got {}x{}", args.width, args.height);
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let mask_path = args.out.join("synthetic_crack.png");

    let (mask, truth) = draw_crack(args.width, args.height, args.max_width_px);
    mask.save(&mask_path)
        .with_context(|| format!("saving {}", mask_path.display()))?;
    println!(
        "mask written to {} ({}x{}, {} foreground px)",
        mask_path.display(),
        args.width,
        args.height,
        truth.area_px
    );

    let quantifier = Quantifier::new(QuantifyConfig {
        visual_dir: args.out.clone(),
        metrics_table: Some(args.out.join("metrics.csv")),
        ..QuantifyConfig::default()
    });
    let req = QuantifyRequest::new(&mask_path, args.pixel_size_mm)
        .with_metrics(["all"])
        .with_visuals(["all"]);

    let t0 = Instant::now();
    let res = quantifier.quantify(&req);
    let elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;

    println!("{}", serde_json::to_string_pretty(&res).context("serializing result")?);
    println!("quantify took {elapsed_ms:.2} ms");
    println!(
        "construction: {}",
        serde_json::to_string(&truth).context("serializing construction")?
    );

    if let (Some(area), Some(max_w)) = (
        res.output(MetricKind::Area),
        res.output(MetricKind::MaxWidth),
    ) {
        let s = args.pixel_size_mm;
        println!(
            "area {:.2} mm^2 (drawn {:.2}), max width {:.2} mm (drawn {:.2})",
            area,
            truth.area_px as f64 * s * s,
            max_w,
            truth.max_width_px as f64 * s
        );
    }

    Ok(())
}
