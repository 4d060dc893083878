//! Diagnostic visualizer: renders a wtd snapshot JSON to a PNG.
//! Not part of the main pipeline; no tests, no clippy target.
//!
//! Usage: `visualize <snapshot.json> [out.png]`

use std::env;
use std::fs;
use std::path::Path;

use wtm_core::Field2D;

/// Depth at which the below-surface ramp saturates to full brown, metres.
const DEEP_M: f32 = 50.0;

// ── Colour helpers ────────────────────────────────────────────────────────────

/// wtd (metres, negative = below surface) → RGB.
/// Surface water (wtd ≥ 0) in blue, deeper blue with more standing water;
/// dry cells ramp white (shallow water table) → brown (deep).
fn wtd_to_rgb(wtd: f32) -> [u8; 3] {
    if wtd >= 0.0 {
        let t = (wtd / 5.0).clamp(0.0, 1.0);
        let g = (160.0 - 90.0 * t) as u8;
        [30, g, 220]
    } else {
        let t = (-wtd / DEEP_M).clamp(0.0, 1.0);
        let r = (255.0 - 116.0 * t) as u8; // 255 → 139 (saddle brown)
        let g = (255.0 - 186.0 * t) as u8; // 255 → 69
        let b = (255.0 - 236.0 * t) as u8; // 255 → 19
        [r, g, b]
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <snapshot.json> [out.png]", args[0]);
        std::process::exit(1);
    }
    let input = Path::new(&args[1]);
    let default_out = input.with_extension("png");
    let output = args
        .get(2)
        .map(Path::new)
        .unwrap_or(default_out.as_path());

    let text = fs::read_to_string(input).expect("cannot read snapshot file");
    let field: Field2D = serde_json::from_str(&text).expect("snapshot is not a Field2D JSON");

    println!(
        "Rendering {}×{} wtd field (min {:.2} m, max {:.2} m)…",
        field.width,
        field.height,
        field.min_value(),
        field.max_value()
    );

    let mut img = image::RgbImage::new(field.width as u32, field.height as u32);
    for y in 0..field.height {
        for x in 0..field.width {
            let [r, g, b] = wtd_to_rgb(field.get(x, y));
            // Row 0 is the southern edge; PNG row 0 is the top.
            let py = (field.height - 1 - y) as u32;
            img.put_pixel(x as u32, py, image::Rgb([r, g, b]));
        }
    }
    img.save(output).expect("failed to save PNG");
    println!("Wrote {}", output.display());
}
