//! End-to-end tests against a live vision provider.
//!
//! These make real API calls and are gated behind `E2E_ENABLED` so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 ANTHROPIC_API_KEY=... cargo test --test e2e -- --nocapture

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use img2build::{generate, generate_to_file, inspect, GenerationConfig};
use std::io::Cursor;

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

/// A crude "house": grey walls, a brown roof band, a dark door.
fn house_png() -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(256, 256, Rgba([135, 206, 235, 255]));
    for y in 96..256 {
        for x in 48..208 {
            img.put_pixel(x, y, Rgba([128, 128, 128, 255]));
        }
    }
    for y in 64..96 {
        for x in 32..224 {
            img.put_pixel(x, y, Rgba([120, 72, 40, 255]));
        }
    }
    for y in 192..256 {
        for x in 112..144 {
            img.put_pixel(x, y, Rgba([40, 30, 20, 255]));
        }
    }
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

#[tokio::test]
async fn e2e_generate_small_house() {
    e2e_skip_unless_enabled!();

    let config = GenerationConfig::builder()
        .max_output_tokens(4096)
        .build()
        .unwrap();
    let out = generate(&house_png(), "A tiny house, at most 60 blocks.", &config)
        .await
        .unwrap_or_else(|e| panic!("generation failed: {e}\nraw: {:?}", e.raw_response));

    println!("{}", out.plan.to_json_pretty());
    assert!(!out.plan.name.trim().is_empty());
    assert!(!out.plan.is_empty(), "model returned no blocks");
    assert!(out.stats.output_tokens > 0);
}

#[tokio::test]
async fn e2e_generate_to_file() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let img_path = dir.path().join("house.png");
    std::fs::write(&img_path, house_png()).unwrap();
    let out_path = dir.path().join("house.json");

    let config = GenerationConfig::builder()
        .max_output_tokens(4096)
        .build()
        .unwrap();
    let out = generate_to_file(img_path.to_str().unwrap(), &out_path, "", &config)
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.contains(&out.plan.name));
}

#[tokio::test]
async fn inspect_needs_no_provider() {
    let dir = tempfile::tempdir().unwrap();
    let img_path = dir.path().join("house.png");
    std::fs::write(&img_path, house_png()).unwrap();

    let config = GenerationConfig::builder().max_edge(128).build().unwrap();
    let info = inspect(img_path.to_str().unwrap(), &config).await.unwrap();
    assert_eq!((info.original_width, info.original_height), (256, 256));
    assert_eq!((info.normalized_width, info.normalized_height), (128, 128));
    assert!(info.encoded_bytes > 0);
}
