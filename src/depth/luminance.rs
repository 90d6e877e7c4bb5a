use std::path::Path;

use anyhow::{bail, Context, Result};
use image::RgbImage;
use log::info;

use crate::models::{PointCloud, PointCloudDensity, ProcessingMethod};

use super::{color::hex, processor::back_project_raster, build_point_cloud};

/// Row-major per-pixel depth in 0..=1.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Darker means further away. Uncalibrated.
pub fn luminance_to_depth(luminance: f32) -> f32 {
    (255.0 - luminance) / 255.0
}

pub fn estimate_depth(image: &RgbImage) -> DepthMap {
    let data = image
        .pixels()
        .map(|pixel| {
            let [r, g, b] = pixel.0;
            luminance_to_depth(luminance(r, g, b))
        })
        .collect();

    DepthMap {
        width: image.width(),
        height: image.height(),
        data,
    }
}

fn uri_to_path(uri: &str) -> &Path {
    Path::new(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Decodes a captured photo and back-projects its luminance depth, keeping
/// each sampled pixel's colour.
pub fn process_photo_to_point_cloud(
    uri: &str,
    name: &str,
    device_type: &str,
    density: PointCloudDensity,
) -> Result<PointCloud> {
    let path = uri_to_path(uri);
    let image = image::open(path)
        .with_context(|| format!("failed to decode photo {}", path.display()))?
        .to_rgb8();

    if image.width() == 0 || image.height() == 0 {
        bail!("photo {} has no pixels", path.display());
    }
    info!(
        "Estimating luminance depth for {}x{} photo",
        image.width(),
        image.height()
    );

    let depth = estimate_depth(&image);
    let points = back_project_raster(image.width(), image.height(), density, |px, py| {
        let value = depth.data[py as usize * depth.width as usize + px as usize];
        (value, Some(hex(image.get_pixel(px, py).0)))
    });

    Ok(build_point_cloud(
        name,
        device_type,
        0,
        points,
        Some(1),
        Some(ProcessingMethod::LuminanceDepth),
    ))
}
