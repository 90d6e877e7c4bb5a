use std::f32::consts::TAU;

use anyhow::{bail, Result};
use chrono::Utc;
use log::info;
use rand::Rng;
use uuid::Uuid;

use crate::models::{
    CapturedFrame, Point3D, PointCloud, PointCloudDensity, PointCloudMetadata, ProcessingMethod,
};

use super::{bounds::calculate_bounding_box, color::hsl};

const TARGET_FRAME_POINTS: usize = 1_000;
const MIN_POINTS_PER_FRAME: usize = 50;
const POSITION_JITTER: f32 = 0.02;
const INTENSITY_JITTER: f32 = 0.1;

/// Raster samples at or below this depth are treated as background.
const MIN_RASTER_DEPTH: f32 = 0.1;

/// Accepted depth range for raw LiDAR buffers, in metres.
const LIDAR_MAX_DEPTH: f32 = 10.0;
const LIDAR_PIXEL_SCALE: f32 = 0.001;

pub(crate) fn build_point_cloud(
    name: &str,
    device_type: &str,
    scan_duration: u64,
    points: Vec<Point3D>,
    frame_count: Option<usize>,
    processing_method: Option<ProcessingMethod>,
) -> PointCloud {
    let bounding_box = calculate_bounding_box(&points);
    PointCloud {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        timestamp: Utc::now(),
        metadata: PointCloudMetadata {
            device_type: device_type.to_string(),
            scan_duration,
            point_count: points.len(),
            bounding_box,
            frame_count,
            processing_method,
        },
        points,
    }
}

pub fn process_frames_to_point_cloud(
    frames: &[CapturedFrame],
    name: &str,
    device_type: &str,
    scan_duration: u64,
) -> Result<PointCloud> {
    process_frames_to_point_cloud_with_rng(
        frames,
        name,
        device_type,
        scan_duration,
        &mut rand::thread_rng(),
    )
}

/// Scatters a shell of points around every frame position.
pub fn process_frames_to_point_cloud_with_rng<R: Rng + ?Sized>(
    frames: &[CapturedFrame],
    name: &str,
    device_type: &str,
    scan_duration: u64,
    rng: &mut R,
) -> Result<PointCloud> {
    info!("Processing {} frames to point cloud", frames.len());

    if frames.is_empty() {
        bail!("No frames to process");
    }

    let points_per_frame = (TARGET_FRAME_POINTS / frames.len()).max(MIN_POINTS_PER_FRAME);
    let mut points = Vec::with_capacity(points_per_frame * frames.len());

    for frame in frames {
        let base = frame.position;
        for index in 0..points_per_frame {
            let radius = 0.1 + rng.gen::<f32>() * 0.2;
            let theta = rng.gen::<f32>() * TAU;
            let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();

            points.push(Point3D {
                x: base.x + radius * phi.sin() * theta.cos(),
                y: base.y + radius * phi.sin() * theta.sin(),
                z: base.z + radius * phi.cos(),
                color: Some(frame_point_color(frame, index, rng)),
                intensity: Some(rng.gen()),
            });
        }
    }

    add_noise(&mut points, rng);

    let cloud = build_point_cloud(
        name,
        device_type,
        scan_duration,
        points,
        Some(frames.len()),
        Some(ProcessingMethod::StructureFromMotion),
    );
    info!("Generated point cloud with {} points", cloud.points.len());
    Ok(cloud)
}

fn frame_point_color<R: Rng + ?Sized>(frame: &CapturedFrame, index: usize, rng: &mut R) -> String {
    let p = frame.position;
    let hue = (p.x + p.y + p.z + index as f32).rem_euclid(360.0);
    let saturation = 70.0 + rng.gen::<f32>() * 30.0;
    let lightness = 40.0 + rng.gen::<f32>() * 30.0;
    hsl(hue, saturation, lightness)
}

fn add_noise<R: Rng + ?Sized>(points: &mut [Point3D], rng: &mut R) {
    for point in points {
        point.x += (rng.gen::<f32>() - 0.5) * POSITION_JITTER;
        point.y += (rng.gen::<f32>() - 0.5) * POSITION_JITTER;
        point.z += (rng.gen::<f32>() - 0.5) * POSITION_JITTER;
        let intensity = point.intensity.unwrap_or(0.0) + (rng.gen::<f32>() - 0.5) * INTENSITY_JITTER;
        point.intensity = Some(intensity.clamp(0.0, 1.0));
    }
}

/// Walks a `width` x `height` raster at the density stride, mapping each
/// sample to image-plane coordinates normalised by the raster size.
pub(crate) fn back_project_raster<F>(
    width: u32,
    height: u32,
    density: PointCloudDensity,
    mut sample: F,
) -> Vec<Point3D>
where
    F: FnMut(u32, u32) -> (f32, Option<String>),
{
    let stride = density.stride();
    let (w, h) = (width as f32, height as f32);
    let mut points = Vec::new();

    for py in (0..height).step_by(stride) {
        for px in (0..width).step_by(stride) {
            let (depth, color) = sample(px, py);
            // NaN marks an invalid sample and fails every comparison.
            if !(depth > MIN_RASTER_DEPTH) {
                continue;
            }

            points.push(Point3D {
                x: (px as f32 - w / 2.0) / w,
                y: (h / 2.0 - py as f32) / h,
                z: depth,
                color,
                intensity: Some(depth.min(1.0)),
            });
        }
    }

    points
}

/// Back-projects a row-major depth raster.
pub fn generate_point_cloud(
    depth_data: &[f32],
    width: u32,
    height: u32,
    density: PointCloudDensity,
) -> Result<Vec<Point3D>> {
    let expected = width as usize * height as usize;
    if depth_data.len() < expected {
        bail!(
            "depth buffer has {} samples, expected {}x{} = {}",
            depth_data.len(),
            width,
            height,
            expected
        );
    }

    Ok(back_project_raster(width, height, density, |px, py| {
        (depth_data[py as usize * width as usize + px as usize], None)
    }))
}

/// Converts a raw LiDAR depth buffer, sampling every second pixel.
pub fn process_lidar_depth_to_point_cloud(
    depth_data: &[f32],
    width: u32,
    height: u32,
    name: &str,
    device_type: &str,
    scan_duration: u64,
) -> Result<PointCloud> {
    info!("Processing LiDAR depth data {}x{}", width, height);

    let expected = width as usize * height as usize;
    if depth_data.len() < expected {
        bail!(
            "depth buffer has {} samples, expected {}",
            depth_data.len(),
            expected
        );
    }

    let (w, h) = (width as f32, height as f32);
    let mut points = Vec::new();
    for y in (0..height).step_by(2) {
        for x in (0..width).step_by(2) {
            let depth = depth_data[y as usize * width as usize + x as usize];
            if !(depth > 0.0 && depth < LIDAR_MAX_DEPTH) {
                continue;
            }

            points.push(
                Point3D::new(
                    (x as f32 - w / 2.0) * depth * LIDAR_PIXEL_SCALE,
                    (y as f32 - h / 2.0) * depth * LIDAR_PIXEL_SCALE,
                    depth,
                )
                .with_intensity(depth / LIDAR_MAX_DEPTH),
            );
        }
    }

    let cloud = build_point_cloud(
        name,
        device_type,
        scan_duration,
        points,
        Some(1),
        Some(ProcessingMethod::LidarDepth),
    );
    info!("Generated LiDAR point cloud with {} points", cloud.points.len());
    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Vector3;
    use rand::{rngs::StdRng, SeedableRng};

    fn frames_at(positions: &[(f32, f32, f32)]) -> Vec<CapturedFrame> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| {
                let mut frame =
                    CapturedFrame::new(format!("frame-{i}"), Utc::now(), format!("file:///{i}.jpg"));
                frame.position = Vector3::new(x, y, z);
                frame
            })
            .collect()
    }

    #[test]
    fn empty_frames_are_rejected() {
        let err = process_frames_to_point_cloud(&[], "scan", "Camera Device", 0).unwrap_err();
        assert!(err.to_string().contains("No frames"));
    }

    #[test]
    fn point_count_matches_metadata_and_bbox_contains_all() {
        let mut rng = StdRng::seed_from_u64(7);
        let frames = frames_at(&[(0.5, 0.0, 0.0), (0.0, 0.5, 0.2), (-0.5, 0.0, -0.1)]);

        let cloud =
            process_frames_to_point_cloud_with_rng(&frames, "scan", "Camera Device", 1200, &mut rng)
                .unwrap();

        // floor(1000 / 3) per frame
        assert_eq!(cloud.points.len(), 333 * 3);
        assert_eq!(cloud.metadata.point_count, cloud.points.len());
        assert_eq!(cloud.metadata.frame_count, Some(3));
        assert_eq!(
            cloud.metadata.processing_method,
            Some(ProcessingMethod::StructureFromMotion)
        );
        let bbox = &cloud.metadata.bounding_box;
        assert!(cloud.points.iter().all(|p| bbox.contains(p)));
    }

    #[test]
    fn many_frames_keep_minimum_cluster_size() {
        let mut rng = StdRng::seed_from_u64(1);
        let positions: Vec<_> = (0..40).map(|i| (i as f32 * 0.01, 0.0, 0.0)).collect();
        let frames = frames_at(&positions);

        let cloud =
            process_frames_to_point_cloud_with_rng(&frames, "scan", "dev", 0, &mut rng).unwrap();
        assert_eq!(cloud.points.len(), 50 * 40);
    }

    #[test]
    fn points_stay_near_their_frame() {
        let mut rng = StdRng::seed_from_u64(3);
        let frames = frames_at(&[(2.0, -1.0, 0.5)]);

        let cloud =
            process_frames_to_point_cloud_with_rng(&frames, "scan", "dev", 0, &mut rng).unwrap();
        for p in &cloud.points {
            let d = ((p.x - 2.0).powi(2) + (p.y + 1.0).powi(2) + (p.z - 0.5).powi(2)).sqrt();
            // shell radius 0.1..0.3 plus at most 0.01 jitter per axis
            assert!(d > 0.08 && d < 0.32, "distance {d}");
            let intensity = p.intensity.unwrap();
            assert!((0.0..=1.0).contains(&intensity));
            assert!(p.color.as_deref().unwrap().starts_with("hsl("));
        }
    }

    #[test]
    fn raster_respects_stride_and_threshold() {
        // 4x2 raster, right half is background
        let depth = vec![0.5, 0.5, 0.05, 0.1, 0.9, 0.9, 0.0, 0.0];

        let high = generate_point_cloud(&depth, 4, 2, PointCloudDensity::High).unwrap();
        assert_eq!(high.len(), 4);

        let medium = generate_point_cloud(&depth, 4, 2, PointCloudDensity::Medium).unwrap();
        assert_eq!(medium.len(), 1);
        let p = &medium[0];
        assert_eq!((p.x, p.y, p.z), (-0.5, 0.5, 0.5));
    }

    #[test]
    fn raster_maps_pixels_to_image_plane() {
        let depth = vec![1.0; 4];
        let points = generate_point_cloud(&depth, 2, 2, PointCloudDensity::High).unwrap();

        let coords: Vec<_> = points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords, vec![(-0.5, 0.5), (0.0, 0.5), (-0.5, 0.0), (0.0, 0.0)]);
    }

    #[test]
    fn nan_samples_are_dropped() {
        let mut depth = vec![0.0f32; 4 * 4];
        depth[0] = f32::NAN;
        depth[2] = 2.0;

        let cloud = process_lidar_depth_to_point_cloud(&depth, 4, 4, "lidar", "LiDAR", 0).unwrap();
        assert_eq!(cloud.points.len(), 1);
        assert_eq!(cloud.points[0].z, 2.0);

        let raster = [f32::NAN, 0.5, 0.5, f32::NAN];
        let raster = generate_point_cloud(&raster, 2, 2, PointCloudDensity::High).unwrap();
        assert_eq!(raster.len(), 2);
        assert!(raster.iter().all(|p| p.z == 0.5));
    }

    #[test]
    fn short_raster_is_an_error() {
        assert!(generate_point_cloud(&[1.0; 3], 2, 2, PointCloudDensity::High).is_err());
    }

    #[test]
    fn lidar_buffer_filters_range() {
        let mut depth = vec![0.0f32; 4 * 4];
        depth[0] = 2.0; // (0,0) kept
        depth[2] = 12.0; // (2,0) out of range
        depth[8] = 5.0; // (0,2) kept
        depth[1] = 3.0; // odd column, skipped by stride

        let cloud = process_lidar_depth_to_point_cloud(&depth, 4, 4, "lidar", "LiDAR", 0).unwrap();
        assert_eq!(cloud.points.len(), 2);
        assert_eq!(cloud.metadata.frame_count, Some(1));
        assert_eq!(cloud.metadata.processing_method, Some(ProcessingMethod::LidarDepth));

        let first = &cloud.points[0];
        assert_eq!(first.z, 2.0);
        assert!((first.x - (-2.0 * 2.0 * 0.001)).abs() < 1e-6);
        assert_eq!(first.intensity, Some(0.2));
    }
}
