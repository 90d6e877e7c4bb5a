use std::f32::consts::TAU;

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Point3D, PointCloud, ProcessingMethod};

use super::{build_point_cloud, color::hsl};

const SHAPE_NOISE: f32 = 0.02;
const TORUS_MAJOR_RADIUS: f32 = 0.4;
const TORUS_MINOR_RADIUS: f32 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    pub fn point_count(&self) -> usize {
        match self {
            Complexity::Simple => 1_000,
            Complexity::Medium => 5_000,
            Complexity::Complex => 15_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Sphere,
    Cylinder,
    Cube,
    Torus,
}

impl Shape {
    const ALL: [Shape; 4] = [Shape::Sphere, Shape::Cylinder, Shape::Cube, Shape::Torus];

    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> [f32; 3] {
        match self {
            Shape::Sphere => {
                let theta = rng.gen::<f32>() * TAU;
                let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();
                let r = 0.3 + rng.gen::<f32>() * 0.2;
                [
                    r * phi.sin() * theta.cos(),
                    r * phi.sin() * theta.sin(),
                    r * phi.cos(),
                ]
            }
            Shape::Cylinder => {
                let theta = rng.gen::<f32>() * TAU;
                let r = 0.2 + rng.gen::<f32>() * 0.1;
                let h = rng.gen::<f32>() - 0.5;
                [r * theta.cos(), h, r * theta.sin()]
            }
            Shape::Cube => [
                (rng.gen::<f32>() - 0.5) * 0.8,
                (rng.gen::<f32>() - 0.5) * 0.8,
                (rng.gen::<f32>() - 0.5) * 0.8,
            ],
            Shape::Torus => {
                let theta = rng.gen::<f32>() * TAU;
                let phi = rng.gen::<f32>() * TAU;
                let ring = TORUS_MAJOR_RADIUS + TORUS_MINOR_RADIUS * phi.cos();
                [
                    ring * theta.cos(),
                    ring * theta.sin(),
                    TORUS_MINOR_RADIUS * phi.sin(),
                ]
            }
        }
    }
}

pub fn create_test_point_cloud(
    name: &str,
    device_type: &str,
    scan_duration: u64,
    complexity: Complexity,
) -> PointCloud {
    create_test_point_cloud_with_rng(
        name,
        device_type,
        scan_duration,
        complexity,
        &mut rand::thread_rng(),
    )
}

/// Mixes sphere, cylinder, cube and torus samples, one shape picked per point.
pub fn create_test_point_cloud_with_rng<R: Rng + ?Sized>(
    name: &str,
    device_type: &str,
    scan_duration: u64,
    complexity: Complexity,
    rng: &mut R,
) -> PointCloud {
    info!("Creating test point cloud with {:?} complexity", complexity);

    let count = complexity.point_count();
    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let shape = Shape::ALL[rng.gen_range(0..Shape::ALL.len())];
        let [x, y, z] = shape.sample(rng);

        points.push(Point3D {
            x: x + (rng.gen::<f32>() - 0.5) * SHAPE_NOISE,
            y: y + (rng.gen::<f32>() - 0.5) * SHAPE_NOISE,
            z: z + (rng.gen::<f32>() - 0.5) * SHAPE_NOISE,
            intensity: Some(rng.gen()),
            color: Some(hsl(i as f32 / count as f32 * 360.0, 70.0, 50.0)),
        });
    }

    let cloud = build_point_cloud(
        name,
        device_type,
        scan_duration,
        points,
        Some(0),
        Some(ProcessingMethod::TestGeneration),
    );
    info!("Created test point cloud with {} points", cloud.points.len());
    cloud
}
