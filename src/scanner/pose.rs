use std::f32::consts::TAU;

use crate::models::Vector3;

const CIRCLE_RADIUS: f32 = 0.5;
const VERTICAL_SWING: f32 = 0.2;

/// Synthetic pose for the `index`-th frame: a point on a circle around the
/// subject with a sinusoidal height, yawed towards the direction of travel.
pub fn frame_pose(index: usize, max_frames: u32) -> (Vector3, Vector3) {
    let angle = index as f32 / max_frames.max(1) as f32 * TAU;
    let position = Vector3::new(
        angle.cos() * CIRCLE_RADIUS,
        angle.sin() * CIRCLE_RADIUS,
        VERTICAL_SWING * (angle * 2.0).sin(),
    );
    let rotation = Vector3::new(0.0, angle, 0.0);
    (position, rotation)
}
