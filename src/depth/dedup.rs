use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::models::Point3D;

type CellKey = (i64, i64, i64);

fn cell_key(point: &Point3D, threshold: f32) -> CellKey {
    (
        (point.x / threshold).round() as i64,
        (point.y / threshold).round() as i64,
        (point.z / threshold).round() as i64,
    )
}

/// Keeps the first point landing in each grid cell of size `threshold`.
pub fn deduplicate(points: &[Point3D], threshold: f32) -> Result<Vec<Point3D>> {
    merge_point_sets([points], threshold)
}

/// Concatenates the sets in order and deduplicates the result.
pub fn merge_point_sets<'a, I>(sets: I, threshold: f32) -> Result<Vec<Point3D>>
where
    I: IntoIterator<Item = &'a [Point3D]>,
{
    if !(threshold.is_finite() && threshold > 0.0) {
        bail!("dedup threshold must be a positive number, got {threshold}");
    }

    let mut occupied: HashSet<CellKey> = HashSet::new();
    let mut merged = Vec::new();
    for set in sets {
        for point in set {
            if occupied.insert(cell_key(point, threshold)) {
                merged.push(point.clone());
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_DEDUP_THRESHOLD;
    use crate::depth::create_test_point_cloud_with_rng;
    use crate::depth::Complexity;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn close_points_collapse_to_first() {
        let points = vec![
            Point3D::new(0.0, 0.0, 0.0).with_intensity(1.0),
            Point3D::new(0.004, 0.0, 0.0).with_intensity(0.5),
            Point3D::new(0.02, 0.0, 0.0),
        ];

        let result = deduplicate(&points, DEFAULT_DEDUP_THRESHOLD).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].intensity, Some(1.0));
        assert_eq!(result[1].x, 0.02);
    }

    #[test]
    fn merging_with_itself_matches_single_pass() {
        let mut rng = StdRng::seed_from_u64(11);
        let cloud = create_test_point_cloud_with_rng("t", "dev", 0, Complexity::Simple, &mut rng);

        let once = deduplicate(&cloud.points, DEFAULT_DEDUP_THRESHOLD).unwrap();
        let merged = merge_point_sets(
            [cloud.points.as_slice(), cloud.points.as_slice()],
            DEFAULT_DEDUP_THRESHOLD,
        )
        .unwrap();
        let twice = deduplicate(&once, DEFAULT_DEDUP_THRESHOLD).unwrap();

        assert_eq!(merged, once);
        assert_eq!(twice, once);
    }

    #[test]
    fn later_sets_fill_only_empty_cells() {
        let a = vec![Point3D::new(1.0, 1.0, 1.0)];
        let b = vec![Point3D::new(1.001, 1.0, 1.0), Point3D::new(-1.0, 0.0, 0.0)];

        let merged = merge_point_sets([a.as_slice(), b.as_slice()], 0.01).unwrap();
        assert_eq!(merged, vec![a[0].clone(), b[1].clone()]);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let points = vec![Point3D::new(0.0, 0.0, 0.0)];
        assert!(deduplicate(&points, 0.0).is_err());
        assert!(deduplicate(&points, f32::NAN).is_err());
    }
}
