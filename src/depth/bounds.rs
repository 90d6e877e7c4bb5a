use crate::models::{BoundingBox, Point3D};

/// Per-axis min/max. An empty slice yields the zero box.
pub fn calculate_bounding_box(points: &[Point3D]) -> BoundingBox {
    let Some(first) = points.first() else {
        return BoundingBox::default();
    };

    let mut min = first.coords();
    let mut max = min;
    for point in &points[1..] {
        for (axis, value) in point.coords().into_iter().enumerate() {
            min[axis] = min[axis].min(value);
            max[axis] = max[axis].max(value);
        }
    }

    BoundingBox {
        min: Point3D::new(min[0], min[1], min[2]),
        max: Point3D::new(max[0], max[1], max[2]),
    }
}
