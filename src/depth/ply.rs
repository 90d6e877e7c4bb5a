use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{Point3D, PointCloud};

use super::color::parse_hex;

const WHITE: [u8; 3] = [255, 255, 255];

/// Hex colour of the point, white when missing or not hex.
pub fn point_rgb(point: &Point3D) -> [u8; 3] {
    point
        .color
        .as_deref()
        .and_then(parse_hex)
        .unwrap_or(WHITE)
}

fn write_header(out: &mut String, vertex_count: usize) {
    out.push_str("ply\n");
    out.push_str("format ascii 1.0\n");
    let _ = writeln!(out, "element vertex {vertex_count}");
    out.push_str("property float x\n");
    out.push_str("property float y\n");
    out.push_str("property float z\n");
    out.push_str("property uchar red\n");
    out.push_str("property uchar green\n");
    out.push_str("property uchar blue\n");
    out.push_str("end_header\n");
}

/// ASCII PLY with xyz and uchar rgb per vertex.
pub fn export_ply(cloud: &PointCloud) -> String {
    let mut out = String::with_capacity(256 + cloud.points.len() * 48);
    write_header(&mut out, cloud.points.len());
    for point in &cloud.points {
        let [r, g, b] = point_rgb(point);
        let _ = writeln!(out, "{} {} {} {} {} {}", point.x, point.y, point.z, r, g, b);
    }
    out
}

pub fn write_ply(path: &Path, cloud: &PointCloud) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(export_ply(cloud).as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::build_point_cloud;

    fn cloud(points: Vec<Point3D>) -> PointCloud {
        build_point_cloud("ply", "dev", 0, points, None, None)
    }

    #[test]
    fn header_and_rows() {
        let cloud = cloud(vec![
            Point3D::new(0.5, -1.0, 2.25).with_color("#ff0080"),
            Point3D::new(0.0, 0.0, 0.0).with_color("hsl(10, 70%, 50%)"),
            Point3D::new(1.0, 2.0, 3.0),
        ]);

        let text = export_ply(&cloud);
        let expected = "ply\n\
                        format ascii 1.0\n\
                        element vertex 3\n\
                        property float x\n\
                        property float y\n\
                        property float z\n\
                        property uchar red\n\
                        property uchar green\n\
                        property uchar blue\n\
                        end_header\n\
                        0.5 -1 2.25 255 0 128\n\
                        0 0 0 255 255 255\n\
                        1 2 3 255 255 255\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_cloud_has_only_header() {
        let text = export_ply(&cloud(Vec::new()));
        assert!(text.contains("element vertex 0\n"));
        assert!(text.ends_with("end_header\n"));
    }

    #[test]
    fn writes_file() {
        let cloud = cloud(vec![Point3D::new(1.0, 1.0, 1.0)]);
        let dir = std::env::temp_dir().join(format!("pointscan-ply-{}", uuid::Uuid::new_v4()));
        let path = dir.join("cloud.ply");

        write_ply(&path, &cloud).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(contents, export_ply(&cloud));
    }
}
