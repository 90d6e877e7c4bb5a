//! Point cloud synthesis from captured frames, depth rasters and test geometry.
//!
//! None of this is real reconstruction: frame clouds are sampled around the
//! synthetic camera poses and photo depth comes from a brightness heuristic.

mod bounds;
pub mod color;
mod dedup;
mod luminance;
mod ply;
mod processor;
mod test_geometry;

pub use bounds::calculate_bounding_box;
pub use dedup::{deduplicate, merge_point_sets};
pub use luminance::{
    estimate_depth, luminance, luminance_to_depth, process_photo_to_point_cloud, DepthMap,
};
pub use ply::{export_ply, point_rgb, write_ply};
pub use processor::{
    generate_point_cloud, process_frames_to_point_cloud, process_frames_to_point_cloud_with_rng,
    process_lidar_depth_to_point_cloud,
};
pub use test_geometry::{create_test_point_cloud, create_test_point_cloud_with_rng, Complexity};

pub(crate) use processor::build_point_cloud;
