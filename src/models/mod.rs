mod config;
mod point;
mod point_cloud;
mod session;

pub use config::{
    CameraFacing, CameraQuality, CameraSettings, ExportFormat, PointCloudDensity, ScannerConfig,
};
pub use point::{BoundingBox, Point3D, Vector3};
pub use point_cloud::{PointCloud, PointCloudMetadata, ProcessingMethod};
pub use session::{CapturedFrame, ScanSession, ScanStatus};
