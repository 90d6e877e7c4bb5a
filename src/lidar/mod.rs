pub mod capabilities;
pub mod controller;
pub mod source;

pub use capabilities::{
    CapabilityProvider, DepthAccuracy, DeviceProfile, HeuristicCapabilityProvider,
    LidarCapabilities, Platform,
};
pub use controller::LidarController;
pub use source::{DepthSource, Intrinsics, LidarFrame, SyntheticDepthSource};
