mod controller;
mod pose;
mod source;
mod state;

pub use controller::{ScannerController, ScannerSnapshot};
pub use pose::frame_pose;
pub use source::{FrameCallback, PhotoSource};
pub use state::ScanState;
