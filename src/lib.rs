pub mod common;
pub mod config;
pub mod detector;
pub mod relay;
pub mod web;

pub use common::error::DetectorError;
pub use common::file_type::{Detection, FileType};
pub use detector::{
    Blocking, Detector, FnDetector, InferDetector, SyncDetector, DEFAULT_MINIMUM_BYTES,
};
pub use relay::{DetectingRelay, RelayHandle, TypeListener, TypeObserver};
