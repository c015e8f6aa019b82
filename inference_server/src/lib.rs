pub mod engine;
pub mod misc;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod server;
