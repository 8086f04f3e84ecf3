//! Library crate for iot-probe-rs exposing the scanning engine.
pub mod http;
pub mod matcher;
pub mod ports;
pub mod probe;
pub mod report;
pub mod scanner;
pub mod targets;
pub mod types;
