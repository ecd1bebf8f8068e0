pub mod bridge_platform;
pub mod exam_api;
pub mod platform;
