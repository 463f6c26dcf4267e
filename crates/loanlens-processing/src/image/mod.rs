pub mod codec;
pub mod orientation;
pub mod watermark;
