//! 도메인 모델.

pub mod element;
pub mod frame;
pub mod geometry;
pub mod state;
pub mod window;
