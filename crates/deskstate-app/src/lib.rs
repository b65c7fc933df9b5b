//! # deskstate-app
//!
//! 변경 감지기, 요소 제공자, 시각 상태 캐시를 한 사이클로 묶는 엔진과
//! `deskstate` CLI 하위 명령 구현.

pub mod commands;
pub mod engine;

pub use engine::{AnalysisScope, EngineCycle, VisualEngine};
