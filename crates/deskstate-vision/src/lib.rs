//! # deskstate-vision
//!
//! 래스터 처리 크레이트.
//! 두 프레임의 차이를 dirty 영역으로 요약하는 변경 감지기와,
//! 영역/프레임을 시맨틱 요소로 바꾸는 제공자 선택 계층을 담당한다.

#[cfg(feature = "capture")]
pub mod capture;
pub mod delta;
pub mod downscale;
pub mod frame;
pub mod morphology;
pub mod ocr_elements;
pub mod provider_registry;

pub use delta::{compute_dirty_regions, ChangeDetector};
pub use provider_registry::ProviderRegistry;
