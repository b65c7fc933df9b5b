//! 외부 협력자 포트 인터페이스.
//!
//! 래스터 캡처, 창 열거, 요소 제공자(OCR/접근성/DOM)는 코어 밖에 있다.
//! 코어는 이 트레이트의 경계에서만 데이터를 주고받는다.

pub mod element_provider;
pub mod ocr_provider;
pub mod raster_source;
