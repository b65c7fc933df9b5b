//! UI 요소 제공자 포트 (전략 패턴).
//!
//! 접근성 트리, DOM, OCR 등 다양한 전략으로 화면의 시맨틱 요소를 만드는
//! 인터페이스를 정의한다. 캐시는 요소가 어느 제공자에서 왔는지 구분하지 않는다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::element::UiElement;
use crate::models::frame::RasterFrame;
use crate::models::geometry::Rect;
use crate::models::window::WindowInfo;

/// 검출 요청 범위
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionRequest {
    /// 대상 창 핸들 (None이면 제공자 판단)
    pub window_handle: Option<i64>,
    /// 검출 영역 제한 (None이면 전체 프레임)
    pub region: Option<Rect>,
}

impl DetectionRequest {
    pub fn full_frame() -> Self {
        Self::default()
    }

    pub fn region(region: Rect) -> Self {
        Self {
            window_handle: None,
            region: Some(region),
        }
    }

    pub fn with_window(mut self, handle: i64) -> Self {
        self.window_handle = Some(handle);
        self
    }
}

/// 제공자 검출 결과
#[derive(Debug, Clone, Default)]
pub struct ProviderResult {
    pub elements: Vec<UiElement>,
    pub provider_name: String,
    pub detection_time_ms: f64,
}

/// UI 요소 제공자
///
/// 구현체: `OcrElementProvider` (OCR 폴백), 접근성/CDP 기반 제공자 (외부)
#[async_trait]
pub trait ElementProvider: Send + Sync {
    /// 제공자 이름 (예: "cdp", "uia", "ocr")
    fn name(&self) -> &str;

    /// 선택 우선순위 (클수록 선호). 예: 구조화 API 100, OCR 10
    fn priority(&self) -> i32;

    /// 해당 창을 처리할 수 있는지
    fn can_handle(&self, window: &WindowInfo) -> bool;

    /// 의존성 설치 여부 등 사용 가능 상태
    fn is_available(&self) -> bool {
        true
    }

    /// 프레임(또는 그 일부)에서 요소 검출
    async fn detect(
        &self,
        frame: &RasterFrame,
        request: &DetectionRequest,
    ) -> Result<ProviderResult, CoreError>;
}
