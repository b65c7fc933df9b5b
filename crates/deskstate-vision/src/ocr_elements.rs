//! OCR 기반 요소 제공자.
//!
//! 프레임(또는 검출 영역)을 PNG로 잘라 [`OcrProvider`]에 넘기고,
//! 인식된 단어를 `Text` 요소로 바꾼다. 접근성 API를 쓸 수 없는 창의 폴백.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use deskstate_core::error::CoreError;
use deskstate_core::models::element::{ElementKind, UiElement};
use deskstate_core::models::frame::RasterFrame;
use deskstate_core::models::geometry::Rect;
use deskstate_core::models::window::WindowInfo;
use deskstate_core::ports::element_provider::{DetectionRequest, ElementProvider, ProviderResult};
use deskstate_core::ports::ocr_provider::{OcrProvider, OcrResult};
use tracing::debug;

use crate::frame::{clamp_to_frame, crop_png};

/// OCR 폴백 우선순위
pub const OCR_PRIORITY: i32 = 10;

/// OCR 결과를 요소로 변환하는 제공자
pub struct OcrElementProvider {
    ocr: Arc<dyn OcrProvider>,
    /// 이 값 미만 신뢰도의 단어는 버린다
    min_confidence: f64,
}

impl OcrElementProvider {
    pub fn new(ocr: Arc<dyn OcrProvider>) -> Self {
        Self {
            ocr,
            min_confidence: 0.0,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// OCR 결과 → 요소 (영역 원점만큼 평행 이동)
    fn to_elements(&self, results: &[OcrResult], origin: &Rect) -> Vec<UiElement> {
        results
            .iter()
            .filter(|r| !r.text.trim().is_empty() && r.confidence >= self.min_confidence)
            .map(|r| {
                let bounds = Rect::new(origin.x + r.x, origin.y + r.y, r.width, r.height);
                let text = r.text.trim();
                UiElement::new(ElementKind::Text, bounds)
                    .with_text(text)
                    .with_label(text)
                    .with_confidence(r.confidence)
                    .with_metadata("source", serde_json::json!("ocr"))
                    .with_metadata(
                        "ocr_provider",
                        serde_json::json!(self.ocr.provider_name()),
                    )
            })
            .collect()
    }
}

#[async_trait]
impl ElementProvider for OcrElementProvider {
    fn name(&self) -> &str {
        "ocr"
    }

    fn priority(&self) -> i32 {
        OCR_PRIORITY
    }

    /// 화면에 보이는 것은 무엇이든 처리할 수 있다
    fn can_handle(&self, _window: &WindowInfo) -> bool {
        true
    }

    async fn detect(
        &self,
        frame: &RasterFrame,
        request: &DetectionRequest,
    ) -> Result<ProviderResult, CoreError> {
        let started = Instant::now();
        let region = request.region.unwrap_or_else(|| frame.bounds());

        if clamp_to_frame(frame, &region).is_none() {
            debug!(?region, "검출 영역이 프레임 밖, 건너뜀");
            return Ok(ProviderResult {
                elements: Vec::new(),
                provider_name: self.name().to_string(),
                detection_time_ms: 0.0,
            });
        }

        let (png, clipped) = crop_png(frame, &region)?;
        let results = self
            .ocr
            .extract_elements(&png, "png")
            .await
            .map_err(|e| CoreError::Provider {
                provider: self.ocr.provider_name().to_string(),
                message: e.to_string(),
            })?;

        let elements = self.to_elements(&results, &clipped);
        debug!(
            ocr = self.ocr.provider_name(),
            words = results.len(),
            elements = elements.len(),
            "OCR 요소 변환 완료"
        );

        Ok(ProviderResult {
            elements,
            provider_name: self.name().to_string(),
            detection_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}
