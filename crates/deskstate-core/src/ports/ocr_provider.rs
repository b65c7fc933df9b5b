//! OCR 제공자 포트.
//!
//! 내장 Tesseract 또는 외부 AI OCR API를 추상화하는 인터페이스를 정의한다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// OCR 결과 (제공자 무관 표준 구조)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// 인식된 텍스트
    pub text: String,
    /// 바운딩 박스 X 좌표 (입력 이미지 기준)
    pub x: i32,
    /// 바운딩 박스 Y 좌표 (입력 이미지 기준)
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// 인식 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
}

/// OCR 제공자
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// 이미지에서 텍스트 + 바운딩 박스 추출
    ///
    /// - `image`: 이미지 바이트
    /// - `image_format`: 이미지 형식 ("png", "jpeg" 등)
    async fn extract_elements(
        &self,
        image: &[u8],
        image_format: &str,
    ) -> Result<Vec<OcrResult>, CoreError>;

    /// 제공자 이름 (예: "local-tesseract")
    fn provider_name(&self) -> &str;
}
