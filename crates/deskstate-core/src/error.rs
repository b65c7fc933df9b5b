//! deskstate 핵심 에러 타입.
//!
//! 변경 감지기와 상태 캐시는 실패하지 않는다 (부재는 `None`/빈 결과로 표현).
//! 에러는 캡처, 요소 제공자, 설정 파일 같은 협력자 경계에서만 발생한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 화면 캡처 실패 (래스터 소스)
    #[error("캡처 에러: {0}")]
    Capture(String),

    /// 요소 제공자 실패 (OCR, 접근성 API 등)
    #[error("요소 제공자 에러 ({provider}): {message}")]
    Provider {
        /// 제공자 이름
        provider: String,
        /// 실패 사유
        message: String,
    },

    /// 이미지 변환/인코딩 실패
    #[error("이미지 에러: {0}")]
    Image(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_message_includes_name() {
        let err = CoreError::Provider {
            provider: "ocr".to_string(),
            message: "엔진 초기화 실패".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ocr"));
        assert!(msg.contains("엔진 초기화 실패"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "없음");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
