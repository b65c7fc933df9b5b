//! 래스터 프레임 및 변경 영역 모델.
//!
//! 래스터 소스가 제공하는 원본 프레임과 변경 감지기가 생성하는 dirty 영역을 정의.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use crate::error::CoreError;

/// 캡처된 래스터 프레임 (RGBA8, 행 우선)
#[derive(Debug, Clone)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA 픽셀 버퍼 (`width * height * 4` 바이트)
    pub pixels: Vec<u8>,
    /// 캡처 시각
    pub captured_at: DateTime<Utc>,
}

impl RasterFrame {
    /// 버퍼 길이를 검증하여 프레임 생성
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CoreError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CoreError::Validation {
                field: "pixels".to_string(),
                message: format!("버퍼 길이 {} != {}x{}x4", pixels.len(), width, height),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            captured_at: Utc::now(),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 프레임 전체 영역
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

/// 변경 영역 (dirty region)
///
/// 변경 감지기만 생성하며 저장되지 않는 일회성 값이다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirtyRegion {
    /// 변경 영역 바운딩 박스 (원본 해상도)
    pub bounds: Rect,
    /// 변경 강도 (0.0 ~ 1.0)
    pub diff_score: f32,
}

/// 전체 캡처가 필요한 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FullCaptureReason {
    /// 이전 프레임 없음 (첫 캡처 또는 리셋 직후)
    FirstCapture,
    /// 해상도/모니터 변경
    ResolutionChanged {
        previous: (u32, u32),
        current: (u32, u32),
    },
}

/// 두 프레임 비교 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaOutcome {
    /// 부분 비교 불가, 전체 프레임을 다시 분석해야 함
    FullCaptureRequired(FullCaptureReason),
    /// 변경 영역 목록 (비어 있으면 변경 없음)
    Regions { regions: Vec<DirtyRegion> },
}

impl DeltaOutcome {
    pub fn is_full_capture(&self) -> bool {
        matches!(self, DeltaOutcome::FullCaptureRequired(_))
    }

    /// 변경 영역 (전체 캡처면 빈 슬라이스)
    pub fn regions(&self) -> &[DirtyRegion] {
        match self {
            DeltaOutcome::FullCaptureRequired(_) => &[],
            DeltaOutcome::Regions { regions } => regions,
        }
    }
}

/// 변경 감지 사이클 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureDelta {
    /// 현재 프레임 캡처 시각
    pub timestamp: DateTime<Utc>,
    /// 현재 프레임 크기 (width, height)
    pub frame_size: (u32, u32),
    pub outcome: DeltaOutcome,
    /// 비교 대상 이전 프레임 시각
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_frame_at: Option<DateTime<Utc>>,
}

impl CaptureDelta {
    /// 전체 캡처이거나 변경 영역이 하나 이상이면 true
    pub fn has_changes(&self) -> bool {
        self.outcome.is_full_capture() || !self.outcome.regions().is_empty()
    }

    pub fn is_full_capture(&self) -> bool {
        self.outcome.is_full_capture()
    }

    pub fn dirty_regions(&self) -> &[DirtyRegion] {
        self.outcome.regions()
    }

    /// 변경 영역 면적 합
    pub fn total_dirty_area(&self) -> u64 {
        self.dirty_regions().iter().map(|r| r.bounds.area()).sum()
    }
}
