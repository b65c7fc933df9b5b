//! 애플리케이션 설정 구조체.
//!
//! 변경 감지(캡처), 시각 상태 캐시, 엔진 오케스트레이션 설정을 정의한다.
//! 코어는 파일을 직접 읽지 않으며, 임베딩 애플리케이션이 값을 주입한다.
//! 파일 로드/저장은 [`crate::config_manager::ConfigManager`] 담당.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 캡처 및 변경 감지 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 시각 상태 캐시 설정
    #[serde(default)]
    pub cache: CacheConfig,
    /// 엔진(캡처 → 분석 → 캐시 갱신) 설정
    #[serde(default)]
    pub engine: EngineConfig,
}

// ============================================================
// 캡처/변경 감지 설정
// ============================================================

/// 변경 감지 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// 캡처할 모니터 인덱스 (None이면 주 모니터)
    #[serde(default)]
    pub monitor: Option<usize>,
    /// 연속 감시 시 캡처 주기 (밀리초)
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
    /// 변경으로 판단할 최소 그레이 레벨 차이 (0-255)
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: u8,
    /// 변경 영역으로 인정할 최소 면적 (픽셀)
    #[serde(default = "default_min_region_area")]
    pub min_region_area: u64,
    /// 최대 변경 영역 수
    #[serde(default = "default_max_regions")]
    pub max_regions: usize,
    /// 비교용 축소 배율 (1.0 = 원본 해상도)
    #[serde(default = "default_diff_scale")]
    pub diff_scale: f32,
    /// 인접 영역 병합 거리 (픽셀)
    #[serde(default = "default_merge_distance")]
    pub merge_distance: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            monitor: None,
            capture_interval_ms: default_capture_interval_ms(),
            diff_threshold: default_diff_threshold(),
            min_region_area: default_min_region_area(),
            max_regions: default_max_regions(),
            diff_scale: default_diff_scale(),
            merge_distance: default_merge_distance(),
        }
    }
}

impl CaptureConfig {
    /// 캡처 주기를 Duration으로 반환
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }
}

// ============================================================
// 캐시 설정
// ============================================================

/// 시각 상태 캐시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 최대 요소 수 (초과 시 가장 먼저 삽입된 요소 제거)
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    /// 보관할 이력 스냅샷 수
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// 위치 변경으로 보지 않는 허용 오차 (픽셀)
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: u32,
    /// 레이블 조회 시 퍼지 매칭 사용 여부
    #[serde(default = "default_true")]
    pub fuzzy_matching: bool,
    /// 레이블 퍼지 매칭 최소 점수 (0-100)
    #[serde(default = "default_label_fuzzy_threshold")]
    pub label_fuzzy_threshold: u8,
    /// 창 제목 퍼지 매칭 최소 점수 (0-100)
    ///
    /// 창 제목은 노이즈가 많아 레이블보다 낮게 둔다.
    #[serde(default = "default_window_fuzzy_threshold")]
    pub window_fuzzy_threshold: u8,
    /// 창 제목별 요소 인덱스 유지
    #[serde(default = "default_true")]
    pub group_by_window: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_elements: default_max_elements(),
            max_history: default_max_history(),
            position_tolerance: default_position_tolerance(),
            fuzzy_matching: true,
            label_fuzzy_threshold: default_label_fuzzy_threshold(),
            window_fuzzy_threshold: default_window_fuzzy_threshold(),
            group_by_window: true,
        }
    }
}

// ============================================================
// 엔진 설정
// ============================================================

/// 엔진 설정: 캡처 사이클의 분석 범위
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 부분 변경 시 변경 영역만 분석 (false면 항상 전체 분석)
    #[serde(default = "default_true")]
    pub analyze_regions_incrementally: bool,
    /// 변경 영역 밖의 기존 캐시 요소 유지
    #[serde(default = "default_true")]
    pub keep_elements_outside_dirty_regions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analyze_regions_incrementally: true,
            keep_elements_outside_dirty_regions: true,
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            capture: CaptureConfig::default(),
            cache: CacheConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        let scale = self.capture.diff_scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(invalid(
                "capture.diff_scale",
                format!("0 초과 1 이하여야 함 (현재 {scale})"),
            ));
        }
        if self.capture.max_regions == 0 {
            return Err(invalid("capture.max_regions", "0보다 커야 함".to_string()));
        }
        if self.cache.max_elements == 0 {
            return Err(invalid("cache.max_elements", "0보다 커야 함".to_string()));
        }
        if self.cache.label_fuzzy_threshold > 100 {
            return Err(invalid(
                "cache.label_fuzzy_threshold",
                "0-100 범위여야 함".to_string(),
            ));
        }
        if self.cache.window_fuzzy_threshold > 100 {
            return Err(invalid(
                "cache.window_fuzzy_threshold",
                "0-100 범위여야 함".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

fn invalid(field: &str, message: String) -> CoreError {
    CoreError::Validation {
        field: field.to_string(),
        message,
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_capture_interval_ms() -> u64 {
    500
}
fn default_diff_threshold() -> u8 {
    30
}
fn default_min_region_area() -> u64 {
    100
}
fn default_max_regions() -> usize {
    50
}
fn default_diff_scale() -> f32 {
    0.5
}
fn default_merge_distance() -> u32 {
    20
}
fn default_max_elements() -> usize {
    1000
}
fn default_max_history() -> usize {
    10
}
fn default_position_tolerance() -> u32 {
    5
}
fn default_label_fuzzy_threshold() -> u8 {
    80
}
fn default_window_fuzzy_threshold() -> u8 {
    60
}
