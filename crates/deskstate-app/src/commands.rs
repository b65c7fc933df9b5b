//! CLI 하위 명령 구현.
//!
//! 출력 형식(JSON 직렬화)은 바이너리가 담당하고, 여기서는 결과 값만 만든다.

use std::fs;
use std::path::{Path, PathBuf};

use deskstate_cache::{CacheSummary, VisualStateCache};
use deskstate_core::config::{CacheConfig, CaptureConfig};
use deskstate_core::error::CoreError;
use deskstate_core::models::frame::CaptureDelta;
use deskstate_core::models::state::{ScreenState, VisualDiff};
use deskstate_vision::frame::load_frame;
use deskstate_vision::ChangeDetector;
use serde::Serialize;
use tracing::{debug, info};

/// 두 이미지 파일의 변경 영역 계산
///
/// 이전 이미지로 감지기를 초기화한 뒤 현재 이미지를 비교한다.
/// 크기가 다르면 결과는 전체 캡처 필요가 된다.
pub fn diff_images(
    previous: &Path,
    current: &Path,
    config: &CaptureConfig,
) -> Result<CaptureDelta, CoreError> {
    let before = load_frame(previous)?;
    let after = load_frame(current)?;

    let mut detector = ChangeDetector::new(config.clone());
    detector.detect(&before)?;
    let delta = detector.detect(&after)?;

    info!(
        previous = %previous.display(),
        current = %current.display(),
        regions = delta.dirty_regions().len(),
        full = delta.is_full_capture(),
        "이미지 비교 완료"
    );
    Ok(delta)
}

/// 스냅샷 하나의 재생 결과
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStep {
    pub source: PathBuf,
    pub diff: VisualDiff,
}

/// 재생 전체 결과
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<ReplayStep>,
    pub summary: CacheSummary,
}

/// JSON 스냅샷 파일 로드
pub fn load_snapshot(path: &Path) -> Result<ScreenState, CoreError> {
    let content = fs::read_to_string(path)?;
    let state = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "스냅샷 로드");
    Ok(state)
}

/// 스냅샷을 순서대로 캐시에 전체 갱신으로 적용
pub fn replay_snapshots(paths: &[PathBuf], config: &CacheConfig) -> Result<ReplayReport, CoreError> {
    let mut cache = VisualStateCache::new(config.clone());
    let mut steps = Vec::with_capacity(paths.len());

    for path in paths {
        let state = load_snapshot(path)?;
        let diff = cache.update_full(state);
        steps.push(ReplayStep {
            source: path.clone(),
            diff,
        });
    }

    Ok(ReplayReport {
        steps,
        summary: cache.summary(),
    })
}
