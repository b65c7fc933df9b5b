//! 시각 엔진: 캡처 → 변경 감지 → 요소 분석 → 캐시 갱신.
//!
//! 한 사이클은 다음 순서로 진행된다.
//! 1. 래스터 소스에서 프레임 캡처
//! 2. 변경 감지기로 이전 프레임과 비교
//! 3. 창 목록 조회 (창 소스가 있을 때)
//! 4. 전체 캡처면 프레임 전체를, 부분 변경이면 dirty 영역만 분석
//! 5. 변경 영역 밖의 기존 요소와 새 요소를 합쳐 `update_full`
//!
//! 변경이 없으면 창 목록만 갱신하고 빈 diff를 돌려준다.
//! `wait_for_element`/`wait_for_change`는 마감 시각까지 사이클을 반복한다.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use chrono::Utc;
use deskstate_cache::SharedVisualCache;
use deskstate_core::config::{AppConfig, CaptureConfig, EngineConfig};
use deskstate_core::error::CoreError;
use deskstate_core::models::element::UiElement;
use deskstate_core::models::frame::{CaptureDelta, DirtyRegion, RasterFrame};
use deskstate_core::models::geometry::Rect;
use deskstate_core::models::state::{ScreenState, VisualDiff};
use deskstate_core::models::window::WindowInfo;
use deskstate_core::ports::element_provider::DetectionRequest;
use deskstate_core::ports::raster_source::{RasterSource, WindowSource};
use deskstate_vision::{ChangeDetector, ProviderRegistry};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// 분석 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisScope {
    /// 변경 없음, 분석 생략
    Skipped,
    /// 프레임 전체 분석
    FullFrame,
    /// dirty 영역만 분석
    Regions,
}

/// 한 사이클의 결과
#[derive(Debug, Clone, Serialize)]
pub struct EngineCycle {
    pub delta: CaptureDelta,
    pub diff: VisualDiff,
    pub scope: AnalysisScope,
    /// 분석에 사용된 제공자 이름 (중복 제거, 사용 순)
    pub providers: Vec<String>,
    /// 변경 영역 밖이라 유지된 기존 요소 수
    pub kept_elements: usize,
    pub elapsed_ms: u64,
}

/// 캡처-분석 오케스트레이터
pub struct VisualEngine {
    source: Arc<dyn RasterSource>,
    window_source: Option<Arc<dyn WindowSource>>,
    detector: Mutex<ChangeDetector>,
    registry: Arc<ProviderRegistry>,
    cache: SharedVisualCache,
    config: EngineConfig,
}

impl VisualEngine {
    pub fn new(
        source: Arc<dyn RasterSource>,
        registry: Arc<ProviderRegistry>,
        cache: SharedVisualCache,
        config: &AppConfig,
    ) -> Self {
        Self {
            source,
            window_source: None,
            detector: Mutex::new(ChangeDetector::new(config.capture.clone())),
            registry,
            cache,
            config: config.engine.clone(),
        }
    }

    /// 창 목록 소스 연결
    pub fn with_window_source(mut self, window_source: Arc<dyn WindowSource>) -> Self {
        self.window_source = Some(window_source);
        self
    }

    pub fn cache(&self) -> &SharedVisualCache {
        &self.cache
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    /// 감지기 설정
    pub fn capture_config(&self) -> CaptureConfig {
        self.detector.lock().config().clone()
    }

    /// 재로드된 설정 반영
    ///
    /// 감지기가 보관한 이전 프레임은 유지되므로 다음 사이클도 증분 비교한다.
    /// 캐시 설정은 캐시 생성 시점에 고정된다.
    pub fn apply_config(&mut self, config: &AppConfig) {
        self.detector.lock().set_config(config.capture.clone());
        self.config = config.engine.clone();
        debug!("엔진 설정 갱신");
    }

    /// 다음 사이클을 전체 캡처로 강제
    pub fn reset(&self) {
        self.detector.lock().reset();
    }

    /// 전체 재분석
    pub async fn refresh(&self) -> Result<EngineCycle, CoreError> {
        self.capture_and_analyze(true).await
    }

    /// 화면의 지정 영역만 분석
    ///
    /// 변경 감지기와 캐시는 건드리지 않는다. 영역은 프레임 경계로 잘리고,
    /// 프레임과 겹치지 않으면 빈 목록을 돌려준다.
    pub async fn analyze_region(&self, region: Rect) -> Result<Vec<UiElement>, CoreError> {
        let frame = self.source.capture()?;
        let bounds = Rect::new(0, 0, frame.width, frame.height);
        let Some(clipped) = region.intersection(&bounds) else {
            debug!(region = ?region, "프레임 밖 영역, 분석 생략");
            return Ok(Vec::new());
        };

        let active = self.cache.read().get_active_window().cloned();
        let request = with_active(DetectionRequest::region(clipped), active.as_ref());
        let result = self.registry.detect(&frame, active.as_ref(), &request).await?;
        debug!(
            region = ?clipped,
            provider = %result.provider_name,
            count = result.elements.len(),
            "지정 영역 분석"
        );
        Ok(attach_window(result.elements, active.as_ref()))
    }

    /// 레이블과 일치하는 요소가 나타날 때까지 사이클 반복
    ///
    /// 매 사이클 뒤 캐시를 레이블로 조회하고, 없으면 `interval`만큼 쉰다.
    /// `timeout`이 지나면 `Ok(None)`.
    pub async fn wait_for_element(
        &self,
        label: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<Option<UiElement>, CoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.capture_and_analyze(false).await?;
            if let Some(element) = self.cache.get_element_by_label(label) {
                debug!(label, id = %element.id, "요소 발견");
                return Ok(Some(element));
            }
            if !sleep_before(deadline, interval).await {
                debug!(label, "요소 대기 시간 초과");
                return Ok(None);
            }
        }
    }

    /// 요소 변경이 관측될 때까지 사이클 반복
    ///
    /// 캐시 diff에 추가/삭제/수정이 있으면 `true`, 시간 초과면 `false`.
    pub async fn wait_for_change(
        &self,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool, CoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            let cycle = self.capture_and_analyze(false).await?;
            if cycle.diff.has_changes() {
                return Ok(true);
            }
            if !sleep_before(deadline, interval).await {
                debug!("변경 대기 시간 초과");
                return Ok(false);
            }
        }
    }

    /// 한 사이클 실행
    ///
    /// `force_full`이면 이전 프레임을 버리고 전체 분석한다.
    /// 분석이 실패하면 감지기를 리셋하여 다음 사이클이 전체 캡처가 되도록 한다.
    pub async fn capture_and_analyze(&self, force_full: bool) -> Result<EngineCycle, CoreError> {
        let started = Instant::now();
        let frame = self.source.capture()?;

        let delta = {
            let mut detector = self.detector.lock();
            if force_full {
                detector.reset();
            }
            detector.detect(&frame)?
        };

        let windows = self.list_windows();

        if !delta.has_changes() {
            if let Some(windows) = windows {
                self.cache.update_windows(windows);
            }
            debug!(source = self.source.name(), "변경 없음, 창 목록만 갱신");
            return Ok(EngineCycle {
                diff: VisualDiff::empty(Utc::now()),
                delta,
                scope: AnalysisScope::Skipped,
                providers: Vec::new(),
                kept_elements: 0,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let windows = windows.unwrap_or_else(|| self.cache.read().windows().to_vec());
        let active = windows.iter().find(|w| w.is_active).cloned();

        let full = delta.is_full_capture() || !self.config.analyze_regions_incrementally;
        let analysis = if full {
            self.analyze_full(&frame, active.as_ref()).await
        } else {
            self.analyze_regions(&frame, active.as_ref(), delta.dirty_regions())
                .await
        };

        let (detected, providers) = match analysis {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "요소 분석 실패, 다음 사이클은 전체 캡처");
                self.reset();
                return Err(e);
            }
        };

        let kept = if full || !self.config.keep_elements_outside_dirty_regions {
            Vec::new()
        } else {
            self.elements_outside(delta.dirty_regions())
        };
        let kept_elements = kept.len();

        let mut elements = kept;
        elements.extend(detected);

        let state = ScreenState::new(delta.timestamp)
            .with_elements(elements)
            .with_windows(windows)
            .with_screen_size(frame.width, frame.height);
        let diff = self.cache.update_full(state);

        let cycle = EngineCycle {
            delta,
            diff,
            scope: if full {
                AnalysisScope::FullFrame
            } else {
                AnalysisScope::Regions
            },
            providers,
            kept_elements,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            scope = ?cycle.scope,
            regions = cycle.delta.dirty_regions().len(),
            added = cycle.diff.total_added,
            removed = cycle.diff.total_removed,
            modified = cycle.diff.total_modified,
            kept = cycle.kept_elements,
            elapsed_ms = cycle.elapsed_ms,
            "분석 사이클 완료"
        );
        Ok(cycle)
    }

    /// 창 목록 조회. 소스가 없거나 실패하면 None (기존 목록 유지).
    fn list_windows(&self) -> Option<Vec<WindowInfo>> {
        let source = self.window_source.as_ref()?;
        match source.list_windows() {
            Ok(windows) => Some(windows),
            Err(e) => {
                warn!(error = %e, "창 목록 조회 실패, 이전 목록 유지");
                None
            }
        }
    }

    async fn analyze_full(
        &self,
        frame: &RasterFrame,
        active: Option<&WindowInfo>,
    ) -> Result<(Vec<UiElement>, Vec<String>), CoreError> {
        let request = with_active(DetectionRequest::full_frame(), active);
        let result = self.registry.detect(frame, active, &request).await?;
        let elements = attach_window(result.elements, active);
        Ok((elements, vec![result.provider_name]))
    }

    async fn analyze_regions(
        &self,
        frame: &RasterFrame,
        active: Option<&WindowInfo>,
        regions: &[DirtyRegion],
    ) -> Result<(Vec<UiElement>, Vec<String>), CoreError> {
        let mut elements = Vec::new();
        let mut providers: Vec<String> = Vec::new();

        for region in regions {
            let request = with_active(DetectionRequest::region(region.bounds), active);
            let result = self.registry.detect(frame, active, &request).await?;
            debug!(
                region = ?region.bounds,
                score = region.diff_score,
                count = result.elements.len(),
                "영역 분석"
            );
            if !providers.contains(&result.provider_name) {
                providers.push(result.provider_name);
            }
            elements.extend(attach_window(result.elements, active));
        }

        Ok((elements, providers))
    }

    /// 어떤 dirty 영역과도 겹치지 않는 캐시 요소
    fn elements_outside(&self, regions: &[DirtyRegion]) -> Vec<UiElement> {
        self.cache
            .read()
            .elements()
            .filter(|e| !regions.iter().any(|r| r.bounds.intersects(&e.bounds)))
            .cloned()
            .collect()
    }
}

/// 마감이 지났으면 `false`, 아니면 마감을 넘지 않게 쉬고 `true`
async fn sleep_before(deadline: Instant, interval: Duration) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    tokio::time::sleep(interval.min(deadline - now)).await;
    true
}

fn with_active(request: DetectionRequest, active: Option<&WindowInfo>) -> DetectionRequest {
    match active {
        Some(window) => request.with_window(window.handle),
        None => request,
    }
}

/// 창 제목이 비어 있는 요소에 활성 창 제목을 붙인다
fn attach_window(elements: Vec<UiElement>, active: Option<&WindowInfo>) -> Vec<UiElement> {
    let Some(window) = active else {
        return elements;
    };
    elements
        .into_iter()
        .map(|mut e| {
            if e.window_title.is_none() {
                e.window_title = Some(window.title.clone());
            }
            e
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskstate_core::models::element::ElementKind;

    #[test]
    fn attach_window_keeps_existing_titles() {
        let window = WindowInfo::new(7, "Editor", Rect::new(0, 0, 100, 100));
        let elements = vec![
            UiElement::new(ElementKind::Button, Rect::new(0, 0, 10, 10)),
            UiElement::new(ElementKind::Text, Rect::new(20, 0, 10, 10)).with_window_title("Popup"),
        ];
        let out = attach_window(elements, Some(&window));
        assert_eq!(out[0].window_title.as_deref(), Some("Editor"));
        assert_eq!(out[1].window_title.as_deref(), Some("Popup"));
    }

    #[test]
    fn with_active_sets_handle() {
        let window = WindowInfo::new(7, "Editor", Rect::default());
        let request = with_active(DetectionRequest::full_frame(), Some(&window));
        assert_eq!(request.window_handle, Some(7));
        assert!(with_active(DetectionRequest::full_frame(), None)
            .window_handle
            .is_none());
    }
}
