//! 변경 감지.
//!
//! 두 프레임의 그레이스케일 차분을 임계값 마스크로 만들고, 팽창/침식으로
//! 단일 픽셀 노이즈를 지운 뒤 남은 성분을 dirty 영역으로 보고한다.
//! 이전 프레임이 없거나 해상도가 바뀌면 부분 비교 대신 전체 캡처를 요구한다.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use deskstate_core::config::CaptureConfig;
use deskstate_core::error::CoreError;
use deskstate_core::models::frame::{
    CaptureDelta, DeltaOutcome, DirtyRegion, FullCaptureReason, RasterFrame,
};
use deskstate_core::models::geometry::Rect;
use image::GrayImage;
use tracing::{debug, warn};

use crate::downscale::downscale_gray;
use crate::frame::to_gray;
use crate::morphology::{
    abs_diff, component_bounds, dilate, erode, mean_in, threshold_mask, KERNEL_RADIUS,
};

/// 팽창 반복 횟수
const DILATE_ITERATIONS: u32 = 2;

/// 침식 반복 횟수
const ERODE_ITERATIONS: u32 = 1;

/// 두 그레이스케일 프레임 간 dirty 영역 계산
///
/// 순수 함수다. 다음 비교에 쓸 프레임 보관은 호출자 책임이며,
/// 상태를 들고 다니려면 [`ChangeDetector`]를 쓴다.
pub fn compute_dirty_regions(
    previous: Option<&GrayImage>,
    current: &GrayImage,
    config: &CaptureConfig,
) -> DeltaOutcome {
    let Some(previous) = previous else {
        return DeltaOutcome::FullCaptureRequired(FullCaptureReason::FirstCapture);
    };

    if previous.dimensions() != current.dimensions() {
        return DeltaOutcome::FullCaptureRequired(FullCaptureReason::ResolutionChanged {
            previous: previous.dimensions(),
            current: current.dimensions(),
        });
    }

    let (width, height) = current.dimensions();
    if width == 0 || height == 0 {
        return DeltaOutcome::Regions {
            regions: Vec::new(),
        };
    }

    let (prev_cmp, curr_cmp, scale) = comparison_pair(previous, current, config.diff_scale);

    let diff = abs_diff(&prev_cmp, &curr_cmp);
    let mask = threshold_mask(&diff, config.diff_threshold);
    let mask = erode(
        &dilate(&mask, KERNEL_RADIUS, DILATE_ITERATIONS),
        KERNEL_RADIUS,
        ERODE_ITERATIONS,
    );

    let frame_rect = Rect::new(0, 0, width, height);
    let mut regions = Vec::new();
    for blob in component_bounds(&mask) {
        let bounds = scale_up(&blob, scale);
        let bounds = bounds.intersection(&frame_rect).unwrap_or(bounds);
        if bounds.area() < config.min_region_area {
            continue;
        }

        let diff_score = (mean_in(&diff, &blob) / 255.0).clamp(0.0, 1.0);
        regions.push(DirtyRegion { bounds, diff_score });
    }

    let candidates = regions.len();
    let regions = merge_nearby_regions(regions, config.merge_distance);
    let regions = limit_regions(regions, config.max_regions);

    debug!(
        candidates,
        regions = regions.len(),
        scale,
        "dirty 영역 계산 완료"
    );

    DeltaOutcome::Regions { regions }
}

/// 비교 대상 쌍과 실제 적용된 배율
///
/// 축소에 실패하면 원본 해상도로 비교한다.
fn comparison_pair<'a>(
    previous: &'a GrayImage,
    current: &'a GrayImage,
    scale: f32,
) -> (Cow<'a, GrayImage>, Cow<'a, GrayImage>, f32) {
    if scale >= 1.0 || scale <= 0.0 {
        return (Cow::Borrowed(previous), Cow::Borrowed(current), 1.0);
    }

    match (
        downscale_gray(previous, scale),
        downscale_gray(current, scale),
    ) {
        (Ok(p), Ok(c)) => (Cow::Owned(p), Cow::Owned(c), scale),
        (Err(e), _) | (_, Err(e)) => {
            warn!("비교용 축소 실패, 원본 해상도로 비교: {e}");
            (Cow::Borrowed(previous), Cow::Borrowed(current), 1.0)
        }
    }
}

/// 비교 좌표를 원본 해상도로 환산 (내림)
fn scale_up(rect: &Rect, scale: f32) -> Rect {
    if scale >= 1.0 {
        return *rect;
    }
    let factor = 1.0 / scale as f64;
    Rect::new(
        (rect.x as f64 * factor) as i32,
        (rect.y as f64 * factor) as i32,
        (rect.width as f64 * factor) as u32,
        (rect.height as f64 * factor) as u32,
    )
}

/// 가까운 영역 병합
///
/// 확장(`distance`)한 경계가 다른 영역과 교차하면 합집합으로 묶고
/// 점수는 큰 쪽을 취한다. 더 이상 병합이 없을 때까지 반복한다.
pub fn merge_nearby_regions(mut regions: Vec<DirtyRegion>, distance: u32) -> Vec<DirtyRegion> {
    loop {
        let before = regions.len();
        regions = merge_pass(regions, distance);
        if regions.len() == before {
            return regions;
        }
    }
}

fn merge_pass(regions: Vec<DirtyRegion>, distance: u32) -> Vec<DirtyRegion> {
    if regions.len() <= 1 {
        return regions;
    }

    let mut used = vec![false; regions.len()];
    let mut merged = Vec::with_capacity(regions.len());

    for i in 0..regions.len() {
        if used[i] {
            continue;
        }
        let mut current = regions[i];

        for j in (i + 1)..regions.len() {
            if used[j] {
                continue;
            }
            if current.bounds.expand(distance).intersects(&regions[j].bounds) {
                current.bounds = current.bounds.union(&regions[j].bounds);
                current.diff_score = current.diff_score.max(regions[j].diff_score);
                used[j] = true;
            }
        }

        merged.push(current);
    }

    merged
}

/// 최대 개수 초과 시 면적이 큰 영역만 유지 (동률은 발견 순서)
pub fn limit_regions(mut regions: Vec<DirtyRegion>, max_regions: usize) -> Vec<DirtyRegion> {
    if regions.len() > max_regions {
        regions.sort_by(|a, b| b.bounds.area().cmp(&a.bounds.area()));
        regions.truncate(max_regions);
    }
    regions
}

/// 이전 프레임을 보관하는 상태형 변경 감지기
pub struct ChangeDetector {
    config: CaptureConfig,
    previous: Option<PreviousFrame>,
}

struct PreviousFrame {
    gray: GrayImage,
    captured_at: DateTime<Utc>,
}

impl ChangeDetector {
    /// 새 감지기 생성 (첫 호출은 전체 캡처)
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            previous: None,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// 설정 교체. 보관 중인 이전 프레임은 유지한다.
    pub fn set_config(&mut self, config: CaptureConfig) {
        self.config = config;
    }

    /// 이전 프레임 보유 여부
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// 이전 프레임 폐기. 다음 호출은 전체 캡처를 보고한다.
    pub fn reset(&mut self) {
        debug!("변경 감지기 리셋");
        self.previous = None;
    }

    /// 프레임을 이전 프레임과 비교하고 현재 프레임을 다음 비교용으로 보관
    pub fn detect(&mut self, frame: &RasterFrame) -> Result<CaptureDelta, CoreError> {
        let gray = to_gray(frame)?;
        Ok(self.detect_gray(gray, frame.captured_at))
    }

    /// 그레이스케일 프레임으로 비교
    pub fn detect_gray(&mut self, gray: GrayImage, captured_at: DateTime<Utc>) -> CaptureDelta {
        let outcome = compute_dirty_regions(
            self.previous.as_ref().map(|p| &p.gray),
            &gray,
            &self.config,
        );

        let previous_frame_at = match &outcome {
            DeltaOutcome::Regions { .. } => self.previous.as_ref().map(|p| p.captured_at),
            DeltaOutcome::FullCaptureRequired(reason) => {
                debug!(?reason, "전체 캡처 필요");
                None
            }
        };

        let frame_size = gray.dimensions();
        self.previous = Some(PreviousFrame { gray, captured_at });

        CaptureDelta {
            timestamp: captured_at,
            frame_size,
            outcome,
            previous_frame_at,
        }
    }
}
