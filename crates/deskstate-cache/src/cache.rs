//! 시각 상태 캐시.
//!
//! 화면의 시맨틱 요소/창 집합을 보관하는 가상 DOM. 전체 교체 갱신과
//! 증분 패치 갱신 모두 diff를 반환하며, 갱신 전 상태는 이력에 남긴다.
//!
//! 동시 접근이 필요하면 [`crate::shared::SharedVisualCache`]로 감싼다.
//! 조회 적중/실패 카운터는 원자적이므로 조회는 `&self`로 충분하다.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use deskstate_core::config::CacheConfig;
use deskstate_core::models::element::{ElementKind, UiElement};
use deskstate_core::models::state::{ChangedRegion, ScreenState, VisualDiff, DEFAULT_SCREEN_SIZE};
use deskstate_core::models::window::WindowInfo;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diff::{compute_diff, merge_changed_regions};
use crate::fuzzy::best_match;
use crate::history::StateHistory;
use crate::query::ElementQuery;
use crate::stats::{CacheStats, CacheSummary};
use crate::store::ElementStore;

/// 증분 수정 요청의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// 기존 요소를 교체함
    Modified,
    /// 대상 ID가 없어 추가로 처리함
    TreatedAsAddition,
}

/// 증분 제거 요청의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    /// 대상 ID가 없어 아무것도 하지 않음
    NotPresent,
}

/// 증분 갱신 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalUpdate {
    pub diff: VisualDiff,
    /// 요청 순서대로의 제거 결과
    pub removals: Vec<(String, RemovalOutcome)>,
    /// 요청 순서대로의 수정 결과
    pub modifications: Vec<(String, UpdateOutcome)>,
}

/// 시각 상태 캐시
pub struct VisualStateCache {
    config: CacheConfig,
    store: ElementStore,
    /// 창 목록 (핸들 중복 없음, 입력 순서 유지)
    windows: Vec<WindowInfo>,
    active_window: Option<String>,
    screen_size: (u32, u32),
    last_update: Option<DateTime<Utc>>,
    history: StateHistory,
    updates_count: u64,
    evictions: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl VisualStateCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: ElementStore::new(config.group_by_window),
            history: StateHistory::new(config.max_history),
            config,
            windows: Vec::new(),
            active_window: None,
            screen_size: DEFAULT_SCREEN_SIZE,
            last_update: None,
            updates_count: 0,
            evictions: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// 현재 상태 스냅샷 (요소는 삽입 순)
    pub fn current_state(&self) -> ScreenState {
        ScreenState {
            timestamp: self.last_update.unwrap_or_else(Utc::now),
            elements: self.store.iter().cloned().collect(),
            windows: self.windows.clone(),
            active_window: self.active_window.clone(),
            screen_size: self.screen_size,
        }
    }

    // ============================================================
    // 갱신
    // ============================================================

    /// 전체 갱신: 요소/창 집합을 새 스냅샷으로 교체하고 diff 반환
    pub fn update_full(&mut self, state: ScreenState) -> VisualDiff {
        self.archive_current();

        let diff = compute_diff(
            self.store.iter(),
            &state.elements,
            self.config.position_tolerance,
            state.timestamp,
        );

        self.store.clear();
        for element in state.elements {
            self.insert_element(element);
        }

        self.windows = dedup_windows(state.windows);
        self.active_window = state.active_window;
        self.screen_size = state.screen_size;
        self.last_update = Some(state.timestamp);
        self.updates_count += 1;

        info!(
            added = diff.total_added,
            removed = diff.total_removed,
            modified = diff.total_modified,
            regions = diff.changed_regions.len(),
            elements = self.store.len(),
            "캐시 전체 갱신"
        );
        diff
    }

    /// 증분 갱신: 제거 → 추가 → 수정 순으로 적용
    ///
    /// 없는 ID 제거는 무시되고, 없는 ID 수정은 추가로 처리된다.
    /// diff의 합계는 실제 처리 결과를 센다.
    pub fn update_incremental(
        &mut self,
        added: Vec<UiElement>,
        removed_ids: &[String],
        modified: Vec<UiElement>,
    ) -> IncrementalUpdate {
        self.archive_current();

        let mut regions = Vec::new();
        let (mut total_added, mut total_removed, mut total_modified) = (0, 0, 0);

        let mut removals = Vec::with_capacity(removed_ids.len());
        for id in removed_ids {
            match self.store.remove(id) {
                Some(element) => {
                    regions.push(ChangedRegion::removed(element));
                    total_removed += 1;
                    removals.push((id.clone(), RemovalOutcome::Removed));
                }
                None => {
                    debug!(id = %id, "제거 대상 없음, 무시");
                    removals.push((id.clone(), RemovalOutcome::NotPresent));
                }
            }
        }

        for element in added {
            regions.push(ChangedRegion::added(element.clone()));
            self.insert_element(element);
            total_added += 1;
        }

        let mut modifications = Vec::with_capacity(modified.len());
        for element in modified {
            let id = element.id.clone();
            match self.store.remove(&id) {
                Some(previous) => {
                    regions.push(ChangedRegion::modified(previous.bounds, element.clone()));
                    self.insert_element(element);
                    total_modified += 1;
                    modifications.push((id, UpdateOutcome::Modified));
                }
                None => {
                    debug!(id = %id, "수정 대상 없음, 추가로 처리");
                    regions.push(ChangedRegion::added(element.clone()));
                    self.insert_element(element);
                    total_added += 1;
                    modifications.push((id, UpdateOutcome::TreatedAsAddition));
                }
            }
        }

        let now = Utc::now();
        self.last_update = Some(now);
        self.updates_count += 1;

        let diff = VisualDiff {
            timestamp: now,
            changed_regions: merge_changed_regions(regions),
            total_added,
            total_removed,
            total_modified,
        };

        debug!(
            added = total_added,
            removed = total_removed,
            modified = total_modified,
            regions = diff.changed_regions.len(),
            "캐시 증분 갱신"
        );

        IncrementalUpdate {
            diff,
            removals,
            modifications,
        }
    }

    /// 비어 있지 않으면 현재 상태를 이력에 보관
    fn archive_current(&mut self) {
        if !self.store.is_empty() {
            let snapshot = self.current_state();
            self.history.push(snapshot);
        }
    }

    /// 용량을 지키며 삽입 (가장 먼저 들어온 요소부터 퇴출)
    fn insert_element(&mut self, element: UiElement) {
        let max = self.config.max_elements;
        if max == 0 {
            return;
        }
        if !self.store.contains(&element.id) {
            while self.store.len() >= max {
                match self.store.pop_oldest() {
                    Some(evicted) => {
                        self.evictions += 1;
                        debug!(id = %evicted.id, "용량 초과로 요소 퇴출");
                    }
                    None => break,
                }
            }
        }
        self.store.insert(element);
    }

    // ============================================================
    // 조회
    // ============================================================

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// ID 조회 (O(1))
    pub fn get_element_by_id(&self, id: &str) -> Option<&UiElement> {
        let found = self.store.get(id);
        self.record(found.is_some());
        found
    }

    /// 레이블 조회 (설정의 퍼지 매칭 여부/임계값 사용)
    pub fn get_element_by_label(&self, label: &str) -> Option<&UiElement> {
        self.get_element_by_label_with(
            label,
            self.config.fuzzy_matching,
            self.config.label_fuzzy_threshold,
        )
    }

    /// 레이블 조회
    ///
    /// 대소문자 무시 정확 일치를 먼저 찾고, 없으면 `fuzzy`일 때
    /// 모든 레이블 요소 중 점수가 `threshold` 이상인 최고점 요소를 반환한다.
    /// 정확 일치는 다른 요소의 퍼지 점수와 무관하게 항상 우선한다.
    pub fn get_element_by_label_with(
        &self,
        label: &str,
        fuzzy: bool,
        threshold: u8,
    ) -> Option<&UiElement> {
        if let Some(element) = self.store.first_with_label(label) {
            self.record(true);
            return Some(element);
        }

        if fuzzy {
            let candidates = self
                .store
                .iter()
                .filter_map(|e| e.non_empty_label().map(|l| (e, l)));
            if let Some((element, score)) = best_match(label, candidates, threshold) {
                debug!(query = label, matched = ?element.label, score, "레이블 퍼지 일치");
                self.record(true);
                return Some(element);
            }
        }

        self.record(false);
        None
    }

    /// 좌표를 포함하는 가장 작은 요소
    pub fn get_element_at(&self, x: i32, y: i32) -> Option<&UiElement> {
        let found = self
            .store
            .iter()
            .filter(|e| e.bounds.contains(x, y))
            .min_by_key(|e| e.bounds.area());
        self.record(found.is_some());
        found
    }

    /// 복합 질의. 종류 조건이 있으면 종류 인덱스에서 시작한다.
    pub fn query(&self, query: &ElementQuery) -> Vec<&UiElement> {
        let candidates: Box<dyn Iterator<Item = &UiElement> + '_> = match query.kind {
            Some(kind) => Box::new(self.store.of_kind(kind)),
            None => Box::new(self.store.iter()),
        };
        candidates
            .filter(|e| query.matches_filters(e))
            .take(query.limit)
            .collect()
    }

    pub fn elements_by_kind(&self, kind: ElementKind) -> Vec<&UiElement> {
        self.store.of_kind(kind).collect()
    }

    /// 창 제목이 정확히 일치하는 요소
    ///
    /// 창 인덱스를 끈 설정에서는 전체를 훑는다.
    pub fn elements_in_window(&self, title: &str) -> Vec<&UiElement> {
        if self.store.indexes_windows() {
            self.store.in_window(title).collect()
        } else {
            self.store
                .iter()
                .filter(|e| e.window_title.as_deref() == Some(title))
                .collect()
        }
    }

    /// 삽입 순 전체 요소
    pub fn elements(&self) -> impl Iterator<Item = &UiElement> {
        self.store.iter()
    }

    // ============================================================
    // 창
    // ============================================================

    /// 창 목록 교체. 첫 번째 활성 창이 활성 창이 된다 (없으면 None).
    pub fn update_windows(&mut self, windows: Vec<WindowInfo>) {
        self.windows = dedup_windows(windows);
        self.active_window = self
            .windows
            .iter()
            .find(|w| w.is_active)
            .map(|w| w.title.clone());
        debug!(
            count = self.windows.len(),
            active = ?self.active_window,
            "창 목록 갱신"
        );
    }

    pub fn windows(&self) -> &[WindowInfo] {
        &self.windows
    }

    pub fn get_window(&self, handle: i64) -> Option<&WindowInfo> {
        self.windows.iter().find(|w| w.handle == handle)
    }

    /// 제목으로 창 찾기 (설정의 퍼지 여부/임계값 사용)
    pub fn get_window_by_title(&self, title: &str) -> Option<&WindowInfo> {
        self.get_window_by_title_with(
            title,
            self.config.fuzzy_matching,
            self.config.window_fuzzy_threshold,
        )
    }

    /// 제목으로 창 찾기: 부분 일치 우선, 다음 퍼지
    pub fn get_window_by_title_with(
        &self,
        title: &str,
        fuzzy: bool,
        threshold: u8,
    ) -> Option<&WindowInfo> {
        let needle = title.to_lowercase();
        if let Some(window) = self
            .windows
            .iter()
            .find(|w| w.title.to_lowercase().contains(&needle))
        {
            return Some(window);
        }

        if !fuzzy {
            return None;
        }
        best_match(
            title,
            self.windows.iter().map(|w| (w, w.title.as_str())),
            threshold,
        )
        .map(|(w, _)| w)
    }

    /// 활성 플래그가 켜진 첫 창
    pub fn get_active_window(&self) -> Option<&WindowInfo> {
        self.windows.iter().find(|w| w.is_active)
    }

    pub fn active_window_title(&self) -> Option<&str> {
        self.active_window.as_deref()
    }

    // ============================================================
    // 이력 / 통계 / 유지보수
    // ============================================================

    /// 오래된 것부터 이력 스냅샷
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &ScreenState> {
        self.history.iter()
    }

    /// 직전 갱신 전 상태
    pub fn previous_state(&self) -> Option<&ScreenState> {
        self.history.latest()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_elements: self.store.len(),
            total_windows: self.windows.len(),
            history_size: self.history.len(),
            last_update: self.last_update,
            updates_count: self.updates_count,
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions,
        }
    }

    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            timestamp: self.last_update,
            screen_size: self.screen_size,
            total_elements: self.store.len(),
            total_windows: self.windows.len(),
            active_window: self.active_window.clone(),
            elements_by_kind: self.store.kind_counts(),
            stats: self.stats(),
        }
    }

    /// 요소/창/이력 초기화. 누적 통계 카운터는 유지한다.
    pub fn clear(&mut self) {
        self.store.clear();
        self.windows.clear();
        self.history.clear();
        self.active_window = None;
        self.last_update = None;
        info!("캐시 초기화");
    }
}

impl Default for VisualStateCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// 핸들 중복 제거 (나중 항목이 앞선 자리를 덮어쓴다)
fn dedup_windows(windows: Vec<WindowInfo>) -> Vec<WindowInfo> {
    let mut out: Vec<WindowInfo> = Vec::with_capacity(windows.len());
    for window in windows {
        match out.iter_mut().find(|w| w.handle == window.handle) {
            Some(existing) => *existing = window,
            None => out.push(window),
        }
    }
    out
}
