//! 스레드 간 공유 캐시 핸들.
//!
//! 단일 작성자/다중 독자. 갱신은 쓰기 잠금 하나 안에서 원자적으로 끝나므로
//! 독자는 갱신 전 또는 후 상태만 본다. 조회 결과는 복제해서 돌려준다.

use std::sync::Arc;

use deskstate_core::config::CacheConfig;
use deskstate_core::models::element::UiElement;
use deskstate_core::models::state::{ScreenState, VisualDiff};
use deskstate_core::models::window::WindowInfo;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::{IncrementalUpdate, VisualStateCache};
use crate::query::ElementQuery;
use crate::stats::{CacheStats, CacheSummary};

/// `Arc<RwLock<VisualStateCache>>` 래퍼
#[derive(Clone)]
pub struct SharedVisualCache {
    inner: Arc<RwLock<VisualStateCache>>,
}

impl SharedVisualCache {
    pub fn new(cache: VisualStateCache) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn from_config(config: CacheConfig) -> Self {
        Self::new(VisualStateCache::new(config))
    }

    /// 읽기 잠금. 여러 조회를 한 시점 기준으로 묶을 때 사용한다.
    pub fn read(&self) -> RwLockReadGuard<'_, VisualStateCache> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, VisualStateCache> {
        self.inner.write()
    }

    pub fn update_full(&self, state: ScreenState) -> VisualDiff {
        self.inner.write().update_full(state)
    }

    pub fn update_incremental(
        &self,
        added: Vec<UiElement>,
        removed_ids: &[String],
        modified: Vec<UiElement>,
    ) -> IncrementalUpdate {
        self.inner
            .write()
            .update_incremental(added, removed_ids, modified)
    }

    pub fn update_windows(&self, windows: Vec<WindowInfo>) {
        self.inner.write().update_windows(windows);
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<UiElement> {
        self.inner.read().get_element_by_id(id).cloned()
    }

    pub fn get_element_by_label(&self, label: &str) -> Option<UiElement> {
        self.inner.read().get_element_by_label(label).cloned()
    }

    pub fn get_element_at(&self, x: i32, y: i32) -> Option<UiElement> {
        self.inner.read().get_element_at(x, y).cloned()
    }

    pub fn query(&self, query: &ElementQuery) -> Vec<UiElement> {
        self.inner
            .read()
            .query(query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> ScreenState {
        self.inner.read().current_state()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.read().stats()
    }

    pub fn summary(&self) -> CacheSummary {
        self.inner.read().summary()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl Default for SharedVisualCache {
    fn default() -> Self {
        Self::new(VisualStateCache::default())
    }
}
