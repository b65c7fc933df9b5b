//! 캐시 통계와 요약.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use deskstate_core::models::element::ElementKind;
use serde::{Deserialize, Serialize};

/// 캐시 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_elements: usize,
    pub total_windows: usize,
    pub history_size: usize,
    pub last_update: Option<DateTime<Utc>>,
    /// 전체/증분 갱신 횟수
    pub updates_count: u64,
    /// ID/레이블/좌표 조회 적중
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// 용량 초과로 밀려난 요소 수
    pub evictions: u64,
}

impl CacheStats {
    /// 조회 적중률 (조회가 없으면 0.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// 현재 상태 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub timestamp: Option<DateTime<Utc>>,
    pub screen_size: (u32, u32),
    pub total_elements: usize,
    pub total_windows: usize,
    pub active_window: Option<String>,
    /// 종류별 요소 수
    pub elements_by_kind: BTreeMap<ElementKind, usize>,
    pub stats: CacheStats,
}
