//! 화면 상태 이력.
//!
//! 갱신 직전 상태를 보관하는 크기 제한 링 버퍼. 개수로만 제한하며
//! 오래된 스냅샷부터 밀려난다.

use std::collections::VecDeque;

use deskstate_core::models::state::ScreenState;
use tracing::debug;

/// 크기 제한 스냅샷 이력
pub struct StateHistory {
    entries: VecDeque<ScreenState>,
    max_entries: usize,
}

impl StateHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(64)),
            max_entries,
        }
    }

    /// 스냅샷 보관. 용량 0이면 아무것도 보관하지 않는다.
    pub fn push(&mut self, state: ScreenState) {
        if self.max_entries == 0 {
            return;
        }
        while self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        debug!(
            elements = state.elements.len(),
            depth = self.entries.len() + 1,
            "이력 스냅샷 보관"
        );
        self.entries.push_back(state);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// 가장 최근 스냅샷
    pub fn latest(&self) -> Option<&ScreenState> {
        self.entries.back()
    }

    /// 오래된 것부터 순회
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ScreenState> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn state(offset_secs: i64) -> ScreenState {
        ScreenState::new(Utc::now() + Duration::seconds(offset_secs))
    }

    #[test]
    fn oldest_dropped_at_capacity() {
        let mut history = StateHistory::new(2);
        let (a, b, c) = (state(0), state(1), state(2));
        history.push(a);
        history.push(b.clone());
        history.push(c.clone());

        assert_eq!(history.len(), 2);
        let kept: Vec<_> = history.iter().map(|s| s.timestamp).collect();
        assert_eq!(kept, vec![b.timestamp, c.timestamp]);
        assert_eq!(history.latest().unwrap().timestamp, c.timestamp);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = StateHistory::new(0);
        history.push(state(0));
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }
}
