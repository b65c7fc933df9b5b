//! 화면 상태 스냅샷과 시각 diff 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::element::{ElementKind, UiElement};
use super::geometry::Rect;
use super::window::WindowInfo;

/// 기본 화면 크기 (스냅샷에 크기가 없을 때)
pub const DEFAULT_SCREEN_SIZE: (u32, u32) = (1920, 1080);

/// 특정 시점의 화면 상태 (불변 스냅샷)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenState {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub elements: Vec<UiElement>,
    #[serde(default)]
    pub windows: Vec<WindowInfo>,
    /// 활성 창 제목
    #[serde(default)]
    pub active_window: Option<String>,
    #[serde(default = "default_screen_size")]
    pub screen_size: (u32, u32),
}

impl ScreenState {
    /// 빈 스냅샷
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            elements: Vec::new(),
            windows: Vec::new(),
            active_window: None,
            screen_size: DEFAULT_SCREEN_SIZE,
        }
    }

    pub fn with_elements(mut self, elements: Vec<UiElement>) -> Self {
        self.elements = elements;
        self
    }

    /// 창 목록 설정. 활성 창 제목은 첫 번째 활성 창에서 가져온다.
    pub fn with_windows(mut self, windows: Vec<WindowInfo>) -> Self {
        self.active_window = windows.iter().find(|w| w.is_active).map(|w| w.title.clone());
        self.windows = windows;
        self
    }

    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen_size = (width, height);
        self
    }

    pub fn get_element_by_id(&self, element_id: &str) -> Option<&UiElement> {
        self.elements.iter().find(|e| e.id == element_id)
    }

    /// 레이블 부분 일치 (대소문자 무시)
    pub fn get_element_by_label(&self, label: &str) -> Option<&UiElement> {
        let needle = label.to_lowercase();
        self.elements.iter().find(|e| {
            e.label
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&needle))
        })
    }

    pub fn elements_by_kind(&self, kind: ElementKind) -> Vec<&UiElement> {
        self.elements.iter().filter(|e| e.kind == kind).collect()
    }

    /// 좌표를 포함하는 가장 작은 요소
    pub fn element_at(&self, x: i32, y: i32) -> Option<&UiElement> {
        self.elements
            .iter()
            .filter(|e| e.bounds.contains(x, y))
            .min_by_key(|e| e.bounds.area())
    }
}

fn default_screen_size() -> (u32, u32) {
    DEFAULT_SCREEN_SIZE
}

/// 변경 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// 변경된 화면 영역
///
/// 병합된 영역은 원인이 섞이므로 분류가 `Modified`로 수렴한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedRegion {
    pub bounds: Rect,
    pub change_kind: ChangeKind,
    #[serde(default)]
    pub added_elements: Vec<UiElement>,
    #[serde(default)]
    pub removed_elements: Vec<UiElement>,
    #[serde(default)]
    pub modified_elements: Vec<UiElement>,
}

impl ChangedRegion {
    pub fn added(element: UiElement) -> Self {
        Self {
            bounds: element.bounds,
            change_kind: ChangeKind::Added,
            added_elements: vec![element],
            removed_elements: Vec::new(),
            modified_elements: Vec::new(),
        }
    }

    pub fn removed(element: UiElement) -> Self {
        Self {
            bounds: element.bounds,
            change_kind: ChangeKind::Removed,
            added_elements: Vec::new(),
            removed_elements: vec![element],
            modified_elements: Vec::new(),
        }
    }

    /// 수정 영역. 이동을 덮도록 이전/새 경계의 합집합을 쓴다
    pub fn modified(previous_bounds: Rect, element: UiElement) -> Self {
        Self {
            bounds: element.bounds.union(&previous_bounds),
            change_kind: ChangeKind::Modified,
            added_elements: Vec::new(),
            removed_elements: Vec::new(),
            modified_elements: vec![element],
        }
    }

    /// 두 영역 병합
    pub fn merge(mut self, other: ChangedRegion) -> Self {
        self.absorb(other);
        self
    }

    /// 다른 영역을 제자리에서 흡수
    pub fn absorb(&mut self, other: ChangedRegion) {
        self.bounds = self.bounds.union(&other.bounds);
        self.change_kind = ChangeKind::Modified;
        self.added_elements.extend(other.added_elements);
        self.removed_elements.extend(other.removed_elements);
        self.modified_elements.extend(other.modified_elements);
    }

    /// 영역에 포함된 요소 수 (추가 + 제거 + 수정)
    pub fn element_count(&self) -> usize {
        self.added_elements.len() + self.removed_elements.len() + self.modified_elements.len()
    }
}

/// 두 화면 상태 간 차이
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualDiff {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub changed_regions: Vec<ChangedRegion>,
    #[serde(default)]
    pub total_added: usize,
    #[serde(default)]
    pub total_removed: usize,
    #[serde(default)]
    pub total_modified: usize,
}

impl VisualDiff {
    /// 변경 없음
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            changed_regions: Vec::new(),
            total_added: 0,
            total_removed: 0,
            total_modified: 0,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changed_regions.is_empty()
    }

    /// 모든 영역의 추가 요소
    pub fn added_elements(&self) -> impl Iterator<Item = &UiElement> {
        self.changed_regions.iter().flat_map(|r| r.added_elements.iter())
    }

    pub fn removed_elements(&self) -> impl Iterator<Item = &UiElement> {
        self.changed_regions.iter().flat_map(|r| r.removed_elements.iter())
    }

    pub fn modified_elements(&self) -> impl Iterator<Item = &UiElement> {
        self.changed_regions
            .iter()
            .flat_map(|r| r.modified_elements.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(label: &str, bounds: Rect) -> UiElement {
        UiElement::new(ElementKind::Button, bounds).with_label(label)
    }

    #[test]
    fn element_at_prefers_smallest() {
        let state = ScreenState::new(Utc::now()).with_elements(vec![
            UiElement::new(ElementKind::Window, Rect::new(0, 0, 500, 500)),
            button("OK", Rect::new(10, 10, 50, 20)),
        ]);
        let hit = state.element_at(20, 15).unwrap();
        assert_eq!(hit.kind, ElementKind::Button);
        assert!(state.element_at(600, 600).is_none());
    }

    #[test]
    fn label_lookup_is_partial_and_case_insensitive() {
        let state = ScreenState::new(Utc::now())
            .with_elements(vec![button("Save As", Rect::new(0, 0, 40, 20))]);
        assert!(state.get_element_by_label("save").is_some());
        assert!(state.get_element_by_label("open").is_none());
    }

    #[test]
    fn with_windows_sets_active_title() {
        let state = ScreenState::new(Utc::now()).with_windows(vec![
            WindowInfo::new(1, "Terminal", Rect::new(0, 0, 100, 100)),
            WindowInfo::new(2, "Editor", Rect::new(0, 0, 100, 100)).active(),
        ]);
        assert_eq!(state.active_window.as_deref(), Some("Editor"));
    }

    #[test]
    fn merged_region_becomes_modified() {
        let a = ChangedRegion::added(button("A", Rect::new(0, 0, 10, 10)));
        let r = ChangedRegion::removed(button("B", Rect::new(5, 5, 10, 10)));
        let merged = a.merge(r);
        assert_eq!(merged.change_kind, ChangeKind::Modified);
        assert_eq!(merged.bounds, Rect::new(0, 0, 15, 15));
        assert_eq!(merged.added_elements.len(), 1);
        assert_eq!(merged.removed_elements.len(), 1);
    }

    #[test]
    fn modified_region_covers_motion() {
        let moved = button("OK", Rect::new(10, 40, 50, 20));
        let region = ChangedRegion::modified(Rect::new(10, 10, 50, 20), moved);
        assert_eq!(region.bounds, Rect::new(10, 10, 50, 50));
    }

    #[test]
    fn empty_diff_has_no_changes() {
        assert!(!VisualDiff::empty(Utc::now()).has_changes());
    }
}
