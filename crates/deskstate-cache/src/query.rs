//! 복합 요소 질의 필터.

use deskstate_core::models::element::{ElementKind, UiElement};
use deskstate_core::models::geometry::Rect;
use serde::{Deserialize, Serialize};

/// 기본 최대 결과 수
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// 요소 질의
///
/// 설정된 조건을 모두 만족하는 요소만 통과한다. 문자열 조건은
/// 대소문자를 무시한 부분 일치다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementQuery {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: Option<ElementKind>,
    #[serde(default)]
    pub window_title: Option<String>,
    /// 이 영역과 교차하는 요소만
    #[serde(default)]
    pub bounds: Option<Rect>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for ElementQuery {
    fn default() -> Self {
        Self {
            label: None,
            kind: None,
            window_title: None,
            bounds: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl ElementQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_window(mut self, title: &str) -> Self {
        self.window_title = Some(title.to_string());
        self
    }

    pub fn within(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// 종류를 제외한 나머지 조건 검사
    ///
    /// 종류 조건은 호출자가 종류 인덱스로 후보를 좁힐 때 이미 적용된다.
    pub fn matches_filters(&self, element: &UiElement) -> bool {
        if let Some(label) = &self.label {
            if !contains_ignore_case(element.label.as_deref(), label) {
                return false;
            }
        }
        if let Some(title) = &self.window_title {
            if !contains_ignore_case(element.window_title.as_deref(), title) {
                return false;
            }
        }
        if let Some(bounds) = &self.bounds {
            if !bounds.intersects(&element.bounds) {
                return false;
            }
        }
        true
    }

    /// 모든 조건 검사
    pub fn matches(&self, element: &UiElement) -> bool {
        self.kind.map_or(true, |k| element.kind == k) && self.matches_filters(element)
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}
