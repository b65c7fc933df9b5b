//! 최상위 창 정보.

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// 창 정보
///
/// `handle`은 플랫폼이 부여한 불투명 정수다. 코어는 해석하지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: i64,
    pub title: String,
    pub bounds: Rect,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub process_name: String,
    #[serde(default)]
    pub process_id: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_minimized: bool,
    #[serde(default)]
    pub is_maximized: bool,
}

impl WindowInfo {
    /// 기본 상태 플래그로 새 창 정보 생성
    pub fn new(handle: i64, title: impl Into<String>, bounds: Rect) -> Self {
        Self {
            handle,
            title: title.into(),
            bounds,
            class_name: String::new(),
            process_name: String::new(),
            process_id: 0,
            is_active: false,
            is_visible: true,
            is_minimized: false,
            is_maximized: false,
        }
    }

    pub fn with_process(mut self, name: impl Into<String>, pid: u32) -> Self {
        self.process_name = name.into();
        self.process_id = pid;
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }
}

fn default_true() -> bool {
    true
}
