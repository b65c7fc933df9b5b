//! 시맨틱 UI 요소 모델.
//!
//! 요소 ID는 (종류, 격자 양자화된 위치)의 순수 함수다. 레이블과 텍스트는 ID에 들어가지 않는다.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::geometry::Rect;

/// ID 양자화 격자 크기 (픽셀)
pub const ID_GRID_SIZE: i32 = 20;

/// UI 요소 종류 (닫힌 열거형)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Button,
    Text,
    Input,
    Checkbox,
    Radio,
    Link,
    Icon,
    Image,
    Window,
    Menu,
    MenuItem,
    Tab,
    ListItem,
    Dropdown,
    Scrollbar,
    Toolbar,
    Unknown,
}

impl ElementKind {
    pub const ALL: [ElementKind; 17] = [
        ElementKind::Button,
        ElementKind::Text,
        ElementKind::Input,
        ElementKind::Checkbox,
        ElementKind::Radio,
        ElementKind::Link,
        ElementKind::Icon,
        ElementKind::Image,
        ElementKind::Window,
        ElementKind::Menu,
        ElementKind::MenuItem,
        ElementKind::Tab,
        ElementKind::ListItem,
        ElementKind::Dropdown,
        ElementKind::Scrollbar,
        ElementKind::Toolbar,
        ElementKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Button => "button",
            ElementKind::Text => "text",
            ElementKind::Input => "input",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Radio => "radio",
            ElementKind::Link => "link",
            ElementKind::Icon => "icon",
            ElementKind::Image => "image",
            ElementKind::Window => "window",
            ElementKind::Menu => "menu",
            ElementKind::MenuItem => "menu_item",
            ElementKind::Tab => "tab",
            ElementKind::ListItem => "list_item",
            ElementKind::Dropdown => "dropdown",
            ElementKind::Scrollbar => "scrollbar",
            ElementKind::Toolbar => "toolbar",
            ElementKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ElementKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| format!("알 수 없는 요소 종류: {s}"))
    }
}

/// 안정 요소 ID 계산
///
/// 위치/크기를 [`ID_GRID_SIZE`] 격자로 내림 양자화한 뒤 종류와 함께 해시한다.
/// 같은 격자 셀에 들어오는 두 검출은 같은 요소로 취급된다.
///
/// 셀 경계를 넘어 움직인 요소는 새 ID를 받으므로 diff에서 삭제+추가로 나타난다.
/// 이동을 수정으로 보고하려면 호출자가 이전 요소의 `id`를 새 검출에 옮겨 실어야 한다.
pub fn stable_element_id(kind: ElementKind, bounds: &Rect) -> String {
    let cell = |v: i64| v.div_euclid(ID_GRID_SIZE as i64);
    let key = format!(
        "{}:{}_{}_{}_{}",
        kind.as_str(),
        cell(bounds.x as i64),
        cell(bounds.y as i64),
        cell(bounds.width as i64),
        cell(bounds.height as i64)
    );
    let digest = Sha256::digest(key.as_bytes());
    let hex: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("elem_{hex}")
}

/// 화면에서 검출된 UI 요소
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElement {
    /// 안정 ID (종류 + 양자화 위치)
    pub id: String,
    /// 요소 종류
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// 바운딩 박스
    pub bounds: Rect,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// 검출 신뢰도 (0.0 ~ 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_focused: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// 소속 창 제목
    #[serde(default)]
    pub window_title: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// 검출 시각
    #[serde(default = "Utc::now")]
    pub detected_at: DateTime<Utc>,
}

impl UiElement {
    /// 안정 ID를 부여한 새 요소 생성
    pub fn new(kind: ElementKind, bounds: Rect) -> Self {
        Self {
            id: stable_element_id(kind, &bounds),
            kind,
            bounds,
            label: None,
            text: None,
            confidence: 1.0,
            is_enabled: true,
            is_visible: true,
            is_focused: false,
            parent_id: None,
            window_title: None,
            metadata: HashMap::new(),
            detected_at: Utc::now(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = Some(title.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// 활성/표시/포커스 상태 설정
    pub fn with_flags(mut self, enabled: bool, visible: bool, focused: bool) -> Self {
        self.is_enabled = enabled;
        self.is_visible = visible;
        self.is_focused = focused;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// 레이블이 있고 비어 있지 않으면 반환
    pub fn non_empty_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }

    /// 요소 중심 좌표 (클릭 위치)
    pub fn position(&self) -> (i32, i32) {
        self.bounds.center()
    }
}

fn default_confidence() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}
