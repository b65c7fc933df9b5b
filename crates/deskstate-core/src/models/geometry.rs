//! 화면 좌표계 직사각형.
//!
//! 경계는 양 끝 포함(inclusive)으로 판정한다. 맞닿은 두 사각형도 교차로 본다.

use serde::{Deserialize, Serialize};

/// 축 정렬 직사각형 (화면 픽셀 좌표)
///
/// 너비/높이는 부호 없는 정수라 음수가 될 수 없다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 좌상단/우하단 좌표로 생성
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        debug_assert!(x2 >= x1 && y2 >= y1, "뒤집힌 모서리: ({x1},{y1})-({x2},{y2})");
        Self {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1).max(0) as u32,
            height: y2.saturating_sub(y1).max(0) as u32,
        }
    }

    /// 오른쪽 경계 x
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// 아래쪽 경계 y
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// (x1, y1, x2, y2) 튜플
    pub fn to_corners(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.right(), self.bottom())
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        self.x <= px && px <= self.right() && self.y <= py && py <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() < other.x
            || other.right() < self.x
            || self.bottom() < other.y
            || other.bottom() < self.y)
    }

    /// 교차 영역. 맞닿기만 한 경우 폭 또는 높이가 0인 사각형을 반환한다.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect::from_corners(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        ))
    }

    /// 두 사각형을 감싸는 최소 사각형
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// 사방으로 `distance`만큼 확장
    pub fn expand(&self, distance: u32) -> Rect {
        let d = distance as i32;
        Rect {
            x: self.x.saturating_sub(d),
            y: self.y.saturating_sub(d),
            width: self.width.saturating_add(distance.saturating_mul(2)),
            height: self.height.saturating_add(distance.saturating_mul(2)),
        }
    }
}
