//! 이진 마스크 연산.
//!
//! 차분 → 임계값 마스크 → 팽창/침식 → 연결 성분 바운딩 박스.
//! 사각형 커널은 분리 가능하므로 가로/세로 1차원 패스 두 번으로 처리한다.
//! 이미지 밖 픽셀은 연산에서 제외한다.

use deskstate_core::models::geometry::Rect;
use image::GrayImage;

/// 마스크 전경 값
pub const MASK_ON: u8 = 255;

/// 노이즈 억제용 사각형 커널 반경 (5x5)
pub const KERNEL_RADIUS: u32 = 2;

/// 픽셀별 절대 차분. 두 이미지는 크기가 같아야 한다.
pub fn abs_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions(), "차분 대상 크기 불일치");
    let (w, h) = a.dimensions();
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&p, &q)| p.abs_diff(q))
        .collect();
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}

/// 차분이 `threshold` 이상인 픽셀을 전경으로 표시
pub fn threshold_mask(diff: &GrayImage, threshold: u8) -> GrayImage {
    let (w, h) = diff.dimensions();
    let data = diff
        .as_raw()
        .iter()
        .map(|&d| if d >= threshold { MASK_ON } else { 0 })
        .collect();
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}

/// 사각형 커널 팽창 (`iterations`회)
pub fn dilate(mask: &GrayImage, radius: u32, iterations: u32) -> GrayImage {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = rect_filter(&out, radius, Extremum::Max);
    }
    out
}

/// 사각형 커널 침식 (`iterations`회)
pub fn erode(mask: &GrayImage, radius: u32, iterations: u32) -> GrayImage {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = rect_filter(&out, radius, Extremum::Min);
    }
    out
}

#[derive(Clone, Copy)]
enum Extremum {
    Max,
    Min,
}

impl Extremum {
    #[inline]
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Extremum::Max => a.max(b),
            Extremum::Min => a.min(b),
        }
    }
}

fn rect_filter(src: &GrayImage, radius: u32, op: Extremum) -> GrayImage {
    let (w, h) = src.dimensions();
    let (wu, hu, r) = (w as usize, h as usize, radius as usize);
    let raw = src.as_raw();

    // 가로 패스
    let mut horizontal = vec![0u8; raw.len()];
    for y in 0..hu {
        let row = &raw[y * wu..(y + 1) * wu];
        for x in 0..wu {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(wu - 1);
            horizontal[y * wu + x] = row[lo..=hi]
                .iter()
                .fold(row[x], |acc, &v| op.pick(acc, v));
        }
    }

    // 세로 패스
    let mut out = vec![0u8; raw.len()];
    for y in 0..hu {
        let lo = y.saturating_sub(r);
        let hi = (y + r).min(hu - 1);
        for x in 0..wu {
            let mut acc = horizontal[y * wu + x];
            for yy in lo..=hi {
                acc = op.pick(acc, horizontal[yy * wu + x]);
            }
            out[y * wu + x] = acc;
        }
    }

    GrayImage::from_raw(w, h, out).unwrap_or_else(|| GrayImage::new(w, h))
}

/// 8-연결 전경 성분의 바운딩 박스 (래스터 순서로 발견)
///
/// 바깥 외곽선의 바운딩 박스와 같다. 내부 구멍은 무시된다.
pub fn component_bounds(mask: &GrayImage) -> Vec<Rect> {
    let (w, h) = mask.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let raw = mask.as_raw();
    let mut visited = vec![false; raw.len()];
    let mut boxes = Vec::new();
    let mut stack = Vec::new();

    for start in 0..raw.len() {
        if raw[start] == 0 || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % wu, idx / wu);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for ny in y.saturating_sub(1)..=(y + 1).min(hu - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(wu - 1) {
                    let n = ny * wu + nx;
                    if raw[n] != 0 && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        boxes.push(Rect::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ));
    }

    boxes
}

/// 영역 내 평균값 (0.0 ~ 255.0). 영역은 이미지 경계로 잘린다.
pub fn mean_in(image: &GrayImage, region: &Rect) -> f32 {
    let (w, h) = image.dimensions();
    let Some(clipped) = region.intersection(&Rect::new(0, 0, w, h)) else {
        return 0.0;
    };
    if clipped.area() == 0 {
        return 0.0;
    }

    let raw = image.as_raw();
    let wu = w as usize;
    let mut sum = 0u64;
    for y in clipped.y as usize..clipped.bottom() as usize {
        let row = &raw[y * wu..(y + 1) * wu];
        sum += row[clipped.x as usize..clipped.right() as usize]
            .iter()
            .map(|&v| v as u64)
            .sum::<u64>();
    }
    (sum as f64 / clipped.area() as f64) as f32
}
