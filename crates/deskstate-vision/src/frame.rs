//! RasterFrame ↔ image 크레이트 변환.
//!
//! 포트 경계의 프레임은 RGBA 바이트 버퍼이고, 내부 처리는 `image` 타입을 쓴다.

use std::io::Cursor;
use std::path::Path;

use chrono::Utc;
use deskstate_core::error::CoreError;
use deskstate_core::models::frame::RasterFrame;
use deskstate_core::models::geometry::Rect;
use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
use tracing::debug;

/// 프레임을 `DynamicImage`로 변환 (버퍼 복사)
pub fn to_dynamic_image(frame: &RasterFrame) -> Result<DynamicImage, CoreError> {
    let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| {
            CoreError::Image(format!(
                "RGBA 버퍼 크기 불일치: {}x{} ({} 바이트)",
                frame.width,
                frame.height,
                frame.pixels.len()
            ))
        })?;
    Ok(DynamicImage::ImageRgba8(rgba))
}

/// `DynamicImage`를 현재 시각의 프레임으로 변환
pub fn from_dynamic_image(image: &DynamicImage) -> RasterFrame {
    let rgba = image.to_rgba8();
    RasterFrame {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
        captured_at: Utc::now(),
    }
}

/// 비교용 그레이스케일 변환
pub fn to_gray(frame: &RasterFrame) -> Result<GrayImage, CoreError> {
    Ok(to_dynamic_image(frame)?.to_luma8())
}

/// 이미지 파일을 프레임으로 로드
pub fn load_frame(path: &Path) -> Result<RasterFrame, CoreError> {
    let image = image::open(path)
        .map_err(|e| CoreError::Image(format!("이미지 로드 실패 ({}): {e}", path.display())))?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "프레임 로드");
    Ok(from_dynamic_image(&image))
}

/// 영역을 프레임 경계로 잘라낸다. 겹치는 부분이 없거나 면적이 0이면 None.
pub fn clamp_to_frame(frame: &RasterFrame, region: &Rect) -> Option<Rect> {
    let clipped = region.intersection(&frame.bounds())?;
    (clipped.area() > 0).then_some(clipped)
}

/// 프레임의 일부를 PNG로 인코딩
///
/// OCR 제공자에 넘기는 입력 포맷이다. 영역은 프레임 경계로 잘린다.
pub fn crop_png(frame: &RasterFrame, region: &Rect) -> Result<(Vec<u8>, Rect), CoreError> {
    let clipped = clamp_to_frame(frame, region).ok_or_else(|| {
        CoreError::Image(format!(
            "영역이 프레임 밖: {:?} (프레임 {}x{})",
            region, frame.width, frame.height
        ))
    })?;

    let image = to_dynamic_image(frame)?;
    let cropped = image.crop_imm(
        clipped.x as u32,
        clipped.y as u32,
        clipped.width,
        clipped.height,
    );

    let mut buf = Vec::new();
    cropped
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CoreError::Image(format!("PNG 인코딩 실패: {e}")))?;

    Ok((buf, clipped))
}
