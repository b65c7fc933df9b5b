//! 비교용 축소.
//!
//! fast_image_resize 기반 그레이스케일 고속 리사이즈.
//! 변경 감지 전에 두 프레임을 같은 배율로 줄여 비교 비용을 낮춘다.

use deskstate_core::error::CoreError;
use fast_image_resize::{images::Image as FirImage, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::GrayImage;
use tracing::debug;

/// 배율 적용 후 크기. 각 축은 내림하되 최소 1픽셀을 보장한다.
pub fn scaled_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let w = ((width as f64) * scale as f64).floor() as u32;
    let h = ((height as f64) * scale as f64).floor() as u32;
    (w.max(1), h.max(1))
}

/// 그레이스케일 이미지를 `scale` 배율로 축소
///
/// `scale >= 1.0`이면 복제본을 반환한다.
pub fn downscale_gray(image: &GrayImage, scale: f32) -> Result<GrayImage, CoreError> {
    let (src_w, src_h) = image.dimensions();
    if scale >= 1.0 {
        return Ok(image.clone());
    }
    if src_w == 0 || src_h == 0 {
        return Err(CoreError::Image("소스 이미지 크기 0".to_string()));
    }

    let (dst_w, dst_h) = scaled_size(src_w, src_h, scale);
    if (dst_w, dst_h) == (src_w, src_h) {
        return Ok(image.clone());
    }

    let src_image = FirImage::from_vec_u8(src_w, src_h, image.as_raw().clone(), PixelType::U8)
        .map_err(|e| CoreError::Image(format!("소스 이미지 생성 실패: {e}")))?;
    let mut dst_image = FirImage::new(dst_w, dst_h, PixelType::U8);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::Image(format!("리사이즈 실패: {e}")))?;

    debug!("비교용 축소: {src_w}x{src_h} → {dst_w}x{dst_h}");

    GrayImage::from_raw(dst_w, dst_h, dst_image.into_vec())
        .ok_or_else(|| CoreError::Image("결과 이미지 생성 실패".to_string()))
}
