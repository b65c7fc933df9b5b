//! 스크린 캡처.
//!
//! xcap 기반 모니터 캡처와 창 열거. `capture` feature에서만 빌드된다.

use chrono::Utc;
use deskstate_core::error::CoreError;
use deskstate_core::models::frame::RasterFrame;
use deskstate_core::models::geometry::Rect;
use deskstate_core::models::window::WindowInfo;
use deskstate_core::ports::raster_source::{RasterSource, WindowSource};
use tracing::debug;
use xcap::{Monitor, Window};

/// xcap 스크린 캡처
pub struct ScreenCapture {
    /// 캡처할 모니터 인덱스 (None이면 주 모니터)
    monitor: Option<usize>,
}

impl ScreenCapture {
    pub fn new(monitor: Option<usize>) -> Self {
        Self { monitor }
    }

    fn find_monitor(&self) -> Result<Monitor, CoreError> {
        let monitors = Monitor::all()
            .map_err(|e| CoreError::Capture(format!("모니터 목록 조회 실패: {e}")))?;

        match self.monitor {
            Some(index) => monitors
                .into_iter()
                .nth(index)
                .ok_or_else(|| CoreError::Capture(format!("모니터 인덱스 {index} 없음"))),
            None => {
                let primary = monitors
                    .iter()
                    .position(|m| m.is_primary().unwrap_or(false))
                    .unwrap_or(0);
                monitors
                    .into_iter()
                    .nth(primary)
                    .ok_or_else(|| CoreError::Capture("모니터를 찾을 수 없음".to_string()))
            }
        }
    }

    /// 사용 가능한 모니터 수
    pub fn monitor_count() -> Result<usize, CoreError> {
        Monitor::all()
            .map(|m| m.len())
            .map_err(|e| CoreError::Capture(format!("모니터 목록 조회 실패: {e}")))
    }
}

impl Default for ScreenCapture {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RasterSource for ScreenCapture {
    fn capture(&self) -> Result<RasterFrame, CoreError> {
        let monitor = self.find_monitor()?;
        let image = monitor
            .capture_image()
            .map_err(|e| CoreError::Capture(format!("스크린 캡처 실패: {e}")))?;

        debug!("스크린 캡처 완료: {}x{}", image.width(), image.height());

        Ok(RasterFrame {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
            captured_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "xcap"
    }
}

impl WindowSource for ScreenCapture {
    fn list_windows(&self) -> Result<Vec<WindowInfo>, CoreError> {
        let windows = Window::all()
            .map_err(|e| CoreError::Capture(format!("창 목록 조회 실패: {e}")))?;

        let infos: Vec<WindowInfo> = windows
            .iter()
            .filter(|w| !w.is_minimized().unwrap_or(false))
            .map(|w| {
                let bounds = Rect::new(
                    w.x().unwrap_or_default(),
                    w.y().unwrap_or_default(),
                    w.width().unwrap_or_default(),
                    w.height().unwrap_or_default(),
                );
                let mut info = WindowInfo::new(
                    w.id().unwrap_or_default() as i64,
                    w.title().unwrap_or_default(),
                    bounds,
                )
                .with_process(w.app_name().unwrap_or_default(), w.pid().unwrap_or_default());
                info.is_active = w.is_focused().unwrap_or(false);
                info.is_maximized = w.is_maximized().unwrap_or(false);
                info
            })
            .collect();

        debug!(count = infos.len(), "창 목록 조회 완료");
        Ok(infos)
    }

    fn screen_size(&self) -> Result<(u32, u32), CoreError> {
        let monitor = self.find_monitor()?;
        let width = monitor
            .width()
            .map_err(|e| CoreError::Capture(format!("모니터 크기 조회 실패: {e}")))?;
        let height = monitor
            .height()
            .map_err(|e| CoreError::Capture(format!("모니터 크기 조회 실패: {e}")))?;
        Ok((width, height))
    }
}
