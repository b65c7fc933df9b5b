//! 래스터/창 정보 소스 포트.

use crate::error::CoreError;
use crate::models::frame::RasterFrame;
use crate::models::window::WindowInfo;

/// 화면 래스터 소스: 요청 시 프레임 한 장을 제공
///
/// 구현체: `ScreenCapture` (xcap, `capture` feature)
pub trait RasterSource: Send + Sync {
    /// 현재 화면 캡처
    fn capture(&self) -> Result<RasterFrame, CoreError>;

    /// 소스 이름 (로그용)
    fn name(&self) -> &str;
}

/// 창 목록 소스
pub trait WindowSource: Send + Sync {
    /// 보이는 최상위 창 목록 (Z 순서)
    fn list_windows(&self) -> Result<Vec<WindowInfo>, CoreError>;

    /// 화면 크기 (width, height)
    fn screen_size(&self) -> Result<(u32, u32), CoreError>;
}
