//! deskstate CLI 진입점.
//!
//! 로그는 stderr, 결과 JSON은 stdout으로 출력한다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deskstate_app::commands;
use deskstate_core::config::AppConfig;
use deskstate_core::config_manager::ConfigManager;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 화면 변경 감지와 시각 상태 캐시 도구
#[derive(Parser, Debug)]
#[command(name = "deskstate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (없으면 플랫폼 기본 경로, 파일이 없으면 기본값으로 생성)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 두 이미지의 변경 영역을 JSON으로 출력
    Diff {
        #[arg(long)]
        previous: PathBuf,
        #[arg(long)]
        current: PathBuf,
    },
    /// ScreenState JSON 스냅샷을 순서대로 캐시에 적용하고 diff와 요약 출력
    Replay {
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
        /// 최종 요약만 출력
        #[arg(long)]
        summary_only: bool,
    },
    /// 화면을 주기적으로 캡처하여 변경 영역 기록
    #[cfg(feature = "capture")]
    Watch {
        /// 캡처 주기 (밀리초, 기본: 설정값)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// 지정 횟수 후 종료 (기본: Ctrl+C까지)
        #[arg(long)]
        cycles: Option<u64>,
    },
}

fn init_tracing(log_level: &str) {
    let log_filter = [
        "deskstate",
        "deskstate_app",
        "deskstate_core",
        "deskstate_vision",
        "deskstate_cache",
    ]
    .iter()
    .map(|target| format!("{target}={log_level}"))
    .collect::<Vec<_>>()
    .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// 설정 로드
///
/// 명시한 경로의 오류는 그대로 실패한다. 기본 경로 실패 시에는
/// 플랫폼 프로젝트 디렉토리, 마지막으로 내장 기본값 순으로 물러난다.
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        let manager = ConfigManager::with_path(path.to_path_buf())
            .with_context(|| format!("설정 파일 로드 실패: {}", path.display()))?;
        return Ok(manager.get());
    }

    match ConfigManager::new() {
        Ok(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            Ok(manager.get())
        }
        Err(e) => {
            warn!("설정 파일을 열 수 없음, 기본 설정 사용: {e}");
            Ok(AppConfig::default_config())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Diff { previous, current } => {
            let delta = commands::diff_images(&previous, &current, &config.capture)?;
            print_json(&delta)?;
        }
        Command::Replay {
            snapshots,
            summary_only,
        } => {
            let report = commands::replay_snapshots(&snapshots, &config.cache)?;
            if summary_only {
                print_json(&report.summary)?;
            } else {
                print_json(&report)?;
            }
        }
        #[cfg(feature = "capture")]
        Command::Watch {
            interval_ms,
            cycles,
        } => {
            watch::run(config, interval_ms, cycles).await?;
        }
    }

    Ok(())
}

#[cfg(feature = "capture")]
mod watch {
    use std::time::Duration;

    use anyhow::Result;
    use deskstate_cache::SharedVisualCache;
    use deskstate_core::config::AppConfig;
    use deskstate_core::ports::raster_source::{RasterSource, WindowSource};
    use deskstate_vision::capture::ScreenCapture;
    use deskstate_vision::ChangeDetector;
    use tracing::{info, warn};

    /// 주기 캡처 루프. Ctrl+C 또는 `cycles` 도달 시 종료.
    pub async fn run(config: AppConfig, interval_ms: Option<u64>, cycles: Option<u64>) -> Result<()> {
        let capture = ScreenCapture::new(config.capture.monitor);
        let mut detector = ChangeDetector::new(config.capture.clone());
        let cache = SharedVisualCache::from_config(config.cache.clone());

        let period = Duration::from_millis(interval_ms.unwrap_or(config.capture.capture_interval_ms));
        let mut ticker = tokio::time::interval(period);
        let mut completed = 0u64;

        info!(
            source = capture.name(),
            interval_ms = period.as_millis() as u64,
            monitors = ScreenCapture::monitor_count().unwrap_or(0),
            "화면 감시 시작"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("종료 신호 수신");
                    break;
                }
            }

            match capture.list_windows() {
                Ok(windows) => cache.update_windows(windows),
                Err(e) => warn!(error = %e, "창 목록 조회 실패"),
            }

            let frame = match capture.capture() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "캡처 실패, 다음 주기에 재시도");
                    continue;
                }
            };
            let delta = detector.detect(&frame)?;

            if delta.has_changes() {
                info!(
                    full = delta.is_full_capture(),
                    regions = delta.dirty_regions().len(),
                    dirty_area = delta.total_dirty_area(),
                    active_window = cache.read().active_window_title().unwrap_or(""),
                    "화면 변경"
                );
                super::print_json(&delta)?;
            }

            completed += 1;
            if cycles.is_some_and(|limit| completed >= limit) {
                break;
            }
        }

        info!(cycles = completed, "화면 감시 종료");
        Ok(())
    }
}
