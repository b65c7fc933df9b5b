//! 설정 파일 관리.
//!
//! `AppConfig`를 JSON 파일 하나로 보관한다. 기본 위치는 `directories`가 알려주는
//! 사용자 설정 디렉토리 아래 `config.json`. 저장은 임시 파일에 쓴 뒤 rename 한다.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.json";

/// 기본 설정 파일 경로 (`<사용자 설정 디렉토리>/deskstate/config.json`)
pub fn default_config_path() -> Result<PathBuf, CoreError> {
    ProjectDirs::from("dev", "deskstate", "deskstate")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .ok_or_else(|| CoreError::Config("사용자 설정 디렉토리를 결정할 수 없음".to_string()))
}

/// 설정 파일과 메모리 사본을 함께 들고 있는 핸들
///
/// 복제해도 같은 설정을 공유한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    current: Arc<RwLock<AppConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// 기본 경로의 설정 파일을 연다
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(default_config_path()?)
    }

    /// 지정한 경로의 설정 파일을 연다. 없으면 기본값으로 만든다.
    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        let config = load_or_create(&path)?;
        Ok(Self {
            current: Arc::new(RwLock::new(config)),
            path,
        })
    }

    pub fn get(&self) -> AppConfig {
        self.current.read().clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 검증 후 파일에 쓰고 메모리 사본을 교체
    ///
    /// 검증이나 저장이 실패하면 기존 설정이 그대로 남는다.
    pub fn update(&self, config: AppConfig) -> Result<(), CoreError> {
        config.validate()?;
        write_atomic(&self.path, &config)?;
        *self.current.write() = config;
        debug!(path = %self.path.display(), "설정 저장");
        Ok(())
    }

    /// 현재 설정의 일부를 고쳐 저장하고 결과를 돌려준다
    pub fn update_with<F>(&self, edit: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        edit(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// 외부에서 고친 파일을 다시 읽는다
    ///
    /// 파일이 깨졌으면 에러를 돌려주고 메모리 사본은 유지한다.
    pub fn reload(&self) -> Result<AppConfig, CoreError> {
        let config = read_config(&self.path)?;
        *self.current.write() = config.clone();
        info!(path = %self.path.display(), "설정 다시 로드");
        Ok(config)
    }
}

fn load_or_create(path: &Path) -> Result<AppConfig, CoreError> {
    if path.exists() {
        return read_config(path);
    }
    let config = AppConfig::default_config();
    write_atomic(path, &config)?;
    info!(path = %path.display(), "기본 설정 파일 생성");
    Ok(config)
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("{} 읽기 실패: {e}", path.display())))?;
    let config: AppConfig = serde_json::from_str(&text)
        .map_err(|e| CoreError::Config(format!("{} 파싱 실패: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// 같은 디렉토리의 `.tmp` 파일에 쓴 뒤 rename
fn write_atomic(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| CoreError::Config(format!("{} 생성 실패: {e}", dir.display())))?;
    }

    let text = serde_json::to_string_pretty(config)
        .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, text)
        .map_err(|e| CoreError::Config(format!("{} 쓰기 실패: {e}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|e| CoreError::Config(format!("{} 교체 실패: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let manager = ConfigManager::with_path(path.clone()).unwrap();

        assert!(path.exists());
        assert_eq!(manager.get().cache.max_elements, 1000);
        assert_eq!(manager.config_path(), path.as_path());
    }

    #[test]
    fn updates_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();

        let saved = manager
            .update_with(|c| {
                c.capture.diff_threshold = 45;
                c.cache.max_history = 3;
            })
            .unwrap();
        assert_eq!(saved.capture.diff_threshold, 45);

        let reopened = ConfigManager::with_path(path).unwrap().get();
        assert_eq!(reopened.capture.diff_threshold, 45);
        assert_eq!(reopened.cache.max_history, 3);
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();
        manager.update_with(|c| c.cache.max_history = 7).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.json")]);
    }

    #[test]
    fn invalid_update_is_rejected_and_not_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();

        let result = manager.update_with(|c| c.capture.diff_scale = 2.0);
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert!((manager.get().capture.diff_scale - 0.5).abs() < f32::EPSILON);

        let on_disk = ConfigManager::with_path(path).unwrap().get();
        assert!((on_disk.capture.diff_scale - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn reload_picks_up_external_edit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();
        let shared = manager.clone();

        let mut edited = manager.get();
        edited.cache.position_tolerance = 9;
        fs::write(&path, serde_json::to_string_pretty(&edited).unwrap()).unwrap();

        let reloaded = manager.reload().unwrap();
        assert_eq!(reloaded.cache.position_tolerance, 9);
        // 복제본도 같은 설정을 본다
        assert_eq!(shared.get().cache.position_tolerance, 9);
    }

    #[test]
    fn corrupt_reload_keeps_previous_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();
        manager.update_with(|c| c.cache.max_history = 4).unwrap();

        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(manager.reload(), Err(CoreError::Config(_))));
        assert_eq!(manager.get().cache.max_history, 4);
        assert!(matches!(
            ConfigManager::with_path(path),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn default_path_ends_with_config_file() {
        // 홈 디렉토리가 없는 환경에서는 에러가 정상
        match default_config_path() {
            Ok(path) => {
                assert_eq!(path.file_name().unwrap(), CONFIG_FILE_NAME);
                let lowered = path.to_string_lossy().to_lowercase();
                assert!(lowered.contains("deskstate"), "path={}", path.display());
            }
            Err(e) => assert!(matches!(e, CoreError::Config(_))),
        }
    }
}
