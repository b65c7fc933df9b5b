//! 요소 제공자 레지스트리.
//!
//! 우선순위 순으로 제공자를 보관하고, 활성 창에 맞는 제공자를 고른다.
//! 구조화 API(접근성 트리, DOM)가 래스터 OCR보다 먼저 시도된다.
//! 선택 로직은 캐시 위에 있으며 캐시 의미론을 바꾸지 않는다.

use std::sync::Arc;
use std::time::Instant;

use deskstate_core::error::CoreError;
use deskstate_core::models::frame::RasterFrame;
use deskstate_core::models::geometry::Rect;
use deskstate_core::models::window::WindowInfo;
use deskstate_core::ports::element_provider::{DetectionRequest, ElementProvider, ProviderResult};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// 우선순위 정렬 제공자 목록
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn ElementProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 제공자 등록. 우선순위 내림차순을 유지하며 동률은 등록 순서.
    pub fn register(&self, provider: Arc<dyn ElementProvider>) {
        let mut providers = self.providers.write();
        debug!(
            provider = provider.name(),
            priority = provider.priority(),
            "요소 제공자 등록"
        );
        providers.push(provider);
        providers.sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    /// 등록된 제공자 (우선순위 순)
    pub fn providers(&self) -> Vec<Arc<dyn ElementProvider>> {
        self.providers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// 창을 처리할 수 있는 제공자 후보 (우선순위 순)
    ///
    /// 창 정보가 없으면 빈 창 정보로 `can_handle`을 묻는다.
    pub fn candidates(&self, window: Option<&WindowInfo>) -> Vec<Arc<dyn ElementProvider>> {
        let placeholder;
        let window = match window {
            Some(w) => w,
            None => {
                placeholder = WindowInfo::new(0, "", Rect::default());
                &placeholder
            }
        };

        self.providers
            .read()
            .iter()
            .filter(|p| p.is_available() && p.can_handle(window))
            .cloned()
            .collect()
    }

    /// 가장 우선순위가 높은 사용 가능 제공자
    pub fn select(&self, window: Option<&WindowInfo>) -> Option<Arc<dyn ElementProvider>> {
        let selected = self.candidates(window).into_iter().next();
        if let Some(p) = &selected {
            debug!(
                provider = p.name(),
                window = window.map(|w| w.title.as_str()).unwrap_or(""),
                "요소 제공자 선택"
            );
        }
        selected
    }

    /// 후보 제공자를 순서대로 시도하여 첫 성공 결과 반환
    ///
    /// 실패한 제공자는 경고 후 건너뛴다. 모두 실패하거나 후보가 없으면 에러.
    pub async fn detect(
        &self,
        frame: &RasterFrame,
        window: Option<&WindowInfo>,
        request: &DetectionRequest,
    ) -> Result<ProviderResult, CoreError> {
        let candidates = self.candidates(window);
        if candidates.is_empty() {
            return Err(CoreError::Provider {
                provider: "registry".to_string(),
                message: "사용 가능한 요소 제공자 없음".to_string(),
            });
        }

        let mut last_error = None;
        for provider in candidates {
            let started = Instant::now();
            match provider.detect(frame, request).await {
                Ok(mut result) => {
                    if result.provider_name.is_empty() {
                        result.provider_name = provider.name().to_string();
                    }
                    debug!(
                        provider = provider.name(),
                        count = result.elements.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        region = ?request.region,
                        "요소 검출 완료"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "요소 검출 실패, 다음 제공자 시도");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::Internal("검출 결과 없음".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deskstate_core::models::element::{ElementKind, UiElement};

    struct MockProvider {
        name: &'static str,
        priority: i32,
        available: bool,
        process: Option<&'static str>,
        fail: bool,
    }

    impl MockProvider {
        fn new(name: &'static str, priority: i32) -> Self {
            Self {
                name,
                priority,
                available: true,
                process: None,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ElementProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_handle(&self, window: &WindowInfo) -> bool {
            match self.process {
                Some(p) => window.process_name == p,
                None => true,
            }
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn detect(
            &self,
            _frame: &RasterFrame,
            request: &DetectionRequest,
        ) -> Result<ProviderResult, CoreError> {
            if self.fail {
                return Err(CoreError::Provider {
                    provider: self.name.to_string(),
                    message: "검출 실패".to_string(),
                });
            }
            let bounds = request.region.unwrap_or(Rect::new(0, 0, 10, 10));
            Ok(ProviderResult {
                elements: vec![UiElement::new(ElementKind::Text, bounds).with_text(self.name)],
                provider_name: self.name.to_string(),
                detection_time_ms: 0.0,
            })
        }
    }

    fn frame() -> RasterFrame {
        RasterFrame::new(4, 4, vec![0; 64]).unwrap()
    }

    fn chrome_window() -> WindowInfo {
        WindowInfo::new(7, "Docs", Rect::new(0, 0, 800, 600)).with_process("chrome", 42)
    }

    #[test]
    fn register_keeps_priority_order() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::new("ocr", 10)));
        registry.register(Arc::new(MockProvider::new("cdp", 100)));
        registry.register(Arc::new(MockProvider::new("uia", 80)));

        let names: Vec<String> = registry
            .providers()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["cdp", "uia", "ocr"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn select_respects_can_handle() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::new("ocr", 10)));
        registry.register(Arc::new(MockProvider {
            process: Some("chrome"),
            ..MockProvider::new("cdp", 100)
        }));

        let chrome = chrome_window();
        assert_eq!(registry.select(Some(&chrome)).unwrap().name(), "cdp");

        let other = WindowInfo::new(8, "Notes", Rect::new(0, 0, 100, 100));
        assert_eq!(registry.select(Some(&other)).unwrap().name(), "ocr");
        assert_eq!(registry.select(None).unwrap().name(), "ocr");
    }

    #[test]
    fn select_skips_unavailable() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider {
            available: false,
            ..MockProvider::new("uia", 80)
        }));
        registry.register(Arc::new(MockProvider::new("ocr", 10)));
        assert_eq!(registry.select(None).unwrap().name(), "ocr");
    }

    #[test]
    fn empty_registry_selects_nothing() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.select(None).is_none());
    }

    #[tokio::test]
    async fn detect_falls_back_after_failure() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider {
            fail: true,
            ..MockProvider::new("cdp", 100)
        }));
        registry.register(Arc::new(MockProvider::new("ocr", 10)));

        let request = DetectionRequest::region(Rect::new(1, 1, 2, 2));
        let result = registry.detect(&frame(), None, &request).await.unwrap();
        assert_eq!(result.provider_name, "ocr");
        assert_eq!(result.elements[0].bounds, Rect::new(1, 1, 2, 2));
    }

    #[tokio::test]
    async fn detect_reports_last_error_when_all_fail() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider {
            fail: true,
            ..MockProvider::new("ocr", 10)
        }));

        let err = registry
            .detect(&frame(), None, &DetectionRequest::full_frame())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Provider { ref provider, .. } if provider == "ocr"));
    }

    #[tokio::test]
    async fn detect_without_candidates_is_error() {
        let registry = ProviderRegistry::new();
        let err = registry
            .detect(&frame(), None, &DetectionRequest::full_frame())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Provider { ref provider, .. } if provider == "registry"));
    }
}
