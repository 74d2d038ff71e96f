use crate::config::Settings;
use crate::detector::InferDetector;
use std::sync::Arc;

/// Web 应用全局状态
///
/// 职责：包含所有跨请求共享的对象，通过 Arc 注入到 Axum 的 Handler 中。
pub struct AppState {
    pub settings: Settings,
    /// 所有请求共享同一个检测器（魔数表只构建一次）
    pub detector: Arc<InferDetector>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let detector = Arc::new(InferDetector::with_minimum_bytes(
            settings.detection.minimum_bytes,
        ));
        Self { settings, detector }
    }
}
