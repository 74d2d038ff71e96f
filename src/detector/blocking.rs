use std::sync::Arc;

use bytes::Bytes;
use tokio::task;

use super::{Detector, DEFAULT_MINIMUM_BYTES};
use crate::common::error::DetectorError;
use crate::common::file_type::FileType;

/// 同步检测器：检测过程可能较重（例如需要扫描整个前缀），不适合在异步任务内直接执行
pub trait SyncDetector: Send + Sync + 'static {
    fn detect_blocking(&self, buf: &[u8]) -> Result<Option<FileType>, DetectorError>;

    fn minimum_bytes(&self) -> usize {
        DEFAULT_MINIMUM_BYTES
    }
}

/// 将 [`SyncDetector`] 放到阻塞线程池执行的适配器
///
/// 检测任务 panic 或被取消时返回 `DetectorError::Aborted`，由中继作为致命错误上抛。
pub struct Blocking<D> {
    inner: Arc<D>,
}

impl<D: SyncDetector> Blocking<D> {
    pub fn new(detector: D) -> Self {
        Self {
            inner: Arc::new(detector),
        }
    }
}

#[async_trait::async_trait]
impl<D: SyncDetector> Detector for Blocking<D> {
    async fn detect(&self, buf: Bytes) -> Result<Option<FileType>, DetectorError> {
        let detector = self.inner.clone();
        task::spawn_blocking(move || detector.detect_blocking(&buf))
            .await
            .map_err(|join_err| {
                if join_err.is_panic() {
                    DetectorError::Aborted("detector panicked".into())
                } else {
                    DetectorError::Aborted(join_err.to_string())
                }
            })?
    }

    fn minimum_bytes(&self) -> usize {
        SyncDetector::minimum_bytes(self.inner.as_ref())
    }
}
