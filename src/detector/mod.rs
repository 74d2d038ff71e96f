mod blocking;
mod signature;

pub use blocking::{Blocking, SyncDetector};
pub use signature::InferDetector;

use bytes::Bytes;

use crate::common::error::DetectorError;
use crate::common::file_type::FileType;

/// 参考检测库所声明的最小字节数：读到这么多字节后一定能给出结论
pub const DEFAULT_MINIMUM_BYTES: usize = 4100;

/// 文件签名检测器（外部协作方）
///
/// 接收当前累积的前缀，返回可能的 `{ext, mime}` 匹配。
/// 同步检测器直接在 `detect` 中返回即可；异步检测器可以在后台完成，
/// 中继层保证不会因为等待检测结果而阻塞数据转发。
#[async_trait::async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, buf: Bytes) -> Result<Option<FileType>, DetectorError>;

    /// 足以给出确定结论的最小前缀长度，同时作为中继缓冲的上限
    fn minimum_bytes(&self) -> usize {
        DEFAULT_MINIMUM_BYTES
    }
}

/// 把普通的同步匹配函数包装成 [`Detector`]，在当前任务内直接完成
pub struct FnDetector<F> {
    matcher: F,
    minimum_bytes: usize,
}

impl<F> FnDetector<F>
where
    F: Fn(&[u8]) -> Option<FileType> + Send + Sync,
{
    pub fn new(matcher: F) -> Self {
        Self {
            matcher,
            minimum_bytes: DEFAULT_MINIMUM_BYTES,
        }
    }

    pub fn with_minimum_bytes(mut self, minimum_bytes: usize) -> Self {
        self.minimum_bytes = minimum_bytes;
        self
    }
}

#[async_trait::async_trait]
impl<F> Detector for FnDetector<F>
where
    F: Fn(&[u8]) -> Option<FileType> + Send + Sync,
{
    async fn detect(&self, buf: Bytes) -> Result<Option<FileType>, DetectorError> {
        Ok((self.matcher)(&buf))
    }

    fn minimum_bytes(&self) -> usize {
        self.minimum_bytes
    }
}
