use bytes::Bytes;
use infer::{Infer, MatcherType};

use super::{Detector, DEFAULT_MINIMUM_BYTES};
use crate::common::error::DetectorError;
use crate::common::file_type::FileType;

/// 基于 `infer` 魔数表的检测器
///
/// 只识别可以通过前导字节判定的二进制格式，文本/脚本类匹配结果被忽略。
pub struct InferDetector {
    matchers: Infer,
    minimum_bytes: usize,
}

impl InferDetector {
    pub fn new() -> Self {
        Self::with_minimum_bytes(DEFAULT_MINIMUM_BYTES)
    }

    pub fn with_minimum_bytes(minimum_bytes: usize) -> Self {
        Self {
            matchers: Infer::new(),
            minimum_bytes,
        }
    }

    /// 同步检测入口，供不需要流式中继的调用方直接使用
    pub fn sniff(&self, buf: &[u8]) -> Option<FileType> {
        let kind = self.matchers.get(buf)?;
        if matches!(kind.matcher_type(), MatcherType::Text) {
            return None;
        }
        Some(FileType::new(kind.extension(), kind.mime_type()))
    }
}

impl Default for InferDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Detector for InferDetector {
    async fn detect(&self, buf: Bytes) -> Result<Option<FileType>, DetectorError> {
        Ok(self.sniff(&buf))
    }

    fn minimum_bytes(&self) -> usize {
        self.minimum_bytes
    }
}
