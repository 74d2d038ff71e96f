use bytes::{Bytes, BytesMut};

use crate::common::file_type::{Detection, FileType};

use super::observer::TypeObserver;

/// 一次检测调用：冻结的前缀快照及其覆盖的长度
pub(crate) struct Check {
    pub len: usize,
    pub prefix: Bytes,
}

/// 中继会话的检测状态
///
/// 累积缓冲只增不减，直到检测完成；完成后释放缓冲并进入惰性状态。
pub(crate) struct SniffState {
    chunks: Vec<Bytes>,
    length: usize,
    minimum_bytes: usize,
    detection: Detection,
    observers: Vec<TypeObserver>,
}

impl SniffState {
    pub(crate) fn new(minimum_bytes: usize) -> Self {
        Self {
            chunks: Vec::new(),
            length: 0,
            minimum_bytes,
            detection: Detection::Pending,
            observers: Vec::new(),
        }
    }

    pub(crate) fn detection(&self) -> &Detection {
        &self.detection
    }

    pub(crate) fn buffered_bytes(&self) -> usize {
        self.length
    }

    /// 注册观察者；若检测已完成则原样退回，由调用方在锁外立即通知
    pub(crate) fn register(&mut self, observer: TypeObserver) -> Option<TypeObserver> {
        if self.detection.is_final() {
            return Some(observer);
        }
        self.observers.push(observer);
        None
    }

    /// 累积一个数据块并生成本次检测所需的前缀快照
    ///
    /// 已完成，或者已累积到阈值、正在等待阈值检测结果时，不再累积。
    /// 第一个数据块总会被检测（阈值为 0 时也一样）。
    pub(crate) fn accumulate(&mut self, chunk: &Bytes) -> Option<Check> {
        let saturated = !self.chunks.is_empty() && self.length >= self.minimum_bytes;
        if self.detection.is_final() || saturated {
            return None;
        }
        self.chunks.push(chunk.clone());
        self.length += chunk.len();

        let prefix = if self.chunks.len() == 1 {
            self.chunks[0].clone()
        } else {
            let mut joined = BytesMut::with_capacity(self.length);
            for part in &self.chunks {
                joined.extend_from_slice(part);
            }
            joined.freeze()
        };
        Some(Check {
            len: self.length,
            prefix,
        })
    }

    /// 处理一次检测结果：命中或前缀达到阈值即完成
    pub(crate) fn settle(
        &mut self,
        len: usize,
        found: Option<FileType>,
    ) -> Option<Vec<TypeObserver>> {
        if self.detection.is_final() {
            return None;
        }
        if found.is_none() && len < self.minimum_bytes {
            return None;
        }
        Some(self.finalize(found))
    }

    /// 输入结束：若尚未完成则以 unknown 完成
    pub(crate) fn finish(&mut self) -> Option<Vec<TypeObserver>> {
        if self.detection.is_final() {
            return None;
        }
        Some(self.finalize(None))
    }

    fn finalize(&mut self, found: Option<FileType>) -> Vec<TypeObserver> {
        self.detection = Detection::from(found);
        self.chunks = Vec::new();
        self.length = 0;
        std::mem::take(&mut self.observers)
    }
}
