use thiserror::Error;

/// 检测器失败（外部协作方错误），对当前会话是致命的，中继层不做重试
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector failed: {0}")]
    Failed(String),
    #[error("detector task aborted: {0}")]
    Aborted(String),
}

impl DetectorError {
    pub fn failed(details: impl std::fmt::Display) -> Self {
        DetectorError::Failed(details.to_string())
    }
}

impl From<DetectorError> for std::io::Error {
    fn from(err: DetectorError) -> Self {
        std::io::Error::other(err)
    }
}
