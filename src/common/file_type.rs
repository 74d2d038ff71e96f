use serde::{Deserialize, Serialize};

/// 检测出的文件类型：规范扩展名与 MIME 类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileType {
    /// 不带点的扩展名，如 "png"
    pub ext: String,
    /// MIME 类型，如 "image/png"
    pub mime: String,
}

impl FileType {
    pub fn new(ext: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            ext: ext.into(),
            mime: mime.into(),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.ext, self.mime)
    }
}

/// 检测状态快照
///
/// `Pending` 表示仍在累积数据；`Known` / `Unknown` 为终态，一旦进入不再变化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Pending,
    Known(FileType),
    Unknown,
}

impl Detection {
    pub fn is_final(&self) -> bool {
        !matches!(self, Detection::Pending)
    }

    /// 通知载荷视图：`None` 即 unknown 标记（或尚未完成）
    pub fn file_type(&self) -> Option<FileType> {
        match self {
            Detection::Known(file_type) => Some(file_type.clone()),
            _ => None,
        }
    }
}

impl From<Option<FileType>> for Detection {
    fn from(value: Option<FileType>) -> Self {
        match value {
            Some(file_type) => Detection::Known(file_type),
            None => Detection::Unknown,
        }
    }
}
