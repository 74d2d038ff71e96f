use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::common::file_type::{Detection, FileType};

use super::state::SniffState;

/// 类型通知回调，只调用一次；`None` 表示 unknown
pub type TypeObserver = Box<dyn FnOnce(Option<FileType>) + Send + 'static>;

/// 对中继状态的只读视图，可在中继被移入管道后继续查询
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) id: Arc<str>,
    pub(crate) state: Arc<Mutex<SniffState>>,
}

impl RelayHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 当前检测结果的副本；未完成或未识别时为 `None`
    pub fn current_type(&self) -> Option<FileType> {
        self.lock().detection().file_type()
    }

    pub fn detection(&self) -> Detection {
        self.lock().detection().clone()
    }

    /// 当前为检测而缓冲的字节数，完成后归零
    pub fn buffered_bytes(&self) -> usize {
        self.lock().buffered_bytes()
    }

    /// 注册类型通知回调
    ///
    /// 检测完成之后注册的回调会立即以既定结果调用一次。
    pub fn on_type<F>(&self, observer: F)
    where
        F: FnOnce(Option<FileType>) + Send + 'static,
    {
        let late = self.lock().register(Box::new(observer));
        if let Some(observer) = late {
            let file_type = self.current_type();
            observer(file_type);
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SniffState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 以 future 方式等待检测结果的监听器
pub struct TypeListener {
    pub(crate) rx: watch::Receiver<Detection>,
}

impl TypeListener {
    /// 等待检测完成
    ///
    /// 若中继在完成前被丢弃（例如会话因错误中止），返回 `Detection::Pending`。
    pub async fn wait(mut self) -> Detection {
        let settled = self
            .rx
            .wait_for(|detection| detection.is_final())
            .await
            .map(|detection| detection.clone());
        match settled {
            Ok(detection) => detection,
            Err(_) => self.rx.borrow().clone(),
        }
    }
}

pub(crate) fn notify(observers: Vec<TypeObserver>, detection: &Detection) {
    for observer in observers {
        observer(detection.file_type());
    }
}
