mod observer;
mod state;

pub use observer::{RelayHandle, TypeListener, TypeObserver};

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesOrdered, Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::common::error::DetectorError;
use crate::common::file_type::{Detection, FileType};
use crate::detector::Detector;

use observer::notify;
use state::{Check, SniffState};

type CheckFuture = BoxFuture<'static, (usize, Result<Option<FileType>, DetectorError>)>;

/// 类型嗅探中继：原样转发上游数据块，同时在前导字节上做一次性类型检测
///
/// 每个数据块到达后，对累积前缀调用一次检测器；检测命中或前缀达到
/// 检测器声明的最小字节数时完成检测，并向所有观察者发出唯一一次通知。
/// 上游结束时若仍未完成，则以 unknown 完成。
///
/// 检测结果只能通过返回副本的查询接口读取：
///
/// ```
/// use vtx_mime_stream::{DetectingRelay, InferDetector};
///
/// let upstream = futures_util::stream::empty::<std::io::Result<bytes::Bytes>>();
/// let mut relay = DetectingRelay::new(upstream, InferDetector::new());
/// let _exclusive = &mut relay;
/// assert_eq!(relay.current_type(), None);
/// assert_eq!(relay.handle().current_type(), None);
/// ```
///
/// 即使持有可变借用，也无法直接写入中继内部的检测结果：
///
/// ```compile_fail
/// use vtx_mime_stream::{DetectingRelay, FileType, InferDetector};
///
/// let upstream = futures_util::stream::empty::<std::io::Result<bytes::Bytes>>();
/// let mut relay = DetectingRelay::new(upstream, InferDetector::new());
/// relay.detected_type = Some(FileType::new("foo", "bar"));
/// ```
///
/// 句柄同样只读：
///
/// ```compile_fail
/// use vtx_mime_stream::{DetectingRelay, Detection, InferDetector};
///
/// let upstream = futures_util::stream::empty::<std::io::Result<bytes::Bytes>>();
/// let relay = DetectingRelay::new(upstream, InferDetector::new());
/// let mut handle = relay.handle();
/// handle.detection = Detection::Unknown;
/// ```
pub struct DetectingRelay<S, D> {
    upstream: S,
    detector: Arc<D>,
    handle: RelayHandle,
    notifier: watch::Sender<Detection>,
    checks: FuturesOrdered<CheckFuture>,
    failure: Option<DetectorError>,
    upstream_done: bool,
    terminated: bool,
}

impl<S, D> DetectingRelay<S, D>
where
    D: Detector + 'static,
{
    pub fn new(upstream: S, detector: D) -> Self {
        Self::with_shared_detector(upstream, Arc::new(detector))
    }

    pub fn with_shared_detector(upstream: S, detector: Arc<D>) -> Self {
        let id: Arc<str> = Uuid::new_v4().to_string().into();
        let minimum_bytes = detector.minimum_bytes();
        debug!(
            "[Relay] {} opened (threshold {} bytes)",
            id, minimum_bytes
        );
        let (notifier, _) = watch::channel(Detection::Pending);
        Self {
            upstream,
            detector,
            handle: RelayHandle {
                id,
                state: Arc::new(Mutex::new(SniffState::new(minimum_bytes))),
            },
            notifier,
            checks: FuturesOrdered::new(),
            failure: None,
            upstream_done: false,
            terminated: false,
        }
    }

    /// 构造时即注册一个观察者（在任何数据到达之前）
    pub fn with_observer<F>(upstream: S, detector: D, observer: F) -> Self
    where
        F: FnOnce(Option<FileType>) + Send + 'static,
    {
        let relay = Self::new(upstream, detector);
        relay.on_type(observer);
        relay
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    pub fn current_type(&self) -> Option<FileType> {
        self.handle.current_type()
    }

    pub fn detection(&self) -> Detection {
        self.handle.detection()
    }

    pub fn on_type<F>(&self, observer: F)
    where
        F: FnOnce(Option<FileType>) + Send + 'static,
    {
        self.handle.on_type(observer);
    }

    pub fn type_listener(&self) -> TypeListener {
        TypeListener {
            rx: self.notifier.subscribe(),
        }
    }

    fn consume(&mut self, chunk: &Bytes, cx: &mut Context<'_>) {
        let check = self.handle.lock().accumulate(chunk);
        let Some(Check { len, prefix }) = check else {
            return;
        };

        let detector = self.detector.clone();
        self.checks
            .push_back(Box::pin(async move { (len, detector.detect(prefix).await) }));

        // 同步完成的检测器在本数据块交付前即可完成通知
        if let Err(err) = self.drive_checks(cx) {
            self.failure = Some(err);
        }
    }

    fn drive_checks(&mut self, cx: &mut Context<'_>) -> Result<(), DetectorError> {
        while !self.checks.is_empty() {
            match self.checks.poll_next_unpin(cx) {
                Poll::Ready(Some((len, Ok(found)))) => self.settle(len, found),
                Poll::Ready(Some((len, Err(err)))) => {
                    warn!(
                        "[Relay] {} detector failed on {} byte prefix: {}",
                        self.handle.id, len, err
                    );
                    self.checks = FuturesOrdered::new();
                    return Err(err);
                }
                Poll::Ready(None) | Poll::Pending => break,
            }
        }
        Ok(())
    }

    fn settle(&mut self, len: usize, found: Option<FileType>) {
        let observers = self.handle.lock().settle(len, found);
        if let Some(observers) = observers {
            self.publish(observers);
        }
    }

    fn finish(&mut self) {
        let observers = self.handle.lock().finish();
        if let Some(observers) = observers {
            self.publish(observers);
        }
    }

    fn publish(&mut self, observers: Vec<TypeObserver>) {
        // 完成后剩余的检测全部作废
        self.checks = FuturesOrdered::new();

        let detection = self.handle.detection();
        match &detection {
            Detection::Known(file_type) => {
                debug!("[Relay] {} detected {}", self.handle.id, file_type)
            }
            _ => debug!("[Relay] {} type unknown", self.handle.id),
        }
        // 先更新 watch 通道，观察者 panic 时等待方仍能拿到结果
        self.notifier.send_replace(detection.clone());
        notify(observers, &detection);
    }
}

impl<R, D> DetectingRelay<ReaderStream<R>, D>
where
    R: AsyncRead,
    D: Detector + 'static,
{
    /// 直接包装任意异步读取源
    pub fn from_reader(reader: R, detector: D) -> Self {
        Self::new(ReaderStream::new(reader), detector)
    }
}

impl<S, D, E> Stream for DetectingRelay<S, D>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    D: Detector + 'static,
    E: From<DetectorError>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(err) = this.failure.take() {
            this.terminated = true;
            return Poll::Ready(Some(Err(err.into())));
        }
        if this.terminated {
            return Poll::Ready(None);
        }
        if let Err(err) = this.drive_checks(cx) {
            this.terminated = true;
            return Poll::Ready(Some(Err(err.into())));
        }

        if !this.upstream_done {
            match this.upstream.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.consume(&chunk, cx);
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => this.upstream_done = true,
                Poll::Pending => return Poll::Pending,
            }

            // 输入刚结束，再推进一次尚未完成的检测
            if let Err(err) = this.drive_checks(cx) {
                this.terminated = true;
                return Poll::Ready(Some(Err(err.into())));
            }
        }

        if !this.checks.is_empty() {
            return Poll::Pending;
        }

        this.finish();
        this.terminated = true;
        Poll::Ready(None)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.terminated {
            return (0, Some(0));
        }
        // 待上抛的检测错误是最后一项
        if self.failure.is_some() {
            return (1, Some(1));
        }
        // 检测失败会在上游数据之外多产生一个错误项
        let (lower, upper) = self.upstream.size_hint();
        (lower, upper.and_then(|n| n.checked_add(1)))
    }
}
