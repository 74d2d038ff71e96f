use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use vtx_mime_stream::{DetectingRelay, Detection, FileType, InferDetector};

/// 1x1 RGBA PNG
const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

type Seen = Arc<Mutex<Vec<Option<FileType>>>>;

fn chunked(parts: Vec<Vec<u8>>) -> impl Stream<Item = std::io::Result<Bytes>> + Unpin {
    stream::iter(
        parts
            .into_iter()
            .map(|part| Ok::<_, std::io::Error>(Bytes::from(part))),
    )
}

fn split(data: &[u8], size: usize) -> Vec<Vec<u8>> {
    data.chunks(size).map(|c| c.to_vec()).collect()
}

fn recorder() -> (Seen, impl FnOnce(Option<FileType>) + Send + 'static) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |file_type| sink.lock().unwrap().push(file_type))
}

async fn drain<S>(mut relay: S) -> Vec<u8>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let mut out = Vec::new();
    while let Some(chunk) = relay.next().await {
        out.extend_from_slice(&chunk.expect("chunk"));
    }
    out
}

fn png() -> FileType {
    FileType::new("png", "image/png")
}

#[tokio::test]
async fn passes_through_all_chunks_unmodified() {
    let (seen, observer) = recorder();
    let upstream = chunked(vec![b"hello ".to_vec(), b"world".to_vec(), b"!".to_vec()]);
    let mut relay = DetectingRelay::with_observer(upstream, InferDetector::new(), observer);

    let mut out = Vec::new();
    for _ in 0..3 {
        let chunk = relay.next().await.expect("chunk").expect("ok");
        out.extend_from_slice(&chunk);
    }
    // 数据不足阈值且无匹配，结束前不应通知
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(relay.detection(), Detection::Pending);

    assert!(relay.next().await.is_none());
    assert_eq!(out, b"hello world!");
    assert_eq!(*seen.lock().unwrap(), vec![None]);
    assert_eq!(relay.detection(), Detection::Unknown);
}

#[tokio::test]
async fn emits_unknown_when_closed_too_early() {
    let (seen, observer) = recorder();
    let relay = DetectingRelay::with_observer(
        chunked(vec![Vec::new()]),
        InferDetector::new(),
        observer,
    );
    assert!(drain(relay).await.is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![None]);

    let (seen, observer) = recorder();
    let relay = DetectingRelay::with_observer(chunked(Vec::new()), InferDetector::new(), observer);
    assert!(drain(relay).await.is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn emits_unknown_once_threshold_reached() {
    let (seen, observer) = recorder();
    let mut relay = DetectingRelay::with_observer(
        chunked(vec![vec![0u8; 10 * 1024]]),
        InferDetector::new(),
        observer,
    );

    let chunk = relay.next().await.expect("chunk").expect("ok");
    assert_eq!(chunk.len(), 10 * 1024);
    // 阈值在消费该数据块时即已达到，无需等到输入结束
    assert_eq!(*seen.lock().unwrap(), vec![None]);

    assert!(relay.next().await.is_none());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn threshold_reached_across_chunks() {
    let (seen, observer) = recorder();
    let data = vec![0u8; 8 * 1024];
    let mut relay = DetectingRelay::with_observer(
        chunked(split(&data, 1024)),
        InferDetector::new(),
        observer,
    );
    let handle = relay.handle();

    for index in 1..=4 {
        relay.next().await.expect("chunk").expect("ok");
        assert!(seen.lock().unwrap().is_empty(), "fired early at chunk {}", index);
        assert_eq!(handle.buffered_bytes(), index * 1024);
    }
    // 5 * 1024 >= 4100
    relay.next().await.expect("chunk").expect("ok");
    assert_eq!(*seen.lock().unwrap(), vec![None]);
    assert_eq!(handle.buffered_bytes(), 0);

    let rest = drain(relay).await;
    assert_eq!(rest.len(), 3 * 1024);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn detects_binary_types() {
    let (seen, observer) = recorder();
    let relay = DetectingRelay::with_observer(
        chunked(vec![PNG_1X1.to_vec()]),
        InferDetector::new(),
        observer,
    );
    let handle = relay.handle();

    assert_eq!(drain(relay).await, PNG_1X1);
    assert_eq!(*seen.lock().unwrap(), vec![Some(png())]);
    assert_eq!(handle.current_type(), Some(png()));
    assert_eq!(handle.buffered_bytes(), 0);
}

#[tokio::test]
async fn emits_type_only_once_for_single_byte_reads() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let path = temp_dir.path().join("png.png");
    let mut file = tokio::fs::File::create(&path).await.expect("create");
    file.write_all(PNG_1X1).await.expect("write");
    file.flush().await.expect("flush");
    drop(file);

    let file = tokio::fs::File::open(&path).await.expect("open");
    let (seen, observer) = recorder();
    let relay = DetectingRelay::with_observer(
        ReaderStream::with_capacity(file, 1),
        InferDetector::new(),
        observer,
    );

    assert_eq!(drain(relay).await, PNG_1X1);
    assert_eq!(*seen.lock().unwrap(), vec![Some(png())]);
}

#[tokio::test]
async fn detection_does_not_depend_on_chunk_size() {
    for size in [1, 2, 3, 7, 16, 64, PNG_1X1.len()] {
        let (seen, observer) = recorder();
        let relay = DetectingRelay::with_observer(
            chunked(split(PNG_1X1, size)),
            InferDetector::new(),
            observer,
        );
        assert_eq!(drain(relay).await, PNG_1X1, "chunk size {}", size);
        assert_eq!(*seen.lock().unwrap(), vec![Some(png())], "chunk size {}", size);
    }
}

#[tokio::test]
async fn sets_type_before_notifying() {
    let relay = DetectingRelay::new(chunked(vec![PNG_1X1.to_vec()]), InferDetector::new());
    let handle = relay.handle();
    let observed = Arc::new(Mutex::new(None));

    let sink = observed.clone();
    let query = handle.clone();
    relay.on_type(move |_| {
        *sink.lock().unwrap() = Some(query.current_type());
    });

    drain(relay).await;
    assert_eq!(*observed.lock().unwrap(), Some(Some(png())));
}

#[tokio::test]
async fn provides_copies_to_observers_and_queries() {
    let relay = DetectingRelay::new(chunked(vec![PNG_1X1.to_vec()]), InferDetector::new());
    let handle = relay.handle();
    let after_mutation = Arc::new(Mutex::new(None));

    let sink = after_mutation.clone();
    let query = handle.clone();
    relay.on_type(move |file_type| {
        let mut file_type = file_type.expect("type");
        file_type.ext = "jpg".into();
        file_type.mime = "image/jpeg".into();
        *sink.lock().unwrap() = query.current_type();
    });

    drain(relay).await;
    assert_eq!(*after_mutation.lock().unwrap(), Some(png()));

    let mut copy = handle.current_type().expect("type");
    copy.ext = "gif".into();
    assert_eq!(handle.current_type(), Some(png()));
}

#[tokio::test]
async fn all_observers_receive_the_same_notification() {
    let (first, observer_a) = recorder();
    let (second, observer_b) = recorder();
    let relay = DetectingRelay::with_observer(
        chunked(split(PNG_1X1, 5)),
        InferDetector::new(),
        observer_a,
    );
    relay.on_type(observer_b);
    let handle = relay.handle();

    drain(relay).await;
    assert_eq!(*first.lock().unwrap(), vec![Some(png())]);
    assert_eq!(*second.lock().unwrap(), vec![Some(png())]);

    // 完成后注册的观察者立即收到既定结果
    let (late, observer_c) = recorder();
    handle.on_type(observer_c);
    assert_eq!(*late.lock().unwrap(), vec![Some(png())]);
}

#[tokio::test]
async fn listener_resolves_with_detection() {
    let relay = DetectingRelay::new(chunked(split(PNG_1X1, 2)), InferDetector::new());
    let listener = relay.type_listener();

    let consumer = tokio::spawn(drain(relay));
    assert_eq!(listener.wait().await, Detection::Known(png()));
    assert_eq!(consumer.await.expect("join"), PNG_1X1);
}

#[tokio::test]
async fn wraps_async_readers() {
    let (seen, observer) = recorder();
    let relay = DetectingRelay::from_reader(
        std::io::Cursor::new(b"GIF89a\x01\x00\x01\x00".to_vec()),
        InferDetector::new(),
    );
    relay.on_type(observer);

    assert_eq!(drain(relay).await, b"GIF89a\x01\x00\x01\x00");
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some(FileType::new("gif", "image/gif"))]
    );
}
