use crate::common::error::DetectorError;
use crate::relay::DetectingRelay;
use crate::web::{state::AppState, utils::errors};
use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 上传嗅探接口
///
/// 请求体经过类型嗅探中继流式消费（不整体缓存），返回检测到的类型与总字节数。
/// 未识别的类型以 `null` 返回，不视为错误。
pub async fn sniff_handler(State(state): State<Arc<AppState>>, body: Body) -> Response {
    let upstream = body
        .into_data_stream()
        .map(|item| item.map_err(std::io::Error::other));
    let mut relay = DetectingRelay::with_shared_detector(upstream, state.detector.clone());
    let relay_id = relay.handle().id().to_string();

    let mut total_bytes: u64 = 0;
    while let Some(item) = relay.next().await {
        match item {
            Ok(chunk) => total_bytes += chunk.len() as u64,
            Err(err) => {
                let detector_failed = err
                    .get_ref()
                    .is_some_and(|inner| inner.is::<DetectorError>());
                if detector_failed {
                    error!("[Sniff] {} detection failed: {}", relay_id, err);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(errors::sniff_internal_error_json(&err.to_string())),
                    )
                        .into_response();
                }
                warn!("[Sniff] {} body read failed: {}", relay_id, err);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(errors::sniff_bad_request_json(&err.to_string())),
                )
                    .into_response();
            }
        }
    }

    let file_type = relay.current_type();
    info!(
        "[Sniff] {} consumed {} bytes, type: {}",
        relay_id,
        total_bytes,
        file_type
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".into())
    );

    Json(serde_json::json!({
        "status": "success",
        "type": file_type,
        "bytes": total_bytes
    }))
    .into_response()
}
