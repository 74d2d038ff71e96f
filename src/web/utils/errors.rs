use serde_json::Value;

pub const CODE_SNIFF_BAD_REQUEST: &str = "VTX-SNF-400";
pub const CODE_SNIFF_INTERNAL: &str = "VTX-SNF-500";

pub fn sniff_bad_request_json(details: &str) -> Value {
    error_json(CODE_SNIFF_BAD_REQUEST, "Invalid request body", Some(details))
}

pub fn sniff_internal_error_json(details: &str) -> Value {
    error_json(CODE_SNIFF_INTERNAL, "Type detection failed", Some(details))
}

/// 构建统一错误响应体；release 构建下只暴露安全提示，不带内部细节
pub fn error_json(code: &str, safe_message: &str, details: Option<&str>) -> Value {
    let message = if cfg!(debug_assertions) {
        details.unwrap_or(safe_message)
    } else {
        safe_message
    };
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}
