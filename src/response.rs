use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

pub const CODE_OK: i32 = 200;
pub const CODE_ERROR: i32 = 500;

/// Uniform wrapper for every API payload: business code, human-readable
/// message, optional data, server time in epoch milliseconds.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
    pub timestamp: i64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::build(CODE_OK, "ok", Some(data))
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self::build(CODE_OK, message, Some(data))
    }

    /// Success envelope whose data may legitimately be absent, e.g. a point
    /// lookup that found nothing. The code stays 200 and `data` is null.
    pub fn success_optional(data: Option<T>) -> Self {
        Self::build(CODE_OK, "ok", data)
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::build(code, message, None)
    }

    fn build(code: i32, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// One page of records plus the cursor arithmetic the listing endpoints
/// expose alongside them.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageResult<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub current: u64,
    pub size: u64,
    pub pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> PageResult<T> {
    /// Callers must guarantee `size >= 1`; `pages` is a ceiling division
    /// by it.
    pub fn of(records: Vec<T>, total: u64, current: u64, size: u64) -> Self {
        let pages = total.div_ceil(size);
        Self {
            records,
            total,
            current,
            size,
            pages,
            has_previous: current > 1,
            has_next: current < pages,
        }
    }

    #[allow(dead_code)]
    pub fn empty() -> Self {
        Self::of(Vec::new(), 0, 1, 10)
    }
}
