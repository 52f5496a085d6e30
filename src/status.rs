//! The single user-facing status line.

use serde::Serialize;

/// User-facing message texts.
pub mod messages {
    pub const EMPTY_QUERY: &str = "請輸入地點名稱";
    pub const PLACE_NOT_FOUND: &str = "找不到這個地點";
    pub const REQUEST_FAILED: &str = "請求發生錯誤";
    pub const NEED_TWO_WAYPOINTS: &str = "請選擇至少兩個地點";
    pub const MAP_NOT_READY: &str = "地圖尚未載入";
    pub const ROUTE_NOT_FOUND: &str = "找不到路線";
    pub const ROUTE_REQUEST_FAILED: &str = "路線請求發生錯誤";
    pub const ROUTE_STALE: &str = "地點已變更，請重新規劃路線";
    pub const INVALID_LOCATION: &str = "地點座標無效";
    pub const INVALID_SELECTION: &str = "選取的項目不存在";
    pub const INTERNAL: &str = "發生內部錯誤";
}

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Error,
    Notice,
}

/// A message shown to the user until the next successful action replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Notice,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}
