use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_PAGE_SIZE: i64 = 50;
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Query parameters for cursor-paginated endpoints. The cursor is opaque
/// to clients; absent on the first call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorParams {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

impl CursorParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

/// Keyset cursor over a (timestamp desc, id desc) index scan. Rows
/// strictly before this position have already been returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub ts: DateTime<Utc>,
    pub id: Uuid,
}

impl Cursor {
    pub fn encode(&self) -> String {
        // serializing a two-field struct cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| format!("malformed cursor: {e}"))?;
        serde_json::from_slice(&bytes).map_err(|e| format!("malformed cursor: {e}"))
    }
}

#[derive(Debug, Serialize)]
pub struct CursorPage<T: Serialize> {
    pub page: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_cursor: Option<String>,
    pub is_done: bool,
}

impl<T: Serialize> CursorPage<T> {
    pub fn new(page: Vec<T>, continue_cursor: Option<Cursor>, is_done: bool) -> Self {
        Self {
            page,
            continue_cursor: continue_cursor.map(|c| c.encode()),
            is_done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor {
            ts: Utc::now(),
            id: Uuid::now_v7(),
        };
        let token = cursor.encode();
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(Cursor::decode("not a cursor").is_err());
        assert!(Cursor::decode("").is_err());

        let valid_base64 = URL_SAFE_NO_PAD.encode(b"{\"nope\":1}");
        assert!(Cursor::decode(&valid_base64).is_err());
    }

    #[test]
    fn limit_is_clamped() {
        let params = CursorParams { cursor: None, limit: Some(500) };
        assert_eq!(params.limit(), 50);

        let params = CursorParams { cursor: None, limit: Some(0) };
        assert_eq!(params.limit(), 1);

        let params = CursorParams::default();
        assert_eq!(params.limit(), 10);
    }
}
