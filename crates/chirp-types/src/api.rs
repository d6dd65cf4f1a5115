use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Auth --

/// Credentials attached to every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub username: String,
    pub auth_token: String,
}

// -- Requests --

/// Every request the server understands. The wire `type` field selects
/// the variant; anything that fails to parse is answered with 400 and
/// causes no side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Signup {
        username: String,
        password: String,
    },
    Signin {
        username: String,
        password: String,
    },
    Post {
        auth: AuthPayload,
        text: String,
    },
    Follow {
        auth: AuthPayload,
        user_to_follow: String,
    },
    Unfollow {
        auth: AuthPayload,
        user_to_unfollow: String,
    },
    Like {
        auth: AuthPayload,
        post_id: String,
    },
    GetUserPosts {
        auth: AuthPayload,
        username: String,
    },
    GetUserFeed {
        auth: AuthPayload,
    },
    GetFollowedUsers {
        auth: AuthPayload,
        username: String,
    },
    GetFollowingUsers {
        auth: AuthPayload,
        username: String,
    },
    Admin {
        auth: AuthPayload,
    },
}

impl Request {
    /// Credentials carried by the request, if the variant requires them.
    /// Signup and signin are the only unauthenticated operations.
    pub fn auth(&self) -> Option<&AuthPayload> {
        match self {
            Request::Signup { .. } | Request::Signin { .. } => None,
            Request::Post { auth, .. }
            | Request::Follow { auth, .. }
            | Request::Unfollow { auth, .. }
            | Request::Like { auth, .. }
            | Request::GetUserPosts { auth, .. }
            | Request::GetUserFeed { auth }
            | Request::GetFollowedUsers { auth, .. }
            | Request::GetFollowingUsers { auth, .. }
            | Request::Admin { auth } => Some(auth),
        }
    }
}

// -- Result envelope --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub code: u16,
    pub data: Value,
}

impl Reply {
    pub fn ok(data: Value) -> Self {
        Self { code: 200, data }
    }

    /// Success with the empty payload used by all mutating operations.
    pub fn ok_empty() -> Self {
        Self::ok(Value::Object(Default::default()))
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            data: Value::String(message.into()),
        }
    }
}

// -- Client-facing views --

/// A post with its owner resolved to a username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub post_id: String,
    pub username: String,
    pub text: String,
    pub timestamp: i64,
    pub likes: i64,
}

/// User as it appears in the admin dump. The derived password key is
/// deliberately absent: credential material never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub user_id: String,
    pub username: String,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_parses_by_type_tag() {
        let value = json!({"type": "signup", "username": "alice", "password": "pw1"});
        let request: Request = serde_json::from_value(value).unwrap();
        assert!(matches!(request, Request::Signup { .. }));
        assert!(request.auth().is_none());
    }

    #[test]
    fn authenticated_request_carries_auth() {
        let value = json!({
            "type": "post",
            "auth": {"username": "alice", "auth_token": "tok"},
            "text": "hello"
        });
        let request: Request = serde_json::from_value(value).unwrap();
        let auth = request.auth().unwrap();
        assert_eq!(auth.username, "alice");
        assert_eq!(auth.auth_token, "tok");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let value = json!({"type": "teleport", "destination": "mars"});
        assert!(serde_json::from_value::<Request>(value).is_err());
    }

    #[test]
    fn missing_auth_is_rejected() {
        let value = json!({"type": "post", "text": "hello"});
        assert!(serde_json::from_value::<Request>(value).is_err());
    }

    #[test]
    fn envelope_round_trip() {
        let reply = Reply::error(403, "Bad auth token");
        let encoded = serde_json::to_string(&reply).unwrap();
        let decoded: Reply = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.code, 403);
        assert_eq!(decoded.data, json!("Bad auth token"));
    }
}
