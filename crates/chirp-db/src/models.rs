//! The three persisted entities. Constructors assign ids; the store
//! never generates them.

use rusqlite::Row;
use rusqlite::types::ToSql;
use serde::Serialize;
use uuid::Uuid;

use crate::record::Record;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub password_key: String,
    pub is_admin: bool,
}

impl User {
    pub fn new(username: &str, password_key: &str) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_key: password_key.to_string(),
            is_admin: false,
        }
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const PRIMARY_KEY: &'static str = "user_id";
    const SCHEMA: &'static [(&'static str, &'static str)] = &[
        ("user_id", "text"),
        ("username", "text"),
        ("password_key", "text"),
        ("is_admin", "boolean"),
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            username: row.get(1)?,
            password_key: row.get(2)?,
            is_admin: row.get(3)?,
        })
    }

    fn values(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.user_id.clone()),
            Box::new(self.username.clone()),
            Box::new(self.password_key.clone()),
            Box::new(self.is_admin),
        ]
    }

    fn primary_key_value(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    /// Creation time in seconds since epoch, set once.
    pub timestamp: i64,
    pub likes: i64,
}

impl Post {
    pub fn new(user_id: &str, text: &str, timestamp: i64) -> Self {
        Self {
            post_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            timestamp,
            likes: 0,
        }
    }
}

impl Record for Post {
    const TABLE: &'static str = "posts";
    const PRIMARY_KEY: &'static str = "post_id";
    const SCHEMA: &'static [(&'static str, &'static str)] = &[
        ("post_id", "text"),
        ("user_id", "text"),
        ("text", "text"),
        ("timestamp", "integer"),
        ("likes", "integer"),
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            post_id: row.get(0)?,
            user_id: row.get(1)?,
            text: row.get(2)?,
            timestamp: row.get(3)?,
            likes: row.get(4)?,
        })
    }

    fn values(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.post_id.clone()),
            Box::new(self.user_id.clone()),
            Box::new(self.text.clone()),
            Box::new(self.timestamp),
            Box::new(self.likes),
        ]
    }

    fn primary_key_value(&self) -> &str {
        &self.post_id
    }
}

/// Directed edge: `follower_id` follows `user_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Follow {
    pub follow_id: String,
    pub user_id: String,
    pub follower_id: String,
}

impl Follow {
    pub fn new(user_id: &str, follower_id: &str) -> Self {
        Self {
            follow_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            follower_id: follower_id.to_string(),
        }
    }
}

impl Record for Follow {
    const TABLE: &'static str = "follows";
    const PRIMARY_KEY: &'static str = "follow_id";
    const SCHEMA: &'static [(&'static str, &'static str)] = &[
        ("follow_id", "text"),
        ("user_id", "text"),
        ("follower_id", "text"),
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            follow_id: row.get(0)?,
            user_id: row.get(1)?,
            follower_id: row.get(2)?,
        })
    }

    fn values(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.follow_id.clone()),
            Box::new(self.user_id.clone()),
            Box::new(self.follower_id.clone()),
        ]
    }

    fn primary_key_value(&self) -> &str {
        &self.follow_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_assign_fresh_ids() {
        let a = User::new("alice", "key");
        let b = User::new("alice", "key");
        assert_ne!(a.user_id, b.user_id);
        assert!(!a.is_admin);
    }

    #[test]
    fn new_posts_start_unliked() {
        let post = Post::new("some-user", "hello", 1_700_000_000);
        assert_eq!(post.likes, 0);
        assert_eq!(post.timestamp, 1_700_000_000);
    }
}
