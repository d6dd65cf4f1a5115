//! Translate raw records into client-facing shapes: posts and follow
//! edges reference users by opaque id, clients want usernames. Each
//! resolution is its own short read scope; listings run after the
//! handler's transaction has closed.

use chirp_db::models::{Follow, Post, User};
use chirp_db::{Database, StoreError, record};
use chirp_types::api::{PostView, UserView};

use crate::error::ApiError;

/// Resolve a user id to its username. `None` when the user is gone;
/// callers drop such entries instead of failing the whole listing.
fn resolve_username(db: &Database, user_id: &str) -> Result<Option<String>, ApiError> {
    match db.exclusive(|tx| record::read_by_pk::<User>(tx, user_id)) {
        Ok(user) => Ok(Some(user.username)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Posts with owners resolved to usernames; posts whose owner no longer
/// resolves are dropped.
pub fn posts_response(db: &Database, posts: Vec<Post>) -> Result<Vec<PostView>, ApiError> {
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        let Some(username) = resolve_username(db, &post.user_id)? else {
            continue;
        };
        views.push(PostView {
            post_id: post.post_id,
            username,
            text: post.text,
            timestamp: post.timestamp,
            likes: post.likes,
        });
    }
    Ok(views)
}

/// Usernames of the followed party per edge (for the "whom does X
/// follow" listing).
pub fn followed_usernames(db: &Database, edges: Vec<Follow>) -> Result<Vec<String>, ApiError> {
    edge_usernames(db, edges, |edge| edge.user_id)
}

/// Usernames of the follower per edge (for the "who follows X" listing).
pub fn follower_usernames(db: &Database, edges: Vec<Follow>) -> Result<Vec<String>, ApiError> {
    edge_usernames(db, edges, |edge| edge.follower_id)
}

fn edge_usernames(
    db: &Database,
    edges: Vec<Follow>,
    side: impl Fn(Follow) -> String,
) -> Result<Vec<String>, ApiError> {
    let mut names = Vec::with_capacity(edges.len());
    for edge in edges {
        if let Some(username) = resolve_username(db, &side(edge))? {
            names.push(username);
        }
    }
    Ok(names)
}

/// Admin-dump user shape: everything but the password key.
pub fn user_view(user: User) -> UserView {
    UserView {
        user_id: user.user_id,
        username: user.username,
        is_admin: user.is_admin,
    }
}
