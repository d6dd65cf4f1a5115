//! Request dispatch: the auth gate plus one handler per request type.
//!
//! Stateless across requests; the only per-call state is the
//! [`RequestContext`] produced by the gate and handed to the handler.
//! Every handler validates its fields before touching the store and
//! wraps its store access in a single exclusive scope.

use chirp_auth::AuthService;
use chirp_db::models::{Follow, Post, User};
use chirp_db::{Database, queries, record};
use chirp_types::api::{AuthPayload, Reply, Request};
use serde_json::{Value, json};

use crate::adapters;
use crate::error::ApiError;

/// Identity established by the auth gate, scoped to one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: String,
}

pub struct App {
    pub db: Database,
    pub auth: AuthService,
}

impl App {
    pub fn new(db: Database, auth: AuthService) -> Self {
        Self { db, auth }
    }

    /// Top-level entry point. Anything that fails to parse as a known
    /// request is a 400 with no side effects; anything unexpected below
    /// is logged and flattened to a 500. Errors never cross back into
    /// the transport.
    pub fn handle(&self, raw: Value) -> Reply {
        let Ok(request) = serde_json::from_value::<Request>(raw) else {
            return Reply::error(400, "Bad request");
        };

        match self.dispatch(request) {
            Ok(reply) => reply,
            Err(e) => e.into_reply(),
        }
    }

    fn dispatch(&self, request: Request) -> Result<Reply, ApiError> {
        match request {
            Request::Signup { username, password } => self.signup(&username, &password),
            Request::Signin { username, password } => self.signin(&username, &password),
            Request::Post { auth, text } => {
                let ctx = self.authorize(&auth)?;
                self.post(&ctx, &text)
            }
            Request::Follow {
                auth,
                user_to_follow,
            } => {
                let ctx = self.authorize(&auth)?;
                self.follow(&ctx, &user_to_follow)
            }
            Request::Unfollow {
                auth,
                user_to_unfollow,
            } => {
                let ctx = self.authorize(&auth)?;
                self.unfollow(&ctx, &user_to_unfollow)
            }
            Request::Like { auth, post_id } => {
                let ctx = self.authorize(&auth)?;
                self.like(&ctx, &post_id)
            }
            Request::GetUserPosts { auth, username } => {
                self.authorize(&auth)?;
                self.get_user_posts(&username)
            }
            Request::GetUserFeed { auth } => {
                let ctx = self.authorize(&auth)?;
                self.get_user_feed(&ctx)
            }
            Request::GetFollowedUsers { auth, username } => {
                self.authorize(&auth)?;
                self.get_followed_users(&username)
            }
            Request::GetFollowingUsers { auth, username } => {
                self.authorize(&auth)?;
                self.get_following_users(&username)
            }
            Request::Admin { auth } => {
                let ctx = self.authorize(&auth)?;
                self.admin(&ctx)
            }
        }
    }

    /// The gate: credentials present, username resolves, token verifies
    /// for that user. Stage order decides the code: 400, then 404,
    /// then 403.
    fn authorize(&self, auth: &AuthPayload) -> Result<RequestContext, ApiError> {
        if auth.username.is_empty() || auth.auth_token.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        let user = self
            .db
            .exclusive(|tx| queries::user_by_name(tx, &auth.username))
            .map_err(|e| ApiError::or_not_found(e, "User not found"))?;

        if !self.auth.verify_token(&user.user_id, &auth.auth_token) {
            return Err(ApiError::forbidden("Bad auth token"));
        }

        Ok(RequestContext {
            user_id: user.user_id,
        })
    }

    fn signup(&self, username: &str, password: &str) -> Result<Reply, ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        let password_key = self
            .auth
            .derive_password_key(password)
            .map_err(ApiError::Internal)?;

        // The free-name check and the insert share one exclusive scope,
        // which is what makes the username unique without a constraint.
        self.db.exclusive(|tx| {
            match queries::user_by_name(tx, username) {
                Ok(_) => return Err(ApiError::validation("User already exists")),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            record::create(tx, &User::new(username, &password_key))?;
            Ok(())
        })?;

        Ok(Reply::ok_empty())
    }

    fn signin(&self, username: &str, password: &str) -> Result<Reply, ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        let user = self
            .db
            .exclusive(|tx| queries::user_by_name(tx, username))
            .map_err(|e| ApiError::or_not_found(e, "User not found"))?;

        if !self.auth.verify_password(password, &user.password_key) {
            return Err(ApiError::validation("Bad password"));
        }

        let token = self
            .auth
            .issue_token(&user.user_id)
            .map_err(ApiError::Internal)?;

        Ok(Reply::ok(json!({ "auth_token": token })))
    }

    fn post(&self, ctx: &RequestContext, text: &str) -> Result<Reply, ApiError> {
        if text.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        let post = Post::new(&ctx.user_id, text, chrono::Utc::now().timestamp());
        self.db.exclusive(|tx| record::create(tx, &post))?;

        Ok(Reply::ok_empty())
    }

    fn follow(&self, ctx: &RequestContext, user_to_follow: &str) -> Result<Reply, ApiError> {
        if user_to_follow.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        self.db.exclusive(|tx| {
            let target = queries::user_by_name(tx, user_to_follow)
                .map_err(|e| ApiError::or_not_found(e, "User not found"))?;
            record::create(tx, &Follow::new(&target.user_id, &ctx.user_id))?;
            Ok::<_, ApiError>(())
        })?;

        Ok(Reply::ok_empty())
    }

    fn unfollow(&self, ctx: &RequestContext, user_to_unfollow: &str) -> Result<Reply, ApiError> {
        if user_to_unfollow.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        self.db.exclusive(|tx| {
            let target = queries::user_by_name(tx, user_to_unfollow)
                .map_err(|e| ApiError::or_not_found(e, "User not found"))?;
            let edge = queries::follow_edge(tx, &target.user_id, &ctx.user_id)
                .map_err(|e| ApiError::or_not_found(e, "User already not followed"))?;
            record::delete(tx, &edge)?;
            Ok::<_, ApiError>(())
        })?;

        Ok(Reply::ok_empty())
    }

    fn like(&self, _ctx: &RequestContext, post_id: &str) -> Result<Reply, ApiError> {
        if post_id.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        self.db.exclusive(|tx| {
            let mut post = record::read_by_pk::<Post>(tx, post_id)
                .map_err(|e| ApiError::or_not_found(e, "Post not found"))?;
            post.likes += 1;
            record::update(tx, &post)?;
            Ok::<_, ApiError>(())
        })?;

        Ok(Reply::ok_empty())
    }

    fn get_user_posts(&self, username: &str) -> Result<Reply, ApiError> {
        if username.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        let posts = self.db.exclusive(|tx| {
            let user = queries::user_by_name(tx, username)
                .map_err(|e| ApiError::or_not_found(e, "User not found"))?;
            Ok::<_, ApiError>(queries::user_posts(tx, &user.user_id)?)
        })?;

        let views = adapters::posts_response(&self.db, posts)?;
        Ok(Reply::ok(serde_json::to_value(views).map_err(anyhow::Error::from)?))
    }

    fn get_user_feed(&self, ctx: &RequestContext) -> Result<Reply, ApiError> {
        let posts = self
            .db
            .exclusive(|tx| queries::user_feed(tx, &ctx.user_id))?;

        let views = adapters::posts_response(&self.db, posts)?;
        Ok(Reply::ok(serde_json::to_value(views).map_err(anyhow::Error::from)?))
    }

    fn get_followed_users(&self, username: &str) -> Result<Reply, ApiError> {
        if username.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        let edges = self.db.exclusive(|tx| {
            let user = queries::user_by_name(tx, username)
                .map_err(|e| ApiError::or_not_found(e, "User not found"))?;
            Ok::<_, ApiError>(queries::followed_edges(tx, &user.user_id)?)
        })?;

        let names = adapters::followed_usernames(&self.db, edges)?;
        Ok(Reply::ok(json!(names)))
    }

    fn get_following_users(&self, username: &str) -> Result<Reply, ApiError> {
        if username.is_empty() {
            return Err(ApiError::validation("Bad request"));
        }

        let edges = self.db.exclusive(|tx| {
            let user = queries::user_by_name(tx, username)
                .map_err(|e| ApiError::or_not_found(e, "User not found"))?;
            Ok::<_, ApiError>(queries::following_edges(tx, &user.user_id)?)
        })?;

        let names = adapters::follower_usernames(&self.db, edges)?;
        Ok(Reply::ok(json!(names)))
    }

    fn admin(&self, ctx: &RequestContext) -> Result<Reply, ApiError> {
        let (users, posts, follows) = self.db.exclusive(|tx| {
            let caller = record::read_by_pk::<User>(tx, &ctx.user_id)?;
            if !caller.is_admin {
                return Err(ApiError::forbidden("Forbidden"));
            }
            Ok((
                record::list_all::<User>(tx)?,
                record::list_all::<Post>(tx)?,
                record::list_all::<Follow>(tx)?,
            ))
        })?;

        let users: Vec<_> = users.into_iter().map(adapters::user_view).collect();

        // "folows" is the key deployed clients already parse; renaming it
        // is a wire-format change, not a typo fix.
        Ok(Reply::ok(json!({
            "users": users,
            "posts": posts,
            "folows": follows,
        })))
    }
}
