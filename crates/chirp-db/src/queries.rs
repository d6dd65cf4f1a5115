//! Read queries layered on the record store: feeds, per-user post
//! listings and the social graph.

use rusqlite::Transaction;

use crate::error::StoreError;
use crate::models::{Follow, Post, User};
use crate::record;
use crate::record::Record;

/// Username lookup; the dispatcher's auth gate and every by-username
/// operation go through this.
pub fn user_by_name(tx: &Transaction<'_>, username: &str) -> Result<User, StoreError> {
    record::read_by_column(tx, "username", username)
}

/// Posts authored by `user_id`, newest first.
pub fn user_posts(tx: &Transaction<'_>, user_id: &str) -> Result<Vec<Post>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT post_id, user_id, text, timestamp, likes
         FROM posts
         WHERE user_id = ?1
         ORDER BY timestamp DESC",
    )?;
    let posts = stmt
        .query_map([user_id], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// The feed: posts authored by everyone `follower_id` follows,
/// newest first.
pub fn user_feed(tx: &Transaction<'_>, follower_id: &str) -> Result<Vec<Post>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT p.post_id, p.user_id, p.text, p.timestamp, p.likes
         FROM posts AS p
         INNER JOIN follows AS f ON p.user_id = f.user_id
         WHERE f.follower_id = ?1
         ORDER BY p.timestamp DESC",
    )?;
    let posts = stmt
        .query_map([follower_id], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Edges where `user_id` is the follower: whom this user follows.
pub fn followed_edges(tx: &Transaction<'_>, user_id: &str) -> Result<Vec<Follow>, StoreError> {
    edges_by_column(tx, "follower_id", user_id)
}

/// Edges where `user_id` is the followed party: who follows this user.
pub fn following_edges(tx: &Transaction<'_>, user_id: &str) -> Result<Vec<Follow>, StoreError> {
    edges_by_column(tx, "user_id", user_id)
}

/// Exact edge lookup, used by unfollow.
pub fn follow_edge(
    tx: &Transaction<'_>,
    user_id: &str,
    follower_id: &str,
) -> Result<Follow, StoreError> {
    tx.query_row(
        "SELECT follow_id, user_id, follower_id
         FROM follows
         WHERE user_id = ?1 AND follower_id = ?2",
        [user_id, follower_id],
        Follow::from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => other.into(),
    })
}

fn edges_by_column(
    tx: &Transaction<'_>,
    column: &str,
    value: &str,
) -> Result<Vec<Follow>, StoreError> {
    let sql = format!(
        "SELECT follow_id, user_id, follower_id FROM follows WHERE {column} = ?1"
    );
    let mut stmt = tx.prepare(&sql)?;
    let edges = stmt
        .query_map([value], Follow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::schema;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.exclusive(|tx| schema::init(tx, false)).unwrap();
        db
    }

    fn add_user(db: &Database, name: &str) -> User {
        let user = User::new(name, "key");
        db.exclusive(|tx| record::create(tx, &user)).unwrap();
        user
    }

    fn add_post(db: &Database, user: &User, text: &str, timestamp: i64) -> Post {
        let post = Post::new(&user.user_id, text, timestamp);
        db.exclusive(|tx| record::create(tx, &post)).unwrap();
        post
    }

    fn follow(db: &Database, followed: &User, follower: &User) {
        let edge = Follow::new(&followed.user_id, &follower.user_id);
        db.exclusive(|tx| record::create(tx, &edge)).unwrap();
    }

    #[test]
    fn user_posts_come_back_newest_first() {
        let db = db();
        let alice = add_user(&db, "alice");
        add_post(&db, &alice, "first", 100);
        add_post(&db, &alice, "third", 300);
        add_post(&db, &alice, "second", 200);

        let posts = db.exclusive(|tx| user_posts(tx, &alice.user_id)).unwrap();
        let texts: Vec<&str> = posts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, ["third", "second", "first"]);
    }

    #[test]
    fn feed_is_the_union_of_followed_authors() {
        let db = db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let carol = add_user(&db, "carol");
        let dave = add_user(&db, "dave");

        follow(&db, &bob, &alice);
        follow(&db, &carol, &alice);

        add_post(&db, &bob, "from bob", 100);
        add_post(&db, &carol, "from carol", 300);
        add_post(&db, &dave, "from dave", 200);
        add_post(&db, &alice, "from alice herself", 400);

        let feed = db.exclusive(|tx| user_feed(tx, &alice.user_id)).unwrap();
        let texts: Vec<&str> = feed.iter().map(|p| p.text.as_str()).collect();

        // Only bob's and carol's posts, newest first. Alice's own posts
        // and dave's are absent.
        assert_eq!(texts, ["from carol", "from bob"]);
    }

    #[test]
    fn feed_of_a_lonely_user_is_empty() {
        let db = db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        add_post(&db, &bob, "unseen", 100);

        let feed = db.exclusive(|tx| user_feed(tx, &alice.user_id)).unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn edge_listings_are_directional() {
        let db = db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let carol = add_user(&db, "carol");

        // alice follows bob; carol follows alice.
        follow(&db, &bob, &alice);
        follow(&db, &alice, &carol);

        let followed = db
            .exclusive(|tx| followed_edges(tx, &alice.user_id))
            .unwrap();
        assert_eq!(followed.len(), 1);
        assert_eq!(followed[0].user_id, bob.user_id);

        let following = db
            .exclusive(|tx| following_edges(tx, &alice.user_id))
            .unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].follower_id, carol.user_id);
    }

    #[test]
    fn exact_edge_lookup() {
        let db = db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        follow(&db, &bob, &alice);

        let edge = db
            .exclusive(|tx| follow_edge(tx, &bob.user_id, &alice.user_id))
            .unwrap();
        assert_eq!(edge.user_id, bob.user_id);

        // The reverse direction does not exist.
        let missing = db.exclusive(|tx| follow_edge(tx, &alice.user_id, &bob.user_id));
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }
}
