//! The follow graph: one directed edge per ordered pair of users.
//!
//! Each direction has its own named query so callers never have to remember
//! which column is which.

use std::collections::HashSet;

use anyhow::Result;
use uuid::Uuid;

use crate::Database;
use crate::models::UserRow;
use crate::queries::{USER_COLUMNS, query_users};

/// `user_following_id` follows `user_being_followed_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Follow {
    pub user_being_followed_id: Uuid,
    pub user_following_id: Uuid,
}

impl Follow {
    pub fn new(follower: Uuid, followed: Uuid) -> Self {
        Self {
            user_being_followed_id: followed,
            user_following_id: follower,
        }
    }

    pub fn is_self_follow(&self) -> bool {
        self.user_being_followed_id == self.user_following_id
    }
}

impl Database {
    /// Adds the edge. Returns false if it already existed.
    pub fn follow(&self, edge: Follow) -> Result<bool> {
        if edge.is_self_follow() {
            anyhow::bail!("user {} cannot follow themself", edge.user_following_id);
        }
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id)
                 VALUES (?1, ?2)",
                [edge.user_being_followed_id, edge.user_following_id],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Removes the edge. Returns false if there was none.
    pub fn unfollow(&self, edge: Follow) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                [edge.user_being_followed_id, edge.user_following_id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn has_edge(&self, edge: Follow) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS (
                    SELECT 1 FROM follows
                    WHERE user_being_followed_id = ?1 AND user_following_id = ?2
                 )",
                [edge.user_being_followed_id, edge.user_following_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Does `user` follow `other`?
    pub fn is_following(&self, user: Uuid, other: Uuid) -> Result<bool> {
        self.has_edge(Follow::new(user, other))
    }

    /// Is `user` followed by `other`?
    pub fn is_followed_by(&self, user: Uuid, other: Uuid) -> Result<bool> {
        self.has_edge(Follow::new(other, user))
    }

    /// Users that `user` follows, by username.
    pub fn following(&self, user: Uuid) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users u
                 JOIN follows f ON f.user_being_followed_id = u.id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.username"
            );
            query_users(conn, &sql, [user])
        })
    }

    /// Users following `user`, by username.
    pub fn followers(&self, user: Uuid) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users u
                 JOIN follows f ON f.user_following_id = u.id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.username"
            );
            query_users(conn, &sql, [user])
        })
    }

    /// Ids of everyone `user` follows; pages use it to pick follow/unfollow buttons.
    pub fn following_ids(&self, user: Uuid) -> Result<HashSet<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1")?;
            let ids = stmt
                .query_map([user], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<Uuid>, _>>()?;
            Ok(ids)
        })
    }
}
