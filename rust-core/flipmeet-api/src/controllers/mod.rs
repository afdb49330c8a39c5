//! Controllers for the FlipMeet routes.
//!
//! Each controller owns the models it needs, built from the injected
//! [`Database`](flipmeet_core::Database) at bootstrap.

mod catalogue;
mod comments;
mod log;
mod posts;
mod users;

pub use catalogue::CatalogueController;
pub use comments::CommentsController;
pub use log::LogController;
pub use posts::PostsController;
pub use users::UsersController;

use crate::models::{Comment, Post, User};
use chrono::Utc;
use flipmeet_core::{Context, Entity, Error, Model, Params, Result, Value};
use std::collections::HashMap;

/// Integer id from a parameter; anything non-numeric cannot name a record
pub(crate) fn record_id(params: &Params, field: &str, table: &'static str) -> Result<i64> {
    let value = params.get(field).cloned().unwrap_or_default();
    value.as_i64().ok_or_else(|| Error::RecordNotFound {
        table,
        key: value.to_string(),
    })
}

/// Trimmed text of a parameter, empty when missing
pub(crate) fn text(params: &Params, field: &str) -> String {
    params
        .get(field)
        .map(|v| v.as_text().trim().to_string())
        .unwrap_or_default()
}

/// Timestamp in the format the tables store
pub(crate) fn now() -> Value {
    Value::Text(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())
}

/// JSON array of entities
pub(crate) fn list<E: Entity>(items: &[E]) -> serde_json::Value {
    serde_json::Value::Array(items.iter().map(E::to_json).collect())
}

/// The member a guard admitted
///
/// # Errors
///
/// Returns `Error::Authorization` when no guard supplied an email or the
/// email no longer belongs to a member.
pub(crate) async fn current_user(users: &Model<User>, context: Option<&Context>) -> Result<User> {
    let email = context
        .and_then(|c| c.get("email"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::unauthorized("You must log in to perform this action."))?;

    users
        .get_by_attribute("email", email)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::unauthorized("You must log in to perform this action."))
}

/// Label comments of `post` with their authors, loading each author once
///
/// # Errors
///
/// Returns `Error::RecordNotFound` if an author row is gone, or
/// `Error::DataAccess` when a lookup fails.
pub(crate) async fn describe_comments(
    users: &Model<User>,
    post: &Post,
    comments: &mut [Comment],
) -> Result<()> {
    let mut authors: HashMap<i64, User> = HashMap::new();
    for comment in comments.iter_mut() {
        let fkuser = comment.fkuser();
        if !authors.contains_key(&fkuser) {
            let author = users.get_by_primary_key(fkuser).await?;
            authors.insert(fkuser, author);
        }
        if let Some(author) = authors.get(&fkuser) {
            comment.describe(author, post);
        }
    }
    Ok(())
}
