use super::{current_user, now, record_id, text};
use crate::models::{Comment, Post, User};
use flipmeet_core::{
    BoxFuture, Context, Controller, Database, Entity, Model, Params, Reply, Result, RuleSet,
    Validator, Value,
};
use tracing::info;

const COMMENT_RULES: &RuleSet<'static> = &[
    ("text", &["required", "max:255"]),
    ("fkpost", &["required", "numeric"]),
];

/// Comments under posts
pub struct CommentsController {
    comments: Model<Comment>,
    posts: Model<Post>,
    users: Model<User>,
}

impl CommentsController {
    /// Create the controller
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            comments: Model::new(db.clone()),
            posts: Model::new(db.clone()),
            users: Model::new(db.clone()),
        }
    }

    async fn add(&self, params: Params, context: Option<Context>) -> Result<Reply> {
        Validator::new(&params, COMMENT_RULES)?.into_result()?;
        let post_id = record_id(&params, "fkpost", Post::META.table)?;
        let post = self.posts.get_by_primary_key(post_id).await?;
        let author = current_user(&self.users, context.as_ref()).await?;

        let mut data = Params::new();
        data.insert("text".to_string(), Value::Text(text(&params, "text")));
        data.insert("fkpost".to_string(), Value::Int(post.id()));
        data.insert("fkuser".to_string(), Value::Int(author.id()));
        data.insert("creationDate".to_string(), now());

        let mut comment = self.comments.create(&data).await?;
        comment.describe(&author, &post);
        info!(
            comment_id = comment.id(),
            post_id = comment.fkpost(),
            user_id = author.id(),
            "Comment created"
        );
        Ok(Reply::created("Comment created successfully.", comment.to_json()))
    }
}

impl Controller for CommentsController {
    fn name(&self) -> &'static str {
        "CommentsController"
    }

    fn actions(&self) -> &'static [&'static str] {
        &["add"]
    }

    fn call<'a>(
        &'a self,
        action: &'a str,
        params: Params,
        context: Option<Context>,
    ) -> Option<BoxFuture<'a, Result<Reply>>> {
        match action {
            "add" => Some(Box::pin(self.add(params, context))),
            _ => None,
        }
    }
}
