use super::{current_user, describe_comments, list, now, record_id, text};
use crate::models::{Comment, Post, User};
use flipmeet_core::{
    BoxFuture, Context, Controller, Database, Entity, Model, Params, Reply, Result, Validator,
    Value,
};
use tracing::info;

/// Wall posts and their comments
pub struct PostsController {
    posts: Model<Post>,
    comments: Model<Comment>,
    users: Model<User>,
}

impl PostsController {
    /// Create the controller
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            posts: Model::new(db.clone()),
            comments: Model::new(db.clone()),
            users: Model::new(db.clone()),
        }
    }

    async fn get_all(&self) -> Result<Reply> {
        let posts = self.posts.get_all().await?;
        Ok(Reply::data(list(&posts)))
    }

    async fn get(&self, params: Params) -> Result<Reply> {
        let id = record_id(&params, "id", Post::META.table)?;
        let post = self.posts.get_by_primary_key(id).await?;
        Ok(Reply::data(post.to_json()))
    }

    async fn get_comments(&self, params: Params) -> Result<Reply> {
        let id = record_id(&params, "id", Post::META.table)?;
        let mut comments = self.comments.get_by_attribute("fkpost", id).await?;
        if !comments.is_empty() {
            let post = self.posts.get_by_primary_key(id).await?;
            describe_comments(&self.users, &post, &mut comments).await?;
        }
        Ok(Reply::data(list(&comments)))
    }

    async fn add(&self, params: Params, context: Option<Context>) -> Result<Reply> {
        Validator::new(&params, Post::META.rules)?.into_result()?;
        let author = current_user(&self.users, context.as_ref()).await?;

        let mut data = Params::new();
        data.insert("text".to_string(), Value::Text(text(&params, "text")));
        data.insert("fkuser".to_string(), Value::Int(author.id()));
        data.insert("creationDate".to_string(), now());

        let post = self.posts.create(&data).await?;
        info!(post_id = post.id(), user_id = author.id(), "Post created");
        Ok(Reply::created("Post created successfully.", post.to_json()))
    }
}

impl Controller for PostsController {
    fn name(&self) -> &'static str {
        "PostsController"
    }

    fn actions(&self) -> &'static [&'static str] {
        &["getAll", "get", "getComments", "add"]
    }

    fn call<'a>(
        &'a self,
        action: &'a str,
        params: Params,
        context: Option<Context>,
    ) -> Option<BoxFuture<'a, Result<Reply>>> {
        match action {
            "getAll" => Some(Box::pin(self.get_all())),
            "get" => Some(Box::pin(self.get(params))),
            "getComments" => Some(Box::pin(self.get_comments(params))),
            "add" => Some(Box::pin(self.add(params, context))),
            _ => None,
        }
    }
}
