use super::text;
use crate::auth::{PasswordHasher, TokenService};
use crate::models::User;
use flipmeet_core::{
    BoxFuture, Context, Controller, Database, Error, Model, Params, Reply, Result, RuleSet,
    Validator,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const LOGIN_RULES: &RuleSet<'static> = &[("email", &["required"]), ("password", &["required"])];

/// Session login
pub struct LogController {
    users: Model<User>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
}

impl LogController {
    /// Create the controller
    #[must_use]
    pub fn new(db: &Database, tokens: Arc<TokenService>, hasher: PasswordHasher) -> Self {
        Self {
            users: Model::new(db.clone()),
            tokens,
            hasher,
        }
    }

    async fn login(&self, params: Params) -> Result<Reply> {
        Validator::new(&params, LOGIN_RULES)?.into_result()?;

        let email = text(&params, "email");
        let password = params
            .get("password")
            .map(|v| v.as_text().into_owned())
            .unwrap_or_default();

        let rejected = || Error::unauthorized("Incorrect email or password.");
        let user = self
            .users
            .get_by_attribute("email", email.as_str())
            .await?
            .into_iter()
            .next()
            .ok_or_else(rejected)?;
        if !self
            .hasher
            .verify(password, user.password_hash().to_string())
            .await
        {
            return Err(rejected());
        }

        let token = self.tokens.issue(user.email())?;
        info!(user_id = user.id(), "User logged in");

        Ok(Reply::data(json!({
            "token": token,
            "id": user.id(),
            "email": user.email(),
            "name": user.name(),
        })))
    }
}

impl Controller for LogController {
    fn name(&self) -> &'static str {
        "LogController"
    }

    fn actions(&self) -> &'static [&'static str] {
        &["login"]
    }

    fn call<'a>(
        &'a self,
        action: &'a str,
        params: Params,
        _context: Option<Context>,
    ) -> Option<BoxFuture<'a, Result<Reply>>> {
        match action {
            "login" => Some(Box::pin(self.login(params))),
            _ => None,
        }
    }
}
