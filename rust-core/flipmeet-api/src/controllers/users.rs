use super::{current_user, now, record_id, text};
use crate::auth::PasswordHasher;
use crate::models::{Interest, User, SIGNUP_RULES};
use flipmeet_core::{
    BoxFuture, Context, Controller, Database, Entity, Error, Model, Params, Reply, Result,
    Validator, Value,
};
use serde_json::json;
use tracing::info;

/// Member registration, profile lookup and profile edits
pub struct UsersController {
    users: Model<User>,
    interests: Model<Interest>,
    hasher: PasswordHasher,
}

impl UsersController {
    /// Create the controller
    #[must_use]
    pub fn new(db: &Database, hasher: PasswordHasher) -> Self {
        Self {
            users: Model::new(db.clone()),
            interests: Model::new(db.clone()),
            hasher,
        }
    }

    async fn get(&self, params: Params) -> Result<Reply> {
        let id = record_id(&params, "id", User::META.table)?;
        let user = self.users.get_by_primary_key(id).await?;

        let interest = match user.fkinterest() {
            Some(fk) => match self.interests.get_by_primary_key(fk).await {
                Ok(interest) => Some(interest.label()),
                Err(Error::RecordNotFound { .. }) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        let mut data = serde_json::Map::new();
        for field in ["id", "name", "lastname", "location", "birthday", "fkinterest"] {
            data.insert(field.to_string(), user.get(field)?.to_json());
        }
        data.insert("interest".to_string(), json!(interest));
        Ok(Reply::data(serde_json::Value::Object(data)))
    }

    async fn add(&self, mut params: Params) -> Result<Reply> {
        Validator::new(&params, SIGNUP_RULES)?.into_result()?;

        let email = text(&params, "email");
        if !self
            .users
            .get_by_attribute("email", email.as_str())
            .await?
            .is_empty()
        {
            return Err(Error::Conflict {
                message: "A user with that email already exists.".to_string(),
            });
        }

        params.insert("email".to_string(), Value::Text(email));
        prepare(&mut params, self.hasher).await?;
        params.insert("startdate".to_string(), now());

        let user = self.users.create(&params).await?;
        info!(user_id = user.id(), "User registered");

        Ok(Reply::created(
            "User created successfully.",
            json!({ "id": user.id() }),
        ))
    }

    async fn edit(&self, params: Params, context: Option<Context>) -> Result<Reply> {
        let id = record_id(&params, "id", User::META.table)?;
        let mut user = self.users.get_by_primary_key(id).await?;

        let caller = current_user(&self.users, context.as_ref()).await?;
        if caller.id() != user.id() {
            return Err(Error::unauthorized("You can only edit your own profile."));
        }

        let mut data: Params = params
            .into_iter()
            .filter(|(field, _)| User::META.editable.contains(&field.as_str()))
            .collect();
        let rules: Vec<_> = User::editable_rules()
            .into_iter()
            .filter(|(field, _)| data.contains_key(*field))
            .collect();
        Validator::new(&data, &rules)?.into_result()?;

        prepare(&mut data, self.hasher).await?;
        let changed = self.users.update(&mut user, &data).await?;
        info!(user_id = user.id(), changed, "User edited");

        Ok(if changed {
            Reply::ack("User updated successfully.")
        } else {
            Reply::ack("No changes were made.")
        })
    }
}

/// Hash a supplied password and cut a supplied birthday to `YYYY-MM-DD`
async fn prepare(data: &mut Params, hasher: PasswordHasher) -> Result<()> {
    if let Some(password) = data.get_mut("password").filter(|v| !v.is_null()) {
        let hashed = hasher.hash(password.as_text().into_owned()).await?;
        *password = Value::Text(hashed);
    }
    if let Some(birthday) = data.get_mut("birthday").filter(|v| !v.is_null()) {
        let day: String = birthday.as_text().chars().take(10).collect();
        *birthday = Value::Text(day);
    }
    Ok(())
}

impl Controller for UsersController {
    fn name(&self) -> &'static str {
        "UsersController"
    }

    fn actions(&self) -> &'static [&'static str] {
        &["get", "add", "edit"]
    }

    fn call<'a>(
        &'a self,
        action: &'a str,
        params: Params,
        context: Option<Context>,
    ) -> Option<BoxFuture<'a, Result<Reply>>> {
        match action {
            "get" => Some(Box::pin(self.get(params))),
            "add" => Some(Box::pin(self.add(params))),
            "edit" => Some(Box::pin(self.edit(params, context))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{verify_password, MIN_COST};

    #[tokio::test]
    async fn test_prepare() {
        let mut data: Params = [
            ("password", Value::from("secret1")),
            ("birthday", Value::from("1990-05-17T00:00:00.000Z")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        prepare(&mut data, PasswordHasher::new(MIN_COST)).await.unwrap();
        assert_eq!(data["birthday"], Value::from("1990-05-17"));
        assert!(verify_password("secret1", &data["password"].as_text()));
    }

    #[tokio::test]
    async fn test_prepare_leaves_missing_fields() {
        let mut data = Params::new();
        prepare(&mut data, PasswordHasher::new(MIN_COST)).await.unwrap();
        assert!(data.is_empty());
    }
}
