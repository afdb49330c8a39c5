use super::{opt_text, Post, User};
use flipmeet_core::{Entity, EntityMeta, Setter, Value};

/// Reply under a post
///
/// `user` and `post` are display labels resolved from the author and parent
/// post; they are not columns and are only present after [`Comment::describe`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    id: i64,
    fkuser: i64,
    fkpost: i64,
    creation_date: Option<String>,
    text: String,
    user: Option<String>,
    post: Option<String>,
}

impl Comment {
    /// Primary key
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Post this comment belongs to
    #[must_use]
    pub const fn fkpost(&self) -> i64 {
        self.fkpost
    }

    /// Author id
    #[must_use]
    pub const fn fkuser(&self) -> i64 {
        self.fkuser
    }

    /// Attach the author's display name and the parent post's headline
    pub fn describe(&mut self, author: &User, post: &Post) {
        self.user = Some(author.display_name());
        self.post = Some(post.headline());
    }
}

impl Entity for Comment {
    const META: EntityMeta = EntityMeta {
        table: "comments",
        primary_key: "id",
        attributes: &["id", "fkuser", "fkpost", "creationDate", "text"],
        rules: &[("text", &["required", "max:255"])],
        editable: &["text"],
        hidden: &[],
    };

    fn getter(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "fkuser" => Some(self.fkuser.into()),
            "fkpost" => Some(self.fkpost.into()),
            "creationDate" => Some(self.creation_date.clone().into()),
            "text" => Some(self.text.clone().into()),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let mut map: serde_json::Map<String, serde_json::Value> = Self::META
            .attributes
            .iter()
            .filter_map(|attr| self.getter(attr).map(|v| ((*attr).to_string(), v.to_json())))
            .collect();
        map.insert("user".to_string(), serde_json::json!(self.user));
        map.insert("post".to_string(), serde_json::json!(self.post));
        serde_json::Value::Object(map)
    }

    fn setter(field: &str) -> Option<Setter<Self>> {
        let setter: Setter<Self> = match field {
            "id" => |c, v, _| {
                c.id = v.into_i64("id")?;
                Ok(())
            },
            "fkuser" => |c, v, _| {
                c.fkuser = v.into_i64("fkuser")?;
                Ok(())
            },
            "fkpost" => |c, v, _| {
                c.fkpost = v.into_i64("fkpost")?;
                Ok(())
            },
            "creationDate" => |c, v, _| {
                c.creation_date = opt_text(v);
                Ok(())
            },
            "text" => |c, v, _| {
                c.text = v.into_string();
                Ok(())
            },
            _ => return None,
        };
        Some(setter)
    }
}
