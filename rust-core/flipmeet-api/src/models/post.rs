use super::{capitalize, opt_text};
use flipmeet_core::{Entity, EntityMeta, Setter, Value};

/// Wall post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Post {
    id: i64,
    text: String,
    creation_date: Option<String>,
    fkuser: i64,
}

impl Post {
    /// Primary key
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Author id
    #[must_use]
    pub const fn fkuser(&self) -> i64 {
        self.fkuser
    }

    /// Body text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Body text with its first letter upper-cased, shown as the post title
    #[must_use]
    pub fn headline(&self) -> String {
        capitalize(&self.text)
    }
}

impl Entity for Post {
    const META: EntityMeta = EntityMeta {
        table: "posts",
        primary_key: "id",
        attributes: &["id", "text", "creationDate", "fkuser"],
        rules: &[("text", &["required", "max:255"])],
        editable: &["text"],
        hidden: &[],
    };

    fn getter(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "text" => Some(self.text.clone().into()),
            "creationDate" => Some(self.creation_date.clone().into()),
            "fkuser" => Some(self.fkuser.into()),
            _ => None,
        }
    }

    fn setter(field: &str) -> Option<Setter<Self>> {
        let setter: Setter<Self> = match field {
            "id" => |p, v, _| {
                p.id = v.into_i64("id")?;
                Ok(())
            },
            "text" => |p, v, _| {
                p.text = v.into_string();
                Ok(())
            },
            "creationDate" => |p, v, _| {
                p.creation_date = opt_text(v);
                Ok(())
            },
            "fkuser" => |p, v, _| {
                p.fkuser = v.into_i64("fkuser")?;
                Ok(())
            },
            _ => return None,
        };
        Some(setter)
    }
}
