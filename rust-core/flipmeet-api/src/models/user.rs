use super::{capitalize, opt_int, opt_text};
use flipmeet_core::{Entity, EntityMeta, RuleSet, Setter, Value};

/// Rules for sign-up, where names are optional
pub const SIGNUP_RULES: &RuleSet<'static> = &[
    ("name", &["max:75"]),
    ("lastname", &["max:75"]),
    ("email", &["required", "email"]),
    ("password", &["required", "min:5", "max:16"]),
    ("location", &["min:4"]),
    ("birthday", &["required"]),
];

/// Registered member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    id: i64,
    name: String,
    lastname: String,
    email: String,
    password: String,
    photo: Option<String>,
    startdate: Option<String>,
    location: Option<String>,
    birthday: Option<String>,
    fkinterest: Option<i64>,
}

impl User {
    /// Primary key
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// First name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Login email
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Public handle: the email local part with its first letter upper-cased
    #[must_use]
    pub fn display_name(&self) -> String {
        let local = self.email.split_once('@').map_or(self.email.as_str(), |(l, _)| l);
        capitalize(local)
    }

    /// Stored password digest
    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password
    }

    /// Interest foreign key
    #[must_use]
    pub const fn fkinterest(&self) -> Option<i64> {
        self.fkinterest
    }
}

impl Entity for User {
    const META: EntityMeta = EntityMeta {
        table: "users",
        primary_key: "id",
        attributes: &[
            "id",
            "name",
            "lastname",
            "email",
            "password",
            "photo",
            "startdate",
            "location",
            "birthday",
            "fkinterest",
        ],
        rules: &[
            ("name", &["required", "max:75"]),
            ("lastname", &["required", "max:75"]),
            ("email", &["required", "email"]),
            ("password", &["required", "min:5", "max:16"]),
            ("location", &["min:4"]),
            ("birthday", &["required"]),
        ],
        editable: &[
            "name",
            "lastname",
            "password",
            "location",
            "birthday",
            "photo",
            "fkinterest",
        ],
        hidden: &["password"],
    };

    fn getter(&self, field: &str) -> Option<Value> {
        let value: Value = match field {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "lastname" => self.lastname.clone().into(),
            "email" => self.email.clone().into(),
            "password" => self.password.clone().into(),
            "photo" => self.photo.clone().into(),
            "startdate" => self.startdate.clone().into(),
            "location" => self.location.clone().into(),
            "birthday" => self.birthday.clone().into(),
            "fkinterest" => self.fkinterest.into(),
            _ => return None,
        };
        Some(value)
    }

    fn setter(field: &str) -> Option<Setter<Self>> {
        let setter: Setter<Self> = match field {
            "id" => |u, v, _| {
                u.id = v.into_i64("id")?;
                Ok(())
            },
            "name" => |u, v, _| {
                u.name = v.into_string();
                Ok(())
            },
            "lastname" => |u, v, _| {
                u.lastname = v.into_string();
                Ok(())
            },
            "email" => |u, v, _| {
                u.email = v.into_string();
                Ok(())
            },
            "password" => |u, v, _| {
                u.password = v.into_string();
                Ok(())
            },
            "photo" => |u, v, _| {
                u.photo = opt_text(v);
                Ok(())
            },
            "startdate" => |u, v, _| {
                u.startdate = opt_text(v);
                Ok(())
            },
            "location" => |u, v, _| {
                u.location = opt_text(v);
                Ok(())
            },
            "birthday" => |u, v, _| {
                u.birthday = opt_text(v);
                Ok(())
            },
            "fkinterest" => |u, v, _| {
                u.fkinterest = opt_int(v, "fkinterest")?;
                Ok(())
            },
            _ => return None,
        };
        Some(setter)
    }
}
