use flipmeet_core::{Entity, EntityMeta, Setter, Value};

/// Post category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Category {
    id: i64,
    category: String,
}

impl Entity for Category {
    const META: EntityMeta = EntityMeta {
        table: "categories",
        primary_key: "id",
        attributes: &["id", "category"],
        rules: &[],
        editable: &[],
        hidden: &[],
    };

    fn getter(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "category" => Some(self.category.clone().into()),
            _ => None,
        }
    }

    fn setter(field: &str) -> Option<Setter<Self>> {
        let setter: Setter<Self> = match field {
            "id" => |c, v, _| {
                c.id = v.into_i64("id")?;
                Ok(())
            },
            "category" => |c, v, _| {
                c.category = v.into_string();
                Ok(())
            },
            _ => return None,
        };
        Some(setter)
    }
}
