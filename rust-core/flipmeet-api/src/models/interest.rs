use super::capitalize;
use flipmeet_core::{Entity, EntityMeta, Setter, Value};

/// What a member is looking for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interest {
    id: i64,
    interest: String,
}

impl Interest {
    /// Label with its first letter upper-cased
    #[must_use]
    pub fn label(&self) -> String {
        capitalize(&self.interest)
    }
}

impl Entity for Interest {
    const META: EntityMeta = EntityMeta {
        table: "interests",
        primary_key: "id",
        attributes: &["id", "interest"],
        rules: &[],
        editable: &[],
        hidden: &[],
    };

    fn getter(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "interest" => Some(self.interest.clone().into()),
            _ => None,
        }
    }

    fn setter(field: &str) -> Option<Setter<Self>> {
        let setter: Setter<Self> = match field {
            "id" => |i, v, _| {
                i.id = v.into_i64("id")?;
                Ok(())
            },
            "interest" => |i, v, _| {
                i.interest = v.into_string();
                Ok(())
            },
            _ => return None,
        };
        Some(setter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let interest = Interest {
            id: 1,
            interest: "skating".to_string(),
        };
        assert_eq!(interest.label(), "Skating");
        assert_eq!(Interest::default().label(), "");
    }
}
