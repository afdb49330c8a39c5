//! Entity definitions for the FlipMeet tables.
//!
//! Each entity is plain data plus its [`EntityMeta`](flipmeet_core::EntityMeta);
//! persistence goes through [`flipmeet_core::Model`].

mod category;
mod comment;
mod interest;
mod post;
mod user;

pub use category::Category;
pub use comment::Comment;
pub use interest::Interest;
pub use post::Post;
pub use user::{User, SIGNUP_RULES};

use flipmeet_core::{Result, Value};

/// First letter upper-cased, the rest untouched
pub(crate) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Optional text column
pub(crate) fn opt_text(value: Value) -> Option<String> {
    Some(value.into_string())
}

/// Optional integer column
pub(crate) fn opt_int(value: Value, field: &str) -> Result<Option<i64>> {
    value.into_i64(field).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("ana"), "Ana");
        assert_eq!(capitalize("élan vital"), "Élan vital");
        assert_eq!(capitalize(""), "");
    }
}
