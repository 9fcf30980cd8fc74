use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ParseEnumError;

/// Catalog category. Stored and exchanged by its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    Electronics,
    Fashion,
    Home,
    Lifestyle,
    Sports,
    Books,
    Toys,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Electronics,
        Category::Fashion,
        Category::Home,
        Category::Lifestyle,
        Category::Sports,
        Category::Books,
        Category::Toys,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Fashion => "Fashion",
            Category::Home => "Home",
            Category::Lifestyle => "Lifestyle",
            Category::Sports => "Sports",
            Category::Books => "Books",
            Category::Toys => "Toys",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    /// Case-insensitive, so `/category/books` resolves like `/category/Books`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("category", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!("books".parse::<Category>(), Ok(Category::Books));
        assert_eq!("ELECTRONICS".parse::<Category>(), Ok(Category::Electronics));
    }

    #[test]
    fn rejects_unknown() {
        let err = "Groceries".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category: Groceries");
    }
}
