//! Whitelisted sort keys for list queries.
//!
//! A client-supplied sort key is looked up in a static table and mapped
//! to a storage column before any query text is built. Unknown keys fall
//! back to the table's default column.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug)]
pub struct SortKeys {
    entries: &'static [(&'static str, &'static str)],
    default_column: &'static str,
}

impl SortKeys {
    pub const fn new(
        entries: &'static [(&'static str, &'static str)],
        default_column: &'static str,
    ) -> Self {
        Self {
            entries,
            default_column,
        }
    }

    /// Storage column for `key`, or the default column.
    pub fn column(&self, key: Option<&str>) -> &'static str {
        key.and_then(|key| {
            self.entries
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, column)| *column)
        })
        .unwrap_or(self.default_column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(name, _)| *name)
    }
}

pub static USER_SORT_KEYS: SortKeys = SortKeys::new(
    &[
        ("createdAt", "created_at"),
        ("email", "email"),
        ("username", "username"),
        ("firstName", "first_name"),
        ("lastName", "last_name"),
        ("isActive", "is_active"),
    ],
    "created_at",
);

/// Shared by roles, permissions and modules.
pub static CATALOG_SORT_KEYS: SortKeys = SortKeys::new(
    &[
        ("created_at", "created_at"),
        ("name", "name"),
        ("description", "description"),
        ("updated_at", "updated_at"),
        ("deleted_at", "deleted_at"),
    ],
    "created_at",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_map_to_columns() {
        assert_eq!(USER_SORT_KEYS.column(Some("firstName")), "first_name");
        assert_eq!(CATALOG_SORT_KEYS.column(Some("name")), "name");
    }

    #[test]
    fn unknown_or_missing_key_falls_back() {
        assert_eq!(USER_SORT_KEYS.column(Some("password_hash")), "created_at");
        assert_eq!(USER_SORT_KEYS.column(Some("email; DELETE user")), "created_at");
        assert_eq!(CATALOG_SORT_KEYS.column(None), "created_at");
    }

    #[test]
    fn default_order_is_descending() {
        assert_eq!(SortOrder::default().as_sql(), "DESC");
    }
}
