//! SurrealDB repository implementations.

mod assignment;
mod module;
mod permission;
mod role;
mod user;

pub use assignment::SurrealRoleAssignmentManager;
pub use module::SurrealModuleRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use user::SurrealUserRepository;

use gatehouse_core::repository::ListQuery;
use gatehouse_core::sorting::CATALOG_SORT_KEYS;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid UUID {raw:?}: {e}")))
}

/// Count statement followed by the page statement for a catalog table.
///
/// Binds expected: `$limit`, `$offset`, and `$search` when the query has
/// a search term.
pub(crate) fn catalog_list_statement(
    table: &str,
    search_fields: &[&str],
    query: &ListQuery,
) -> String {
    let mut conditions = Vec::new();
    if !query.with_deleted {
        conditions.push("deleted_at = NONE".to_string());
    }
    if query.search_term().is_some() {
        let matches: Vec<String> = search_fields
            .iter()
            .map(|field| format!("string::contains(string::lowercase({field} ?? ''), $search)"))
            .collect();
        conditions.push(format!("({})", matches.join(" OR ")));
    }
    let filter = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let column = CATALOG_SORT_KEYS.column(query.sort_by.as_deref());
    let order = query.sort_order.as_sql();

    format!(
        "SELECT count() AS total FROM {table}{filter} GROUP ALL; \
         SELECT meta::id(id) AS record_id, * FROM {table}{filter} \
         ORDER BY {column} {order} LIMIT $limit START $offset;"
    )
}

/// Wrap a write so it yields the written rows with their `record_id`.
pub(crate) fn returning_rows(write: &str) -> String {
    format!("SELECT meta::id(id) AS record_id, * FROM ({write})")
}

/// Soft-delete a live row. No row comes back when it was absent or
/// already deleted.
pub(crate) fn soft_delete_statement(table: &str) -> String {
    returning_rows(&format!(
        "UPDATE type::record('{table}', $id) \
         SET deleted_at = time::now(), updated_at = time::now() \
         WHERE deleted_at = NONE"
    ))
}

/// Restore a soft-deleted row. No row comes back when it was absent or
/// not deleted.
pub(crate) fn restore_statement(table: &str) -> String {
    returning_rows(&format!(
        "UPDATE type::record('{table}', $id) \
         SET deleted_at = NONE, updated_at = time::now() \
         WHERE deleted_at != NONE"
    ))
}
