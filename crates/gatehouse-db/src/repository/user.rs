//! SurrealDB implementation of [`UserRepository`], the Identity Store.

use chrono::{DateTime, Utc};
use gatehouse_core::error::GatehouseResult;
use gatehouse_core::models::identity::{RoleGrants, UserGraph};
use gatehouse_core::models::user::{User, UserWithRole, normalize_email, normalize_username};
use gatehouse_core::repository::{ListQuery, Page, UserRepository};
use gatehouse_core::sorting::USER_SORT_KEYS;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::permission::PermissionRow;
use super::role::RoleRow;
use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// Projection shared by every user read: the row plus its current role.
pub(crate) const USER_COLUMNS: &str = "meta::id(id) AS record_id, *, \
    (SELECT VALUE meta::id(out) FROM has_role WHERE in = $parent.id)[0] AS role_id, \
    (SELECT VALUE out.name FROM has_role WHERE in = $parent.id)[0] AS role_name";

#[derive(Debug, SurrealValue)]
pub(crate) struct UserRow {
    record_id: String,
    first_name: String,
    last_name: String,
    email: String,
    username: String,
    password_hash: String,
    is_active: bool,
    profile_image: Option<String>,
    dark_mode: bool,
    password_expires_at: Option<DateTime<Utc>>,
    must_change_password: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    role_id: Option<String>,
    role_name: Option<String>,
}

impl UserRow {
    pub(crate) fn try_into_user_with_role(self) -> Result<UserWithRole, DbError> {
        let role_id = self.role_id.as_deref().map(parse_uuid).transpose()?;
        let role = self.role_name;
        let user = User {
            id: parse_uuid(&self.record_id)?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            is_active: self.is_active,
            profile_image: self.profile_image,
            dark_mode: self.dark_mode,
            password_expires_at: self.password_expires_at,
            must_change_password: self.must_change_password,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        };
        Ok(UserWithRole {
            user,
            role_id,
            role,
        })
    }

    fn try_into_user(self) -> Result<User, DbError> {
        Ok(self.try_into_user_with_role()?.user)
    }
}

/// A user, its current role and that role's live permissions, read by one
/// statement.
#[derive(Debug, SurrealValue)]
struct GraphRow {
    user: Vec<UserRow>,
    roles: Vec<RoleRow>,
    permissions: Vec<PermissionRow>,
}

fn alive_filter(include_deleted: bool) -> &'static str {
    if include_deleted {
        ""
    } else {
        " WHERE deleted_at = NONE"
    }
}

/// SurrealDB implementation of the Identity Store.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one_by(&self, field: &'static str, value: String) -> Result<Option<User>, DbError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM user \
             WHERE {field} = $value AND deleted_at = NONE LIMIT 1"
        );
        let mut result = self.db.query(query).bind(("value", value)).await?.check()?;
        let rows: Vec<UserRow> = result.take(0)?;
        rows.into_iter().next().map(UserRow::try_into_user).transpose()
    }

    async fn find_row(&self, id: Uuid, include_deleted: bool) -> Result<Option<UserRow>, DbError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM type::record('user', $id){}",
            alive_filter(include_deleted)
        );
        let mut result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        let rows: Vec<UserRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> GatehouseResult<Option<User>> {
        let row = self.find_row(id, include_deleted).await?;
        Ok(row.map(UserRow::try_into_user).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> GatehouseResult<Option<User>> {
        Ok(self.find_one_by("email", normalize_email(email)).await?)
    }

    async fn find_by_username(&self, username: &str) -> GatehouseResult<Option<User>> {
        Ok(self
            .find_one_by("username", normalize_username(username))
            .await?)
    }

    async fn find_graph_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> GatehouseResult<Option<UserGraph>> {
        // One statement runs in one transaction, so the user, its current
        // role and that role's permissions come from the same snapshot.
        let query = format!(
            "RETURN {{ \
                 user: (SELECT {USER_COLUMNS} FROM type::record('user', $id){}), \
                 roles: (SELECT meta::id(id) AS record_id, * FROM role \
                     WHERE id IN (SELECT VALUE out FROM has_role \
                         WHERE in = type::record('user', $id))), \
                 permissions: (SELECT meta::id(id) AS record_id, * FROM permission \
                     WHERE deleted_at = NONE AND id IN (\
                         SELECT VALUE out FROM grants WHERE in IN (\
                             SELECT VALUE out FROM has_role \
                             WHERE in = type::record('user', $id)))) \
             }};",
            alive_filter(include_deleted)
        );
        let mut result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let graph: Option<GraphRow> = result.take(0).map_err(DbError::from)?;
        let Some(GraphRow {
            user,
            roles,
            permissions,
        }) = graph
        else {
            return Ok(None);
        };
        let Some(user) = user.into_iter().next() else {
            return Ok(None);
        };
        let user = user.try_into_user()?;

        let role = match roles.into_iter().next() {
            Some(role) => Some(RoleGrants {
                role: role.try_into_role()?,
                permissions: permissions
                    .into_iter()
                    .map(PermissionRow::try_into_permission)
                    .collect::<Result<Vec<_>, DbError>>()?,
            }),
            None => None,
        };

        Ok(Some(UserGraph { user, role }))
    }

    async fn find_with_role(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> GatehouseResult<Option<UserWithRole>> {
        let row = self.find_row(id, include_deleted).await?;
        Ok(row.map(UserRow::try_into_user_with_role).transpose()?)
    }

    async fn list(&self, query: ListQuery) -> GatehouseResult<Page<UserWithRole>> {
        query.validate()?;

        let mut conditions = Vec::new();
        if !query.with_deleted {
            conditions.push("deleted_at = NONE");
        }
        let search = query.search_term();
        if search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(email), $search) \
                 OR string::contains(string::lowercase(username), $search) \
                 OR string::contains(string::lowercase(first_name), $search) \
                 OR string::contains(string::lowercase(last_name), $search))",
            );
        }
        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        // Sort column comes from the whitelist, never from the caller.
        let column = USER_SORT_KEYS.column(query.sort_by.as_deref());
        let order = query.sort_order.as_sql();

        let statement = format!(
            "SELECT count() AS total FROM user{filter} GROUP ALL; \
             SELECT {USER_COLUMNS} FROM user{filter} \
             ORDER BY {column} {order} LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(statement)
            .bind(("limit", query.page_size))
            .bind(("offset", query.offset()));
        if let Some(search) = search {
            builder = builder.bind(("search", search));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(UserRow::try_into_user_with_role)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page {
            items,
            total: counts.first().map(|c| c.total).unwrap_or(0),
            page: query.page,
            page_size: query.page_size,
        })
    }
}
