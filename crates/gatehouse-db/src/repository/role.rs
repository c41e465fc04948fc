//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use gatehouse_core::error::{GatehouseError, GatehouseResult};
use gatehouse_core::models::permission::Permission;
use gatehouse_core::models::role::{CreateRole, Role, UpdateRole};
use gatehouse_core::repository::{ListQuery, Page, RoleRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::permission::PermissionRow;
use super::{
    CountRow, catalog_list_statement, parse_uuid, restore_statement, returning_rows,
    soft_delete_statement,
};
use crate::error::{DbError, THROW_TAG};

#[derive(Debug, SurrealValue)]
pub(crate) struct RoleRow {
    record_id: String,
    name: String,
    description: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl RoleRow {
    pub(crate) fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid(&self.record_id)?,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn single(rows: Vec<RoleRow>, id: Uuid) -> Result<Role, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found("role", id))?
        .try_into_role()
}

fn required_name(name: &str) -> GatehouseResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatehouseError::invalid("role name must not be empty"));
    }
    Ok(name.to_string())
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn write(&self, statement: String, id: Uuid) -> Result<Role, DbError> {
        let mut result = self
            .db
            .query(statement)
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        let rows: Vec<RoleRow> = result.take(0)?;
        single(rows, id)
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> GatehouseResult<Role> {
        let id = Uuid::new_v4();
        let name = required_name(&input.name)?;

        let result = self
            .db
            .query(returning_rows(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description",
            ))
            .bind(("id", id.to_string()))
            .bind(("name", name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from(e).classified())?;
        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let role = single(rows, id)?;

        info!(role_id = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> GatehouseResult<Role> {
        let filter = if include_deleted {
            ""
        } else {
            " WHERE deleted_at = NONE"
        };
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM type::record('role', $id){filter}"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> GatehouseResult<Option<Role>> {
        let filter = if include_deleted {
            ""
        } else {
            " AND deleted_at = NONE"
        };
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE name = $name{filter} LIMIT 1"
            ))
            .bind(("name", name.trim().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(RoleRow::try_into_role)
            .transpose()?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> GatehouseResult<Role> {
        let name = input.name.as_deref().map(required_name).transpose()?;

        let mut sets = Vec::new();
        if name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let statement = returning_rows(&format!(
            "UPDATE type::record('role', $id) SET {} WHERE deleted_at = NONE",
            sets.join(", ")
        ));

        let mut builder = self.db.query(statement).bind(("id", id.to_string()));
        if let Some(name) = name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from(e).classified())?;
        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> GatehouseResult<Role> {
        // Assignments and grants stay so a restore brings the same
        // permissions back.
        let role = self.write(soft_delete_statement("role"), id).await?;
        info!(role_id = %id, "role soft-deleted");
        Ok(role)
    }

    async fn restore(&self, id: Uuid) -> GatehouseResult<Role> {
        let role = self.write(restore_statement("role"), id).await?;
        info!(role_id = %id, "role restored");
        Ok(role)
    }

    async fn list(&self, query: ListQuery) -> GatehouseResult<Page<Role>> {
        query.validate()?;
        let statement = catalog_list_statement("role", &["name", "description"], &query);

        let mut builder = self
            .db
            .query(statement)
            .bind(("limit", query.page_size))
            .bind(("offset", query.offset()));
        if let Some(search) = query.search_term() {
            builder = builder.bind(("search", search));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page {
            items,
            total: counts.first().map(|c| c.total).unwrap_or(0),
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn grant_permission(&self, role_id: Uuid, permission_id: Uuid) -> GatehouseResult<()> {
        let role_id_str = role_id.to_string();
        let perm_id_str = permission_id.to_string();

        // RELATE requires literal record ids; UUIDs are safe to embed.
        let query = format!(
            "LET $role = (SELECT VALUE id FROM type::record('role', $role_id) \
                 WHERE deleted_at = NONE); \
             LET $permission = (SELECT VALUE id FROM type::record('permission', $perm_id) \
                 WHERE deleted_at = NONE); \
             IF array::len($role) = 0 {{ THROW '{THROW_TAG}invalid:role' }} \
             ELSE IF array::len($permission) = 0 {{ THROW '{THROW_TAG}invalid:permission' }} \
             ELSE {{ RELATE role:`{role_id_str}` -> grants -> permission:`{perm_id_str}` }};"
        );

        self.db
            .query(query)
            .bind(("role_id", role_id_str.clone()))
            .bind(("perm_id", perm_id_str.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from(e).classified())?;

        info!(role_id = %role_id_str, permission_id = %perm_id_str, "permission granted");
        Ok(())
    }

    async fn revoke_permission(&self, role_id: Uuid, permission_id: Uuid) -> GatehouseResult<()> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM (DELETE grants WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $perm_id) \
                 RETURN BEFORE)",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let removed: Vec<String> = result.take(0).map_err(DbError::from)?;
        if removed.is_empty() {
            return Err(GatehouseError::not_found(
                "grant",
                format!("{role_id}->{permission_id}"),
            ));
        }

        info!(role_id = %role_id, permission_id = %permission_id, "permission revoked");
        Ok(())
    }

    async fn permissions_of(&self, role_id: Uuid) -> GatehouseResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE deleted_at = NONE \
                 AND id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) ORDER BY name ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(PermissionRow::try_into_permission)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
