//! SurrealDB implementation of [`PermissionRepository`].

use chrono::{DateTime, Utc};
use gatehouse_core::error::{GatehouseError, GatehouseResult};
use gatehouse_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use gatehouse_core::repository::{ListQuery, Page, PermissionRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::{CountRow, catalog_list_statement, parse_uuid, restore_statement, soft_delete_statement};
use crate::error::{DbError, THROW_TAG};

#[derive(Debug, SurrealValue)]
pub(crate) struct PermissionRow {
    record_id: String,
    name: String,
    description: String,
    module_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl PermissionRow {
    pub(crate) fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid(&self.record_id)?,
            name: self.name,
            description: self.description,
            module_id: parse_uuid(&self.module_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn single(rows: Vec<PermissionRow>, id: Uuid) -> Result<Permission, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found("permission", id))?
        .try_into_permission()
}

fn required_name(name: &str) -> GatehouseResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatehouseError::invalid("permission name must not be empty"));
    }
    Ok(name.to_string())
}

/// Run `write` only when `$module_id` names a live module.
fn guarded_by_module(write: &str) -> String {
    format!(
        "LET $module = (SELECT VALUE id FROM type::record('module', $module_id) \
             WHERE deleted_at = NONE); \
         IF array::len($module) = 0 {{ THROW '{THROW_TAG}invalid:module' }} \
         ELSE {{ {write} }};"
    )
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid, include_deleted: bool) -> Result<Permission, DbError> {
        let filter = if include_deleted {
            ""
        } else {
            " WHERE deleted_at = NONE"
        };
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('permission', $id){filter}"
            ))
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<PermissionRow> = result.take(0)?;
        single(rows, id)
    }

    async fn write(&self, statement: String, id: Uuid) -> Result<Permission, DbError> {
        let mut result = self
            .db
            .query(statement)
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        let rows: Vec<PermissionRow> = result.take(0)?;
        single(rows, id)
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> GatehouseResult<Permission> {
        let id = Uuid::new_v4();
        let name = required_name(&input.name)?;

        self.db
            .query(guarded_by_module(
                "CREATE type::record('permission', $id) SET \
                 name = $name, description = $description, module_id = $module_id",
            ))
            .bind(("id", id.to_string()))
            .bind(("name", name))
            .bind(("description", input.description))
            .bind(("module_id", input.module_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from(e).classified())?;

        let permission = self.fetch(id, false).await?;
        info!(permission_id = %id, name = %permission.name, "permission created");
        Ok(permission)
    }

    async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> GatehouseResult<Permission> {
        Ok(self.fetch(id, include_deleted).await?)
    }

    async fn get_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> GatehouseResult<Option<Permission>> {
        let filter = if include_deleted {
            ""
        } else {
            " AND deleted_at = NONE"
        };
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE name = $name{filter} LIMIT 1"
            ))
            .bind(("name", name.trim().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(PermissionRow::try_into_permission)
            .transpose()?)
    }

    async fn update(&self, id: Uuid, input: UpdatePermission) -> GatehouseResult<Permission> {
        let name = input.name.as_deref().map(required_name).transpose()?;

        let mut sets = Vec::new();
        if name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.module_id.is_some() {
            sets.push("module_id = $module_id");
        }
        sets.push("updated_at = time::now()");

        let update = format!(
            "UPDATE type::record('permission', $id) SET {} WHERE deleted_at = NONE",
            sets.join(", ")
        );
        let statement = if input.module_id.is_some() {
            guarded_by_module(&update)
        } else {
            update
        };

        let mut builder = self.db.query(statement).bind(("id", id.to_string()));
        if let Some(name) = name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(module_id) = input.module_id {
            builder = builder.bind(("module_id", module_id.to_string()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from(e).classified())?;

        // A soft-deleted permission was left untouched and reads as absent.
        Ok(self.fetch(id, false).await?)
    }

    async fn delete(&self, id: Uuid) -> GatehouseResult<Permission> {
        let permission = self.write(soft_delete_statement("permission"), id).await?;
        info!(permission_id = %id, "permission soft-deleted");
        Ok(permission)
    }

    async fn restore(&self, id: Uuid) -> GatehouseResult<Permission> {
        let permission = self.write(restore_statement("permission"), id).await?;
        info!(permission_id = %id, "permission restored");
        Ok(permission)
    }

    async fn list(&self, query: ListQuery) -> GatehouseResult<Page<Permission>> {
        query.validate()?;
        let statement = catalog_list_statement("permission", &["name", "description"], &query);

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
        let rows: Vec<PermissionRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(PermissionRow::try_into_permission)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page {
            items,
            total: counts.first().map(|c| c.total).unwrap_or(0),
            page: query.page,
            page_size: query.page_size,
        })
    }
}
