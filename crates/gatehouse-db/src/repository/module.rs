//! SurrealDB implementation of [`ModuleRepository`].

use chrono::{DateTime, Utc};
use gatehouse_core::error::{GatehouseError, GatehouseResult};
use gatehouse_core::models::module::{CreateModule, Module, UpdateModule};
use gatehouse_core::repository::{ListQuery, ModuleRepository, Page};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::{
    CountRow, catalog_list_statement, parse_uuid, restore_statement, returning_rows,
    soft_delete_statement,
};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ModuleRow {
    record_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl ModuleRow {
    fn try_into_module(self) -> Result<Module, DbError> {
        Ok(Module {
            id: parse_uuid(&self.record_id)?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn single(rows: Vec<ModuleRow>, id: Uuid) -> Result<Module, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found("module", id))?
        .try_into_module()
}

fn required_name(name: &str) -> GatehouseResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatehouseError::invalid("module name must not be empty"));
    }
    Ok(name.to_string())
}

/// SurrealDB implementation of the Module repository.
#[derive(Clone)]
pub struct SurrealModuleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealModuleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn write(&self, statement: String, id: Uuid) -> Result<Module, DbError> {
        let mut result = self
            .db
            .query(statement)
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        let rows: Vec<ModuleRow> = result.take(0)?;
        single(rows, id)
    }
}

impl<C: Connection> ModuleRepository for SurrealModuleRepository<C> {
    async fn create(&self, input: CreateModule) -> GatehouseResult<Module> {
        let id = Uuid::new_v4();
        let name = required_name(&input.name)?;

        let statement = match input.description {
            Some(_) => "CREATE type::record('module', $id) SET \
                        name = $name, description = $description",
            None => "CREATE type::record('module', $id) SET name = $name",
        };

        let mut builder = self
            .db
            .query(returning_rows(statement))
            .bind(("id", id.to_string()))
            .bind(("name", name));
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from(e).classified())?;
        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        let module = single(rows, id)?;

        info!(module_id = %id, name = %module.name, "module created");
        Ok(module)
    }

    async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> GatehouseResult<Module> {
        let filter = if include_deleted {
            ""
        } else {
            " WHERE deleted_at = NONE"
        };
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM type::record('module', $id){filter}"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> GatehouseResult<Option<Module>> {
        let filter = if include_deleted {
            ""
        } else {
            " AND deleted_at = NONE"
        };
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM module \
                 WHERE name = $name{filter} LIMIT 1"
            ))
            .bind(("name", name.trim().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(ModuleRow::try_into_module)
            .transpose()?)
    }

    async fn update(&self, id: Uuid, input: UpdateModule) -> GatehouseResult<Module> {
        let name = input.name.as_deref().map(required_name).transpose()?;

        let mut sets = Vec::new();
        if name.is_some() {
            sets.push("name = $name");
        }
        match input.description {
            Some(Some(_)) => sets.push("description = $description"),
            Some(None) => sets.push("description = NONE"),
            None => {}
        }
        sets.push("updated_at = time::now()");

        let statement = returning_rows(&format!(
            "UPDATE type::record('module', $id) SET {} WHERE deleted_at = NONE",
            sets.join(", ")
        ));

        let mut builder = self.db.query(statement).bind(("id", id.to_string()));
        if let Some(name) = name {
            builder = builder.bind(("name", name));
        }
        if let Some(Some(description)) = input.description {
            builder = builder.bind(("description", description));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from(e).classified())?;
        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> GatehouseResult<Module> {
        let module = self.write(soft_delete_statement("module"), id).await?;
        info!(module_id = %id, "module soft-deleted");
        Ok(module)
    }

    async fn restore(&self, id: Uuid) -> GatehouseResult<Module> {
        let module = self.write(restore_statement("module"), id).await?;
        info!(module_id = %id, "module restored");
        Ok(module)
    }

    async fn list(&self, query: ListQuery) -> GatehouseResult<Page<Module>> {
        query.validate()?;
        let statement = catalog_list_statement("module", &["name", "description"], &query);

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
        let rows: Vec<ModuleRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(ModuleRow::try_into_module)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page {
            items,
            total: counts.first().map(|c| c.total).unwrap_or(0),
            page: query.page,
            page_size: query.page_size,
        })
    }
}
