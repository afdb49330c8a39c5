//! # Active Record Models
//!
//! Metadata-driven CRUD shared by every entity type.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: `Entity` describes a row shape, `Model` persists it
//! - **O**: New entities only supply metadata and accessors
//! - **L**: Every entity goes through the same generic engine
//! - **D**: `Model` depends on the injected `Database`, never on a global
//!
//! The attribute whitelist in [`EntityMeta`] is the schema contract: generic
//! INSERT and UPDATE statements name only whitelisted columns, and any other
//! input key is dropped. Identifiers are double-quoted and values are always
//! bound.
//!
//! Entities are read-only from the outside. Setters exist, but they demand a
//! [`Hydration`] token that only this module can create, so state changes go
//! through `create`, `update` and row loading.

use crate::database::{Database, Dialect};
use crate::error::{Error, Result};
use crate::validation::RuleSet;
use crate::value::{Params, Row, Value};
use std::marker::PhantomData;
use tracing::debug;

/// Static description of an entity's table
#[derive(Debug, Clone, Copy)]
pub struct EntityMeta {
    /// Table name
    pub table: &'static str,
    /// Primary key column
    pub primary_key: &'static str,
    /// Ordered column whitelist
    pub attributes: &'static [&'static str],
    /// Validation rules per field
    pub rules: &'static RuleSet<'static>,
    /// Fields a client may change
    pub editable: &'static [&'static str],
    /// Fields left out of the JSON form
    pub hidden: &'static [&'static str],
}

/// Proof that a write comes from the persistence engine
///
/// Has no public constructor.
#[derive(Debug, Clone, Copy)]
pub struct Hydration {
    _private: (),
}

impl Hydration {
    const fn new() -> Self {
        Self { _private: () }
    }
}

/// Writes one field during hydration
pub type Setter<E> = fn(&mut E, Value, Hydration) -> Result<()>;

/// A row shape with per-field accessors
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// Table metadata
    const META: EntityMeta;

    /// Read a field; `None` if the entity has no such accessor
    fn getter(&self, field: &str) -> Option<Value>;

    /// Writer for a field; `None` if the field cannot be hydrated
    fn setter(field: &str) -> Option<Setter<Self>>;

    /// Read a field through the property boundary
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownProperty` if there is no accessor.
    fn get(&self, field: &str) -> Result<Value> {
        self.getter(field).ok_or_else(|| Error::UnknownProperty {
            table: Self::META.table,
            field: field.to_string(),
        })
    }

    /// Attempt a write through the property boundary
    ///
    /// Always refused: fields with a setter are read-only from outside.
    ///
    /// # Errors
    ///
    /// Returns `Error::ImmutableProperty` if the field has a setter and
    /// `Error::UnknownProperty` otherwise.
    fn set(&mut self, field: &str, _value: Value) -> Result<()> {
        if Self::setter(field).is_some() {
            Err(Error::ImmutableProperty {
                table: Self::META.table,
                field: field.to_string(),
            })
        } else {
            Err(Error::UnknownProperty {
                table: Self::META.table,
                field: field.to_string(),
            })
        }
    }

    /// Primary key value of this instance
    fn primary_key(&self) -> Value {
        self.getter(Self::META.primary_key).unwrap_or_default()
    }

    /// Rules restricted to editable fields
    fn editable_rules() -> Vec<(&'static str, &'static [&'static str])> {
        Self::META
            .rules
            .iter()
            .filter(|(field, _)| Self::META.editable.contains(field))
            .copied()
            .collect()
    }

    /// Whitelisted, non-hidden attributes as a JSON object
    fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = Self::META
            .attributes
            .iter()
            .filter(|attr| !Self::META.hidden.contains(attr))
            .filter_map(|attr| self.getter(attr).map(|v| ((*attr).to_string(), v.to_json())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Build an entity from column values
///
/// Walks the whitelist; `Null` values and attributes without a setter are
/// skipped.
///
/// # Errors
///
/// Returns `Error::InvalidValue` if a setter cannot coerce its value.
pub fn hydrate<E: Entity>(row: &Row) -> Result<E> {
    let mut entity = E::default();
    apply(&mut entity, row)?;
    Ok(entity)
}

fn apply<E: Entity>(entity: &mut E, values: &Params) -> Result<()> {
    for attr in E::META.attributes {
        let Some(value) = values.get(*attr).filter(|v| !v.is_null()) else {
            continue;
        };
        if let Some(setter) = E::setter(attr) {
            setter(entity, value.clone(), Hydration::new())?;
        }
    }
    Ok(())
}

/// Generic CRUD engine for one entity type
pub struct Model<E: Entity> {
    db: Database,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Model<E> {
    fn clone(&self) -> Self {
        Self::new(self.db.clone())
    }
}

impl<E: Entity> std::fmt::Debug for Model<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("table", &E::META.table)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Model<E> {
    /// Engine over an injected database handle
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// The database handle
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Load one row by primary key
    ///
    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` when no row matches and
    /// `Error::DataAccess` when the query fails.
    pub async fn get_by_primary_key(&self, pk: impl Into<Value> + Send) -> Result<E> {
        let pk = pk.into();
        let meta = E::META;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = {}",
            quote(meta.table),
            quote(meta.primary_key),
            self.db.dialect().placeholder(1)
        );

        let rows = self.db.fetch_all(&sql, std::slice::from_ref(&pk)).await?;
        let row = rows.first().ok_or_else(|| Error::RecordNotFound {
            table: meta.table,
            key: pk.to_string(),
        })?;
        hydrate(row)
    }

    /// Load every row whose `attr` equals `value`
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `attr` is not whitelisted and
    /// `Error::DataAccess` when the query fails.
    pub async fn get_by_attribute(&self, attr: &str, value: impl Into<Value> + Send) -> Result<Vec<E>> {
        let value = value.into();
        let meta = E::META;
        if !meta.attributes.contains(&attr) {
            return Err(Error::configuration(format!(
                "{attr} is not an attribute of {}",
                meta.table
            )));
        }

        let sql = format!(
            "SELECT * FROM {} WHERE {} = {}",
            quote(meta.table),
            quote(attr),
            self.db.dialect().placeholder(1)
        );
        let rows = self.db.fetch_all(&sql, std::slice::from_ref(&value)).await?;
        rows.iter().map(hydrate).collect()
    }

    /// Load every row, in primary key order
    ///
    /// # Errors
    ///
    /// Returns `Error::DataAccess` when the query fails.
    pub async fn get_all(&self) -> Result<Vec<E>> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY {}",
            quote(E::META.table),
            quote(E::META.primary_key)
        );
        let rows = self.db.fetch_all(&sql, &[]).await?;
        rows.iter().map(hydrate).collect()
    }

    /// Insert a row built from whitelisted keys of `data`
    ///
    /// The primary key is never taken from input; the generated key is
    /// hydrated into the returned instance along with the filtered input.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` if the input cannot hydrate an entity and
    /// `Error::DataAccess` if the insert fails or does not affect exactly one row.
    pub async fn create(&self, data: &Params) -> Result<E> {
        let meta = E::META;
        let filtered: Params = meta
            .attributes
            .iter()
            .filter(|attr| **attr != meta.primary_key)
            .filter_map(|attr| data.get(*attr).map(|v| ((*attr).to_string(), v.clone())))
            .collect();

        let mut entity: E = hydrate(&filtered)?;

        let columns: Vec<&str> = filtered.keys().map(String::as_str).collect();
        let columns = order_by_whitelist(meta.attributes, &columns);
        let params: Vec<Value> = columns
            .iter()
            .filter_map(|c| filtered.get(*c).cloned())
            .collect();
        let sql = build_insert(&meta, self.db.dialect(), &columns);

        let (affected, key) = self.db.insert(&sql, &params, meta.primary_key).await?;
        if affected != 1 {
            return Err(Error::DataAccess {
                message: format!("insert into {} affected {affected} rows", meta.table),
            });
        }
        debug!(table = meta.table, key = %key, "Record created");

        let generated: Params = [(meta.primary_key.to_string(), key)].into_iter().collect();
        apply(&mut entity, &generated)?;
        Ok(entity)
    }

    /// Update the row of `entity` with whitelisted keys of `data`
    ///
    /// The key comes from the instance, never from `data`. Returns `false`
    /// when nothing was written: no whitelisted column in `data`, or no row
    /// affected. In both cases `entity` is unchanged. On success `entity` is
    /// re-hydrated from `data`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` if `data` cannot hydrate the entity and
    /// `Error::DataAccess` when the statement fails.
    pub async fn update(&self, entity: &mut E, data: &Params) -> Result<bool> {
        let meta = E::META;
        let assignments: Vec<(&str, Value)> = meta
            .attributes
            .iter()
            .filter(|attr| **attr != meta.primary_key)
            .filter_map(|attr| data.get(*attr).map(|v| (*attr, v.clone())))
            .collect();

        if assignments.is_empty() {
            return Ok(false);
        }

        let mut updated = entity.clone();
        let values: Params = assignments
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        apply(&mut updated, &values)?;

        let columns: Vec<&str> = assignments.iter().map(|(k, _)| *k).collect();
        let sql = build_update(&meta, self.db.dialect(), &columns);
        let mut params: Vec<Value> = assignments.into_iter().map(|(_, v)| v).collect();
        params.push(entity.primary_key());

        let affected = self.db.execute(&sql, &params).await?;
        if affected == 0 {
            return Ok(false);
        }

        *entity = updated;
        Ok(true)
    }

    /// Delete the row with primary key `pk`
    ///
    /// # Errors
    ///
    /// Returns `Error::DataAccess` when the statement fails.
    pub async fn delete(&self, pk: impl Into<Value> + Send) -> Result<bool> {
        let pk = pk.into();
        let meta = E::META;
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            quote(meta.table),
            quote(meta.primary_key),
            self.db.dialect().placeholder(1)
        );
        let affected = self.db.execute(&sql, std::slice::from_ref(&pk)).await?;
        Ok(affected > 0)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn order_by_whitelist<'a>(whitelist: &'a [&'a str], columns: &[&str]) -> Vec<&'a str> {
    whitelist
        .iter()
        .copied()
        .filter(|attr| columns.contains(attr))
        .collect()
}

pub(crate) fn build_insert(meta: &EntityMeta, dialect: Dialect, columns: &[&str]) -> String {
    let mut sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote(meta.table))
    } else {
        let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
        let marks: Vec<String> = (1..=columns.len()).map(|i| dialect.placeholder(i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(meta.table),
            names.join(", "),
            marks.join(", ")
        )
    };
    if dialect == Dialect::Postgres {
        sql.push_str(&format!(" RETURNING {}", quote(meta.primary_key)));
    }
    sql
}

/// UPDATE constrained by the primary key alone
pub(crate) fn build_update(meta: &EntityMeta, dialect: Dialect, columns: &[&str]) -> String {
    let sets: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = {}", quote(c), dialect.placeholder(i + 1)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quote(meta.table),
        sets.join(", "),
        quote(meta.primary_key),
        dialect.placeholder(columns.len() + 1)
    )
}
