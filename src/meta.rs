//! Entity metadata resolution.
//!
//! The translator consumes metadata as a pure lookup service: logical field
//! names map to physical columns, logical entities map to one or more
//! physical (possibly sharded) tables. [`Catalog`] is a ready in-memory
//! implementation; callers with their own metadata store implement
//! [`Metadata`] directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Value, WireType};
use crate::error::{RelqError, RelqResult};

/// A resolved physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalField {
    pub column: String,
    pub wire_type: WireType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub shard_key: bool,
    /// Name of a dialect formatter applied wherever the field appears in a
    /// comparison (e.g. "length").
    pub formatter: Option<String>,
    pub size: Option<u32>,
}

/// Pure lookup service mapping the logical model to physical names.
pub trait Metadata {
    fn resolve_field(&self, entity: &str, logical: &str) -> RelqResult<PhysicalField>;

    /// Physical tables backing an entity, narrowed by a shard value when
    /// given. Fails when the entity maps to no table at all.
    fn resolve_tables(&self, entity: &str, shard: Option<&Value>) -> RelqResult<Vec<String>>;

    /// Declared relation field pairs (left entity field, right entity field).
    fn relation_fields(&self, left: &str, right: &str) -> Vec<(String, String)>;

    fn primary_keys(&self, entity: &str) -> Vec<String>;

    /// Ordered logical field names of an entity.
    fn entity_fields(&self, entity: &str) -> Vec<String>;
}

/// One field definition inside an [`EntityDef`].
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    column: String,
    wire_type: WireType,
    primary_key: bool,
    auto_increment: bool,
    shard_key: bool,
    formatter: Option<String>,
    size: Option<u32>,
}

impl FieldDef {
    pub fn new(name: &str, wire_type: WireType) -> Self {
        Self {
            name: name.to_string(),
            column: name.to_string(),
            wire_type,
            primary_key: false,
            auto_increment: false,
            shard_key: false,
            formatter: None,
            size: None,
        }
    }

    /// Physical column name, when it differs from the logical name.
    pub fn column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn shard_key(mut self) -> Self {
        self.shard_key = true;
        self
    }

    pub fn formatter(mut self, name: &str) -> Self {
        self.formatter = Some(name.to_string());
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    fn physical(&self) -> PhysicalField {
        PhysicalField {
            column: self.column.clone(),
            wire_type: self.wire_type,
            primary_key: self.primary_key,
            auto_increment: self.auto_increment,
            shard_key: self.shard_key,
            formatter: self.formatter.clone(),
            size: self.size,
        }
    }
}

/// One logical entity with its backing tables and fields.
#[derive(Debug, Clone)]
pub struct EntityDef {
    name: String,
    tables: Vec<String>,
    fields: Vec<FieldDef>,
}

impl EntityDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Add a backing table. Call repeatedly for sharded entities.
    pub fn table(mut self, table: &str) -> Self {
        self.tables.push(table.to_string());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// In-memory metadata registry.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: HashMap<String, EntityDef>,
    relations: HashMap<(String, String), Vec<(String, String)>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.insert(def.name.clone(), def);
        self
    }

    /// Declare a relation field pair between two entities. Registered in
    /// both directions.
    pub fn relation(mut self, left: &str, left_field: &str, right: &str, right_field: &str) -> Self {
        self.relations
            .entry((left.to_string(), right.to_string()))
            .or_default()
            .push((left_field.to_string(), right_field.to_string()));
        self.relations
            .entry((right.to_string(), left.to_string()))
            .or_default()
            .push((right_field.to_string(), left_field.to_string()));
        self
    }
}

impl Metadata for Catalog {
    fn resolve_field(&self, entity: &str, logical: &str) -> RelqResult<PhysicalField> {
        self.entities
            .get(entity)
            .and_then(|e| e.fields.iter().find(|f| f.name == logical))
            .map(FieldDef::physical)
            .ok_or_else(|| RelqError::Resolution {
                entity: entity.to_string(),
                field: logical.to_string(),
            })
    }

    fn resolve_tables(&self, entity: &str, shard: Option<&Value>) -> RelqResult<Vec<String>> {
        let def = self
            .entities
            .get(entity)
            .ok_or_else(|| RelqError::TableResolution {
                entity: entity.to_string(),
            })?;
        if def.tables.is_empty() {
            return Err(RelqError::TableResolution {
                entity: entity.to_string(),
            });
        }
        // Integer shard values partition by modulo; anything else keeps the
        // full table list.
        match shard {
            Some(Value::Int(n)) if def.tables.len() > 1 => {
                let idx = (*n).rem_euclid(def.tables.len() as i64) as usize;
                Ok(vec![def.tables[idx].clone()])
            }
            _ => Ok(def.tables.clone()),
        }
    }

    fn relation_fields(&self, left: &str, right: &str) -> Vec<(String, String)> {
        self.relations
            .get(&(left.to_string(), right.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn primary_keys(&self, entity: &str) -> Vec<String> {
        self.entities
            .get(entity)
            .map(|e| {
                e.fields
                    .iter()
                    .filter(|f| f.primary_key)
                    .map(|f| f.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn entity_fields(&self, entity: &str) -> Vec<String> {
        self.entities
            .get(entity)
            .map(|e| e.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }
}
