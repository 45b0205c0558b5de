//! Type metadata resolution.
//!
//! The [`MetadataResolver`] flattens a type's definition chain from the
//! [`TypeCatalog`] into a single ordered property list, the
//! [`TypeDescriptor`], and caches the result for the lifetime of the
//! formatter.
//!
//! # Ordering
//!
//! ITS 1.0 schemas are order sensitive. A descriptor lists every attribute
//! before any element and every element before any association. Within a
//! role, properties of a supertype precede those of its subtypes, and within
//! one level they are sorted by ascending sort key (declaration order breaks
//! ties).

use std::collections::HashMap;
use std::sync::Arc;

use helios_hl7v3::{PropertyDescriptor, PropertyRole, TypeCatalog};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{ItsError, Result};

/// The resolved, fully ordered wire layout of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    entry_point: bool,
    is_abstract: bool,
    chain: Vec<String>,
    properties: Vec<PropertyDescriptor>,
    dropped_fields: Vec<String>,
}

impl TypeDescriptor {
    /// Structural name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// May the type appear as a document root.
    pub fn is_entry_point(&self) -> bool {
        self.entry_point
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Type names from the hierarchy root down to this type.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// All wire-mapped properties, in emission order.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Fields declared without wire metadata.
    pub fn dropped_fields(&self) -> &[String] {
        &self.dropped_fields
    }

    /// Attribute properties, in emission order.
    pub fn attributes(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties
            .iter()
            .filter(|p| p.role == PropertyRole::Attribute)
    }

    /// Element and association properties, in emission order.
    pub fn children(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties
            .iter()
            .filter(|p| p.role != PropertyRole::Attribute)
    }

    /// Finds the attribute property carried under `name`.
    pub fn attribute(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.attributes().find(|p| p.name == name)
    }

    /// Finds the element or association property an element called `name`
    /// belongs to.
    pub fn element(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.children().find(|p| p.matches_element(name))
    }
}

/// Flattens and caches [`TypeDescriptor`]s.
///
/// Lookups take a shared lock. A descriptor is computed outside the lock on
/// first use; when two threads race, both compute it and the entry written
/// first is kept. Cached entries are never replaced.
#[derive(Debug)]
pub struct MetadataResolver {
    catalog: Arc<TypeCatalog>,
    cache: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
}

impl MetadataResolver {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            catalog,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Returns the descriptor of `type_name`, computing it on first use.
    pub fn resolve(&self, type_name: &str) -> Result<Arc<TypeDescriptor>> {
        if let Some(descriptor) = self.cache.read().get(type_name) {
            return Ok(Arc::clone(descriptor));
        }

        let descriptor = Arc::new(self.flatten(type_name)?);
        let mut cache = self.cache.write();
        let entry = cache
            .entry(type_name.to_string())
            .or_insert_with(|| descriptor);
        debug!(
            type_name,
            properties = entry.properties.len(),
            dropped = entry.dropped_fields.len(),
            "Cached type descriptor"
        );
        Ok(Arc::clone(entry))
    }

    /// Returns true when `from` may stand where `to` is declared.
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        self.catalog.is_assignable(from, to)
    }

    /// Number of cached descriptors.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    fn flatten(&self, type_name: &str) -> Result<TypeDescriptor> {
        let definition = self
            .catalog
            .get(type_name)
            .ok_or_else(|| ItsError::UnknownType {
                name: type_name.to_string(),
                path: String::new(),
            })?;
        let chain = self.catalog.supertype_chain(type_name)?;

        // (role, level, sort key) orders the flattened list; the sort is
        // stable, so declaration order breaks remaining ties.
        let mut ordered: Vec<(PropertyRole, usize, i32, &PropertyDescriptor)> = Vec::new();
        let mut dropped_fields = Vec::new();
        for (level, definition) in chain.iter().enumerate() {
            for field in &definition.fields {
                match &field.metadata {
                    Some(property) => {
                        ordered.push((property.role, level, property.sort_key, property))
                    }
                    None => dropped_fields.push(field.name.clone()),
                }
            }
        }
        ordered.sort_by_key(|(role, level, sort_key, _)| (*role, *level, *sort_key));

        debug!(
            type_name,
            levels = chain.len(),
            "Resolved type metadata"
        );

        Ok(TypeDescriptor {
            name: definition.name.clone(),
            entry_point: definition.entry_point,
            is_abstract: definition.is_abstract,
            chain: chain.iter().map(|d| d.name.clone()).collect(),
            properties: ordered.into_iter().map(|(.., p)| p.clone()).collect(),
            dropped_fields,
        })
    }
}
