//! The static type catalog.
//!
//! The catalog is the registry of every [`TypeDefinition`] known to a
//! formatter. It is filled once at startup and shared read-only afterwards;
//! the formatter's metadata resolver flattens definitions out of it.

use std::collections::HashMap;

use thiserror::Error;

use crate::datatypes;
use crate::metadata::TypeDefinition;

/// Errors raised while registering or walking type definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("type '{name}' is already registered")]
    DuplicateType { name: String },

    #[error("type '{name}' is not registered")]
    UnknownType { name: String },

    #[error("type '{name}' extends unregistered type '{supertype}'")]
    UnknownSupertype { name: String, supertype: String },

    #[error("inheritance cycle detected at type '{name}'")]
    InheritanceCycle { name: String },
}

/// Registry of type definitions, keyed by structural name.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, TypeDefinition>,
}

impl TypeCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the core datatypes (ANY, II, CS, CE, ST, BL,
    /// INT, REAL, PQ, TS).
    pub fn with_core_datatypes() -> Self {
        let mut catalog = Self::new();
        for definition in datatypes::core_definitions() {
            // Core names are unique by construction.
            catalog.types.insert(definition.name.clone(), definition);
        }
        catalog
    }

    /// Registers a definition. Supertypes may be registered later; the chain is
    /// only checked when it is walked.
    pub fn register(&mut self, definition: TypeDefinition) -> Result<(), CatalogError> {
        if self.types.contains_key(&definition.name) {
            return Err(CatalogError::DuplicateType {
                name: definition.name,
            });
        }
        self.types.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Builder form of [`TypeCatalog::register`].
    pub fn with(mut self, definition: TypeDefinition) -> Result<Self, CatalogError> {
        self.register(definition)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns all registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the definitions from the hierarchy root down to `name`.
    pub fn supertype_chain(&self, name: &str) -> Result<Vec<&TypeDefinition>, CatalogError> {
        let mut chain = Vec::new();
        let mut current = self.get(name).ok_or_else(|| CatalogError::UnknownType {
            name: name.to_string(),
        })?;

        loop {
            if chain
                .iter()
                .any(|d: &&TypeDefinition| d.name == current.name)
            {
                return Err(CatalogError::InheritanceCycle {
                    name: current.name.clone(),
                });
            }
            chain.push(current);

            let Some(supertype) = current.supertype.as_deref() else {
                break;
            };
            let parent = self
                .get(supertype)
                .ok_or_else(|| CatalogError::UnknownSupertype {
                    name: current.name.clone(),
                    supertype: supertype.to_string(),
                })?;
            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Returns true when a value of type `from` may stand where `to` is
    /// declared (same type or a subtype).
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        self.supertype_chain(from)
            .map(|chain| chain.iter().any(|d| d.name == to))
            .unwrap_or(false)
    }
}
