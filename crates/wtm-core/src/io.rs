//! Collaborator interfaces for field input and snapshot output.
//!
//! The solver never touches raster formats directly: an external
//! [`FieldSource`] hands it 2D fields by key, and an external [`FieldSink`]
//! persists wtd snapshots. `MemoryStore` backs both traits with a map, for
//! tests and for callers that assemble fields programmatically.

use std::collections::HashMap;

use crate::error::WtmError;
use crate::field::Field2D;

/// Supplies input fields by key. The shape of the first field a caller
/// loads fixes the grid shape for the whole run.
pub trait FieldSource {
    fn load_field(&self, key: &str) -> Result<Field2D, WtmError>;
}

/// Persists a snapshot of a field under a destination key.
pub trait FieldSink {
    fn save_field(&mut self, field: &Field2D, key: &str) -> Result<(), WtmError>;
}

/// In-memory store implementing both collaborator traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    fields: HashMap<String, Field2D>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, field: Field2D) {
        self.fields.insert(key.into(), field);
    }

    pub fn get(&self, key: &str) -> Option<&Field2D> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldSource for MemoryStore {
    fn load_field(&self, key: &str) -> Result<Field2D, WtmError> {
        self.fields
            .get(key)
            .cloned()
            .ok_or_else(|| WtmError::MissingField(key.to_string()))
    }
}

impl FieldSink for MemoryStore {
    fn save_field(&mut self, field: &Field2D, key: &str) -> Result<(), WtmError> {
        self.fields.insert(key.to_string(), field.clone());
        Ok(())
    }
}
