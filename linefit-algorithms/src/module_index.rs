//! Module indexing for efficient floor-neighbour lookup.

use std::collections::HashMap;

use linefit_core::error::Result;
use linefit_core::geometry::{Geometry, ModuleKey};
use linefit_core::hit::Hit;

/// Hits grouped by the optical module that recorded them.
///
/// Each module's hits keep their insertion order.
#[derive(Debug)]
pub struct ModuleIndex<T> {
    modules: HashMap<ModuleKey, Vec<T>>,
}

impl<T> Default for ModuleIndex<T> {
    fn default() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }
}

impl<T> ModuleIndex<T> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value for the given module.
    pub fn insert(&mut self, key: ModuleKey, value: T) {
        self.modules.entry(key).or_default().push(value);
    }

    /// Values stored for one module.
    pub fn get(&self, key: &ModuleKey) -> &[T] {
        self.modules.get(key).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if nothing was inserted.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate over `(module, values)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleKey, &Vec<T>)> {
        self.modules.iter()
    }

    /// Query the modules `delta` floors above and below `key`, above first.
    pub fn query_floors(&self, key: ModuleKey, delta: i32) -> impl Iterator<Item = &T> {
        [key.offset(delta), key.offset(-delta)]
            .into_iter()
            .flatten()
            .flat_map(move |neighbour| self.get(&neighbour).iter())
    }
}

impl<H: Hit + Clone> ModuleIndex<H> {
    /// Index hits by the module of their sensor.
    pub fn from_hits<G: Geometry + ?Sized>(hits: &[H], geometry: &G) -> Result<Self> {
        let mut index = Self::new();
        for hit in hits {
            index.insert(geometry.module_of(hit.sensor_id())?, hit.clone());
        }
        Ok(index)
    }
}
