use super::concepts::StorageError;
use super::concepts::{StorageInterfaceLoad, StorageInterfaceOpen, StorageInterfaceStore};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use std::collections::{BTreeMap, HashMap};

/// Keeps all results in memory.
///
/// Clones share the same underlying map such that results written by one handle can be read by
/// all others.
#[derive(Clone, Debug)]
pub struct MemoryStorageInterface<Id, Element> {
    map: Arc<Mutex<BTreeMap<u64, HashMap<Id, Element>>>>,
}

impl<Id, Element> StorageInterfaceOpen for MemoryStorageInterface<Id, Element> {
    fn open_or_create(
        _location: &std::path::Path,
        _storage_instance: u64,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            map: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }
}

impl<Id, Element> StorageInterfaceStore<Id, Element> for MemoryStorageInterface<Id, Element> {
    fn store_batch_elements<'a, I>(
        &'a self,
        iteration: u64,
        identifiers_elements: I,
    ) -> Result<(), StorageError>
    where
        Id: 'a + Serialize + DeserializeOwned + Clone + std::hash::Hash + Eq,
        Element: 'a + Serialize + DeserializeOwned + Clone,
        I: Clone + IntoIterator<Item = (&'a Id, &'a Element)>,
    {
        self.map
            .lock()?
            .entry(iteration)
            .or_default()
            .extend(
                identifiers_elements
                    .into_iter()
                    .map(|(id, el)| (id.clone(), el.clone())),
            );
        Ok(())
    }
}

impl<Id, Element> StorageInterfaceLoad<Id, Element> for MemoryStorageInterface<Id, Element> {
    fn load_single_element(
        &self,
        iteration: u64,
        identifier: &Id,
    ) -> Result<Option<Element>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned,
    {
        Ok(self
            .map
            .lock()?
            .get(&iteration)
            .and_then(|elements| elements.get(identifier).cloned()))
    }

    fn load_all_elements_at_iteration(
        &self,
        iteration: u64,
    ) -> Result<HashMap<Id, Element>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned,
    {
        Ok(self
            .map
            .lock()?
            .get(&iteration)
            .cloned()
            .unwrap_or_default())
    }

    fn load_all_elements(&self) -> Result<BTreeMap<u64, HashMap<Id, Element>>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned,
    {
        Ok(self.map.lock()?.clone())
    }

    fn get_all_iterations(&self) -> Result<Vec<u64>, StorageError> {
        Ok(self.map.lock()?.keys().copied().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clones_share_results() -> Result<(), StorageError> {
        let storage =
            MemoryStorageInterface::<usize, f64>::open_or_create(std::path::Path::new(""), 0)?;
        let other = storage.clone();
        storage.store_batch_elements(3, [(&0, &1.5), (&1, &-2.0)])?;
        other.store_single_element(1, &4, &0.25)?;
        assert_eq!(storage.get_all_iterations()?, vec![1, 3]);
        assert_eq!(other.load_single_element(3, &1)?, Some(-2.0));
        assert_eq!(storage.load_single_element(3, &4)?, None);
        Ok(())
    }
}
