use super::concepts::{FileBasedStorage, StorageError, StorageInterfaceOpen};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use core::marker::PhantomData;

/// Generates a [FileBasedStorage] backed by one serialization format.
///
/// Only the encoder and decoder differ between formats. Opening the storage, naming batch files
/// and the [StorageInterfaceStore](super::StorageInterfaceStore) and
/// [StorageInterfaceLoad](super::StorageInterfaceLoad) implementations are shared.
macro_rules! file_storage {
    (
        $(#[$meta:meta])*
        $name:ident,
        extension: $extension:literal,
        write: $write:path,
        read: $read:path $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Deserialize, Serialize)]
        pub struct $name<Id, Element> {
            path: std::path::PathBuf,
            storage_instance: u64,
            #[serde(skip)]
            phantom: PhantomData<(Id, Element)>,
        }

        impl<Id, Element> FileBasedStorage<Id, Element> for $name<Id, Element> {
            const EXTENSION: &'static str = $extension;

            fn get_path(&self) -> &std::path::Path {
                &self.path
            }

            fn get_storage_instance(&self) -> u64 {
                self.storage_instance
            }

            fn to_writer_pretty<V, W>(&self, writer: W, value: &V) -> Result<(), StorageError>
            where
                V: Serialize,
                W: std::io::Write,
            {
                $write(writer, value)
            }

            fn from_str<V>(&self, input: &str) -> Result<V, StorageError>
            where
                V: DeserializeOwned,
            {
                $read(input)
            }
        }

        impl<Id, Element> StorageInterfaceOpen for $name<Id, Element> {
            fn open_or_create(
                location: &std::path::Path,
                storage_instance: u64,
            ) -> Result<Self, StorageError> {
                std::fs::create_dir_all(location)?;
                Ok(Self {
                    path: location.to_path_buf(),
                    storage_instance,
                    phantom: PhantomData,
                })
            }
        }

        impl<Id, Element> super::StorageInterfaceStore<Id, Element> for $name<Id, Element> {
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
                self.store_batch_to_file(iteration, identifiers_elements)
            }
        }

        impl<Id, Element> super::StorageInterfaceLoad<Id, Element> for $name<Id, Element> {
            fn load_all_elements_at_iteration(
                &self,
                iteration: u64,
            ) -> Result<std::collections::HashMap<Id, Element>, StorageError>
            where
                Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
                Element: Clone + DeserializeOwned,
            {
                self.load_batches_from_files(iteration)
            }

            fn get_all_iterations(&self) -> Result<Vec<u64>, StorageError> {
                FileBasedStorage::<Id, Element>::iterations_from_folders(self)
            }
        }
    };
}

file_storage!(
    /// Save elements as json files with [serde_json].
    JsonStorageInterface,
    extension: "json",
    write: write_json,
    read: read_json,
);

file_storage!(
    /// Save elements as ron files with [ron].
    ///
    /// Records are written with their struct names and arrays are kept on a single line.
    RonStorageInterface,
    extension: "ron",
    write: write_ron,
    read: read_ron,
);

fn write_json<V: Serialize, W: std::io::Write>(writer: W, value: &V) -> Result<(), StorageError> {
    Ok(serde_json::to_writer_pretty(writer, value)?)
}

fn read_json<V: DeserializeOwned>(input: &str) -> Result<V, StorageError> {
    Ok(serde_json::from_str(input)?)
}

/// Pretty printed ron with struct names.
fn write_ron<V: Serialize, W: std::io::Write>(writer: W, value: &V) -> Result<(), StorageError> {
    let config = ron::ser::PrettyConfig::new()
        .struct_names(true)
        .compact_arrays(true)
        .indentor("  ".to_owned());
    Ok(ron::Options::default().to_io_writer_pretty(writer, value, config)?)
}

fn read_ron<V: DeserializeOwned>(input: &str) -> Result<V, StorageError> {
    Ok(ron::de::from_str(input)?)
}
