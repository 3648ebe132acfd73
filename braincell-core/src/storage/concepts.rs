use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
pub use uniquevec::UniqueVec;

use super::memory_storage::MemoryStorageInterface;
use super::file_formats::{JsonStorageInterface, RonStorageInterface};

/// Error related to storing and reading elements
#[derive(Debug)]
pub enum StorageError {
    /// Error related to File Io operations.
    IoError(std::io::Error),
    /// Occurs during parsing of json structs.
    SerdeJsonError(serde_json::Error),
    /// Occurs when writing ron files.
    RonError(ron::Error),
    /// Occurs when parsing ron files.
    RonSpannedError(ron::error::SpannedError),
    /// Initialization error when a storage option was called but not opened.
    InitError(String),
    /// Error when parsing file/folder names.
    ParseIntError(std::num::ParseIntError),
    /// The lock of the memory storage was poisoned by a panicking thread.
    PoisonError(String),
}

macro_rules! impl_from_storage_error {
    ($(($variant: ident, $err_type: ty)),+) => {
        $(
            impl From<$err_type> for StorageError {
                fn from(err: $err_type) -> Self {
                    StorageError::$variant(err)
                }
            }
        )+
    }
}

impl_from_storage_error!(
    (IoError, std::io::Error),
    (SerdeJsonError, serde_json::Error),
    (RonError, ron::Error),
    (RonSpannedError, ron::error::SpannedError),
    (ParseIntError, std::num::ParseIntError)
);

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StorageError::PoisonError(format!("{err}"))
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::IoError(message) => write!(f, "{}", message),
            StorageError::SerdeJsonError(message) => write!(f, "{}", message),
            StorageError::RonError(message) => write!(f, "{}", message),
            StorageError::RonSpannedError(message) => write!(f, "{}", message),
            StorageError::InitError(message) => write!(f, "{}", message),
            StorageError::ParseIntError(message) => write!(f, "{}", message),
            StorageError::PoisonError(message) => write!(f, "{}", message),
        }
    }
}

impl Error for StorageError {}

/// Define how to store results of the simulation.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum StorageOption {
    /// Keep results in memory. They are lost when the program exits.
    Memory,
    /// Save results as [json](https://www.json.org/json-en.html) files.
    SerdeJson,
    /// Save results as [ron](https://github.com/ron-rs/ron) files.
    Ron,
}

impl StorageOption {
    /// Which storage option should be used by default.
    pub fn default_priority() -> UniqueVec<Self> {
        UniqueVec::from_iter([StorageOption::SerdeJson]).0
    }
}

/// Define how elements and identifiers are saved when being serialized together.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CombinedSaveFormat<Id, Element> {
    /// Identifier of the element
    pub identifier: Id,
    /// The stored element
    pub element: Element,
}

/// Define how batches of elements and identifiers are saved when being serialized.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BatchSaveFormat<Id, Element> {
    /// All stored pairs of identifiers and elements
    pub data: Vec<CombinedSaveFormat<Id, Element>>,
}

/// Configures where and in which formats a [StorageManager] records neuron traces.
///
/// The builder can be edited until [StorageBuilder::init] fixes the date folder.
///
/// ```
/// use braincell_core::storage::{StorageBuilder, StorageOption};
///
/// let builder = StorageBuilder::new()
///     .priority([StorageOption::Ron, StorageOption::SerdeJson])
///     .location("./traces")
///     .suffix("hodgkin_huxley");
/// assert_eq!(builder.get_priority().len(), 2);
/// let path = builder.init().get_full_path();
/// assert!(path.starts_with("./traces"));
/// assert!(path.ends_with("hodgkin_huxley"));
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StorageBuilder<const INIT: bool = false> {
    location: std::path::PathBuf,
    priority: UniqueVec<StorageOption>,
    suffix: std::path::PathBuf,
    #[cfg(feature = "timestamp")]
    add_date: bool,
    #[cfg(feature = "timestamp")]
    date: std::path::PathBuf,
}

// Field-wise equality, equivalent to `#[derive(PartialEq)]`; written by hand
// because `UniqueVec` does not implement `PartialEq`.
impl<const INIT: bool> PartialEq for StorageBuilder<INIT> {
    fn eq(&self, other: &Self) -> bool {
        let eq = self.location == other.location
            && *self.priority == *other.priority
            && self.suffix == other.suffix;
        #[cfg(feature = "timestamp")]
        let eq = eq && self.add_date == other.add_date && self.date == other.date;
        eq
    }
}

impl<const INIT: bool> StorageBuilder<INIT> {
    /// Define the priority of [StorageOption]. See [StorageOption::default_priority].
    pub fn priority(self, priority: impl IntoIterator<Item = StorageOption>) -> Self {
        let (priority, _) = UniqueVec::from_iter(priority);
        Self { priority, ..self }
    }

    /// Get the current priority
    pub fn get_priority(&self) -> UniqueVec<StorageOption> {
        self.priority.clone()
    }

    /// Define a suffix which will be appended to the save path
    pub fn suffix(self, suffix: impl Into<std::path::PathBuf>) -> Self {
        Self {
            suffix: suffix.into(),
            ..self
        }
    }

    /// Store results by their current date inside the specified folder path
    #[cfg(feature = "timestamp")]
    pub fn add_date(self, add_date: bool) -> Self {
        Self { add_date, ..self }
    }
}

impl Default for StorageBuilder<false> {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBuilder<false> {
    /// Json files under `./out` inside a date folder.
    pub fn new() -> Self {
        Self {
            location: "./out".into(),
            priority: StorageOption::default_priority(),
            suffix: "".into(),
            #[cfg(feature = "timestamp")]
            add_date: true,
            #[cfg(feature = "timestamp")]
            date: "".into(),
        }
    }

    /// Fixes the date folder, if enabled, so that the path can no longer change.
    pub fn init(self) -> StorageBuilder<true> {
        #[cfg(feature = "timestamp")]
        let date: std::path::PathBuf = if self.add_date {
            format!("{}", chrono::Local::now().format("%Y-%m-%d-T%H-%M-%S")).into()
        } else {
            "".into()
        };
        #[cfg(not(feature = "timestamp"))]
        let date: std::path::PathBuf = "".into();
        self.init_with_date(&date)
    }

    /// Like [StorageBuilder::init] but with a given date folder.
    #[allow(unused)]
    pub fn init_with_date(self, date: &std::path::Path) -> StorageBuilder<true> {
        StorageBuilder::<true> {
            location: self.location,
            priority: self.priority,
            suffix: self.suffix,
            #[cfg(feature = "timestamp")]
            add_date: self.add_date,
            #[cfg(feature = "timestamp")]
            date: date.into(),
        }
    }

    /// Define a folder where to store results
    ///
    /// Note that this functionality is only available as long as the [StorageBuilder] has not been
    /// initialized.
    pub fn location<P>(self, location: P) -> Self
    where
        std::path::PathBuf: From<P>,
    {
        Self {
            location: location.into(),
            ..self
        }
    }
}

impl StorageBuilder<true> {
    /// Get the fully constructed path after the Builder has been initialized with the
    /// [StorageBuilder::init] function.
    pub fn get_full_path(&self) -> std::path::PathBuf {
        let mut full_path = self.location.clone();
        #[cfg(feature = "timestamp")]
        if self.add_date {
            full_path.extend(&self.date);
        }
        full_path.extend(&self.suffix);
        full_path
    }

    #[doc(hidden)]
    pub fn init(self) -> Self {
        self
    }
}

/// This manager handles if multiple storage options have been specified.
///
/// Elements are stored in every opened storage while they are loaded from the one with the
/// highest priority.
#[derive(Clone, Debug)]
pub struct StorageManager<Id, Element> {
    storage_priority: UniqueVec<StorageOption>,
    builder: StorageBuilder<true>,

    memory_storage: Option<MemoryStorageInterface<Id, Element>>,
    json_storage: Option<JsonStorageInterface<Id, Element>>,
    ron_storage: Option<RonStorageInterface<Id, Element>>,
}

impl<Id, Element> StorageManager<Id, Element> {
    /// Constructs the [StorageManager] from the instance identifier
    /// and the settings given by the [StorageBuilder].
    ///
    /// ```
    /// use braincell_core::storage::*;
    /// let builder = StorageBuilder::new()
    ///     .priority([StorageOption::Memory])
    ///     .init();
    ///
    /// let manager = StorageManager::<usize, f64>::open_or_create(builder, 0)?;
    /// # Ok::<(), StorageError>(())
    /// ```
    pub fn open_or_create(
        storage_builder: StorageBuilder<true>,
        instance: u64,
    ) -> Result<Self, StorageError> {
        let location = storage_builder.get_full_path();

        let mut memory_storage = None;
        let mut json_storage = None;
        let mut ron_storage = None;
        for storage_variant in storage_builder.priority.iter() {
            match storage_variant {
                StorageOption::Memory => {
                    memory_storage = Some(MemoryStorageInterface::open_or_create(
                        &location.join("memory"),
                        instance,
                    )?);
                }
                StorageOption::SerdeJson => {
                    json_storage = Some(JsonStorageInterface::open_or_create(
                        &location.join("json"),
                        instance,
                    )?);
                }
                StorageOption::Ron => {
                    ron_storage = Some(RonStorageInterface::open_or_create(
                        &location.join("ron"),
                        instance,
                    )?);
                }
            }
        }
        Ok(StorageManager {
            storage_priority: storage_builder.priority.clone(),
            builder: storage_builder,

            memory_storage,
            json_storage,
            ron_storage,
        })
    }

    /// Extracts all information given by the [StorageBuilder] when constructing
    pub fn extract_builder(&self) -> StorageBuilder<true> {
        self.builder.clone()
    }}

macro_rules! exec_for_all_storage_options(
    (@internal $self:ident, $storage_option:ident, $field:ident, $function:ident, $($args:tt)*) => {
        {
            if let Some($field) = &$self.$field {
                $field.$function($($args)*)
            } else {
                Err(StorageError::InitError(
                    stringify!($storage_option, " storage was not initialized but called").into(),
                ))
            }
        }
    };
    ($self:ident, $priority:ident, $function:ident, $($args:tt)*) => {
        match $priority {
            StorageOption::Memory => exec_for_all_storage_options!(@internal $self, Memory, memory_storage, $function, $($args)*),
            StorageOption::SerdeJson => exec_for_all_storage_options!(@internal $self, SerdeJson, json_storage, $function, $($args)*),
            StorageOption::Ron => exec_for_all_storage_options!(@internal $self, Ron, ron_storage, $function, $($args)*),
        }
    }
);

impl<Id, Element> StorageInterfaceStore<Id, Element> for StorageManager<Id, Element> {
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
        if let Some(memory_storage) = &self.memory_storage {
            memory_storage.store_batch_elements(iteration, identifiers_elements.clone())?;
        }
        if let Some(json_storage) = &self.json_storage {
            json_storage.store_batch_elements(iteration, identifiers_elements.clone())?;
        }
        if let Some(ron_storage) = &self.ron_storage {
            ron_storage.store_batch_elements(iteration, identifiers_elements)?;
        }
        Ok(())
    }
}

impl<Id, Element> StorageInterfaceLoad<Id, Element> for StorageManager<Id, Element> {
    fn load_all_elements_at_iteration(
        &self,
        iteration: u64,
    ) -> Result<HashMap<Id, Element>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned,
    {
        match self.storage_priority.first() {
            Some(priority) => exec_for_all_storage_options!(
                self,
                priority,
                load_all_elements_at_iteration,
                iteration
            ),
            None => Ok(HashMap::new()),
        }
    }

    fn get_all_iterations(&self) -> Result<Vec<u64>, StorageError> {
        match self.storage_priority.first() {
            Some(priority) => exec_for_all_storage_options!(self, priority, get_all_iterations,),
            None => Ok(Vec::new()),
        }
    }
}

/// Open or create a new instance of the Storage controller.
pub trait StorageInterfaceOpen {
    /// Initializes the current storage device.
    ///
    /// When saving as files, folders might be created.
    fn open_or_create(
        location: &std::path::Path,
        storage_instance: u64,
    ) -> Result<Self, StorageError>
    where
        Self: Sized;
}

/// Handles storing of elements
pub trait StorageInterfaceStore<Id, Element> {
    /// Saves a single element at given iteration.
    fn store_single_element(
        &self,
        iteration: u64,
        identifier: &Id,
        element: &Element,
    ) -> Result<(), StorageError>
    where
        Id: Serialize + DeserializeOwned + Clone + std::hash::Hash + Eq,
        Element: Serialize + DeserializeOwned + Clone,
    {
        self.store_batch_elements(iteration, [(identifier, element)])
    }

    /// Stores a batch of multiple elements with identifiers all at the same iteration.
    ///
    /// Elements which were already stored at this iteration under the same identifier are
    /// replaced.
    fn store_batch_elements<'a, I>(
        &'a self,
        iteration: u64,
        identifiers_elements: I,
    ) -> Result<(), StorageError>
    where
        Id: 'a + Serialize + DeserializeOwned + Clone + std::hash::Hash + Eq,
        Element: 'a + Serialize + DeserializeOwned + Clone,
        I: Clone + IntoIterator<Item = (&'a Id, &'a Element)>;
}

/// Handles loading of elements
pub trait StorageInterfaceLoad<Id, Element> {
    /// Loads a single element from the storage solution if the element exists.
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
            .load_all_elements_at_iteration(iteration)?
            .remove(identifier))
    }

    /// Loads the elements history, meaning every occurrence of the element in the storage.
    /// The results are ordered by iteration.
    fn load_element_history(
        &self,
        identifier: &Id,
    ) -> Result<BTreeMap<u64, Element>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned,
    {
        self.get_all_iterations()?
            .into_iter()
            .filter_map(
                |iteration| match self.load_single_element(iteration, identifier) {
                    Ok(Some(element)) => Some(Ok((iteration, element))),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                },
            )
            .collect()
    }

    /// Gets a snapshot of all elements at a given iteration.
    fn load_all_elements_at_iteration(
        &self,
        iteration: u64,
    ) -> Result<HashMap<Id, Element>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned;

    /// Get all iteration values which have been saved in ascending order.
    fn get_all_iterations(&self) -> Result<Vec<u64>, StorageError>;

    /// Loads all elements for every iteration.
    /// This will yield the complete storage and may result in extremely large allocations of
    /// memory.
    fn load_all_elements(&self) -> Result<BTreeMap<u64, HashMap<Id, Element>>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned,
    {
        self.get_all_iterations()?
            .into_iter()
            .map(|iteration| {
                let elements = self.load_all_elements_at_iteration(iteration)?;
                Ok((iteration, elements))
            })
            .collect()
    }

    /// Similarly to the [load_all_elements](StorageInterfaceLoad::load_all_elements) function,
    /// but this function returns all elements as their histories.
    fn load_all_element_histories(
        &self,
    ) -> Result<HashMap<Id, BTreeMap<u64, Element>>, StorageError>
    where
        Id: std::hash::Hash + Eq + Clone + DeserializeOwned,
        Element: Clone + DeserializeOwned,
    {
        let all_elements = self.load_all_elements()?;
        Ok(all_elements
            .into_iter()
            .flat_map(|(iteration, identifier_to_elements)| {
                identifier_to_elements
                    .into_iter()
                    .map(move |(identifier, element)| (identifier, iteration, element))
            })
            .fold(
                HashMap::new(),
                |mut acc: HashMap<Id, BTreeMap<u64, Element>>, (identifier, iteration, element)| {
                    acc.entry(identifier).or_default().insert(iteration, element);
                    acc
                },
            ))
    }
}

/// Storage which writes one file per iteration and instance.
///
/// The files are laid out as `<path>/<iteration:020>/batch_<instance:020>.<EXTENSION>`.
pub trait FileBasedStorage<Id, Element> {
    /// File extension such as `json`
    const EXTENSION: &'static str;

    /// Folder in which all iterations are stored
    fn get_path(&self) -> &std::path::Path;

    /// Instance which is used to name batch files
    fn get_storage_instance(&self) -> u64;

    /// Serializes the value into the writer.
    fn to_writer_pretty<V, W>(&self, writer: W, value: &V) -> Result<(), StorageError>
    where
        V: Serialize,
        W: std::io::Write;

    /// Deserializes a value from the given string.
    fn from_str<V>(&self, input: &str) -> Result<V, StorageError>
    where
        V: DeserializeOwned;

    /// Folder of the given iteration
    fn get_iteration_path(&self, iteration: u64) -> std::path::PathBuf {
        self.get_path().join(format!("{:020.0}", iteration))
    }

    /// File of the batch written by this instance at the given iteration
    fn get_iteration_save_path_batch(&self, iteration: u64) -> std::path::PathBuf {
        self.get_iteration_path(iteration)
            .join(format!("batch_{:020.0}", self.get_storage_instance()))
            .with_extension(Self::EXTENSION)
    }

    /// Reads one batch file.
    fn read_batch(&self, path: &std::path::Path) -> Result<BatchSaveFormat<Id, Element>, StorageError>
    where
        Id: DeserializeOwned,
        Element: DeserializeOwned,
    {
        let contents = std::fs::read_to_string(path)?;
        self.from_str(&contents)
    }

    /// Converts the name of an iteration folder back to its iteration.
    fn folder_name_to_iteration(
        &self,
        file: &std::path::Path,
    ) -> Result<Option<u64>, StorageError> {
        match file.file_stem().and_then(|stem| stem.to_str()) {
            Some(filename) => Ok(Some(filename.parse::<u64>()?)),
            None => Ok(None),
        }
    }

    /// Merges the given elements into the batch file of this instance at the given iteration.
    fn store_batch_to_file<'a, I>(
        &'a self,
        iteration: u64,
        identifiers_elements: I,
    ) -> Result<(), StorageError>
    where
        Id: 'a + Serialize + DeserializeOwned + Clone + PartialEq,
        Element: 'a + Serialize + DeserializeOwned + Clone,
        I: IntoIterator<Item = (&'a Id, &'a Element)>,
    {
        std::fs::create_dir_all(self.get_iteration_path(iteration))?;
        let save_path = self.get_iteration_save_path_batch(iteration);
        let mut batch = if save_path.is_file() {
            self.read_batch(&save_path)?
        } else {
            BatchSaveFormat { data: Vec::new() }
        };
        for (identifier, element) in identifiers_elements.into_iter() {
            match batch.data.iter_mut().find(|c| c.identifier == *identifier) {
                Some(existing) => existing.element = element.clone(),
                None => batch.data.push(CombinedSaveFormat {
                    identifier: identifier.clone(),
                    element: element.clone(),
                }),
            }
        }
        let file = std::fs::File::create(&save_path)?;
        self.to_writer_pretty(std::io::BufWriter::new(file), &batch)
    }

    /// Reads all batch files of every instance at the given iteration.
    fn load_batches_from_files(&self, iteration: u64) -> Result<HashMap<Id, Element>, StorageError>
    where
        Id: std::hash::Hash + Eq + DeserializeOwned,
        Element: DeserializeOwned,
    {
        let iteration_path = self.get_iteration_path(iteration);
        let mut all_elements_at_iteration = HashMap::new();
        if !iteration_path.is_dir() {
            return Ok(all_elements_at_iteration);
        }
        for path in std::fs::read_dir(&iteration_path)? {
            let p = path?.path();
            let is_batch = p
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.starts_with("batch_"));
            if is_batch {
                let batch = self.read_batch(&p)?;
                all_elements_at_iteration.extend(
                    batch
                        .data
                        .into_iter()
                        .map(|save_format| (save_format.identifier, save_format.element)),
                );
            }
        }
        Ok(all_elements_at_iteration)
    }

    /// All iterations for which a folder exists in ascending order.
    fn iterations_from_folders(&self) -> Result<Vec<u64>, StorageError> {
        let mut iterations = std::fs::read_dir(self.get_path())?
            .filter_map(|path| match path {
                Ok(p) if p.path().is_dir() => self.folder_name_to_iteration(&p.path()).transpose(),
                _ => None,
            })
            .collect::<Result<Vec<_>, _>>()?;
        iterations.sort();
        Ok(iterations)
    }
}
