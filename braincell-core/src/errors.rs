pub use crate::storage::StorageError;
use braincell_concepts::*;
use core::fmt::Display;

macro_rules! impl_error_variant {
    ($name: ident, $($err_var: ident),+) => {
        // Implement Display for ErrorVariant
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$err_var(message) => write!(f, "{}", message),
                    )+
                }
            }
        }
    }
}

macro_rules! impl_from_error {
    ($name: ident, $(($err_var: ident, $err_type: ty)),+) => {
        $(
            // Implement conversion from error to errorvariant
            impl From<$err_type> for $name {
                fn from(err: $err_type) -> Self {
                    $name::$err_var(err)
                }
            }
        )+
    }
}

/// Covers all errors that can occur in this Simulation
///
/// The errors are listed from very likely to be a user error from almost certainly an internal
/// error.
#[derive(Debug)]
pub enum SimulationError {
    // Very likely to be user errors
    /// Numerical evaluation of a model failed
    CalcError(CalcError),
    /// Invalid composition of compartments, channels or networks
    SetupError(SetupError),
    /// Invalid time configuration
    TimeError(TimeError),
    /// Unknown or unsupported solver
    SolverError(SolverError),
    /// Requested information which is not available
    RequestError(RequestError),

    // Less likely but possible to be user errors
    /// Writing or reading results failed
    StorageError(StorageError),

    // Highly unlikely to be user errors
    /// Information is not present at the expected place
    IndexError(IndexError),
    /// File Io operations failed
    IoError(std::io::Error),
    /// The thread pool could not be built
    ThreadingError(rayon::ThreadPoolBuildError),
}

impl_from_error! {SimulationError,
    (CalcError, CalcError),
    (SetupError, SetupError),
    (TimeError, TimeError),
    (SolverError, SolverError),
    (RequestError, RequestError),
    (StorageError, StorageError),
    (IndexError, IndexError),
    (IoError, std::io::Error),
    (ThreadingError, rayon::ThreadPoolBuildError)
}

impl_error_variant! {SimulationError,
    CalcError,
    SetupError,
    TimeError,
    SolverError,
    RequestError,
    StorageError,
    IndexError,
    IoError,
    ThreadingError
}

// Implement the general error property
impl std::error::Error for SimulationError {}

impl From<HierarchyError> for SimulationError {
    fn from(err: HierarchyError) -> Self {
        SimulationError::SetupError(err.into())
    }
}

impl From<CompositionError> for SimulationError {
    fn from(err: CompositionError) -> Self {
        SimulationError::SetupError(err.into())
    }
}
