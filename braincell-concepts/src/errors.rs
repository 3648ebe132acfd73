use core::fmt::Display;
use std::error::Error;

macro_rules! define_errors {
    ($(($err_name: ident, $err_descr: expr)),+) => {
        $(
            #[doc = $err_descr]
            #[derive(Debug,Clone)]
            pub struct $err_name(
                #[doc = "Error message associated with "]
                #[doc = stringify!($err_name)]
                #[doc = " error type."]
                pub String,
            );

            impl Display for $err_name {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl Error for $err_name {}
        )+
    }
}

define_errors!(
    (SetupError, "Occurs during setup of compartments, morphologies or networks"),
    (CalcError, "General Calculation Error"),
    (
        TimeError,
        "Error related to advancing the simulation time or displaying its progress"
    ),
    (
        IndexError,
        "Can occur internally when information is not present at expected place"
    ),
    (
        RequestError,
        "Ask the wrong object for information and receive this error"
    ),
    (
        HierarchyError,
        "A channel requires an ion species which is not present in its compartment"
    ),
    (
        SolverError,
        "Unknown numerical solver or a solver which cannot integrate the given state"
    )
);

impl From<String> for TimeError {
    fn from(value: String) -> Self {
        TimeError(value)
    }
}

impl From<CalcError> for SetupError {
    fn from(value: CalcError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<HierarchyError> for SetupError {
    fn from(value: HierarchyError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<IndexError> for SetupError {
    fn from(value: IndexError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<SolverError> for CalcError {
    fn from(value: SolverError) -> Self {
        CalcError(format!("{}", value))
    }
}

/// Returned when ions and channels cannot be composed into one membrane.
#[derive(Debug, Clone)]
pub enum CompositionError {
    /// Invalid combination of parameters such as duplicate ion species
    Setup(SetupError),
    /// A channel requires an ion species which was not supplied
    Hierarchy(HierarchyError),
}

impl Display for CompositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CompositionError::Setup(e) => write!(f, "{e}"),
            CompositionError::Hierarchy(e) => write!(f, "{e}"),
        }
    }
}

impl Error for CompositionError {}

impl From<SetupError> for CompositionError {
    fn from(value: SetupError) -> Self {
        CompositionError::Setup(value)
    }
}

impl From<HierarchyError> for CompositionError {
    fn from(value: HierarchyError) -> Self {
        CompositionError::Hierarchy(value)
    }
}

impl From<CompositionError> for SetupError {
    fn from(value: CompositionError) -> Self {
        match value {
            CompositionError::Setup(e) => e,
            CompositionError::Hierarchy(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_message() {
        let err = HierarchyError("channel KCaAhp requires Calcium".to_owned());
        assert_eq!(format!("{err}"), "channel KCaAhp requires Calcium");
    }

    #[test]
    fn convert_to_setup_error() {
        fn fails() -> Result<(), SetupError> {
            Err(HierarchyError("missing".to_owned()))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert_eq!(err.0, "missing");
    }
}
