pub use crate::channels::*;
pub use crate::compartments::*;
pub use crate::ions::*;
pub use crate::units;
