pub use braincell_building_blocks::prelude::*;
pub use braincell_concepts::*;

pub use braincell_core::network::*;
pub use braincell_core::simulation::*;
pub use braincell_core::solvers::*;
pub use braincell_core::storage::*;
pub use braincell_core::time::*;
pub use braincell_core::SimulationError;
