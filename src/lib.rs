pub mod error;
pub mod implementations;
pub mod io;
pub mod system;

pub use error::{JacobiError, Result};
pub use implementations::partition::{partition_rows, RowRange};
pub use implementations::safe::pool::{JacobiEngine, SolveStats, SolverConfig};
pub use system::{JacobiSolution, LinearSystem, NormalizedSystem};
