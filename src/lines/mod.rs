pub mod catenary;
pub mod solver;

pub use catenary::sample_line;
pub use solver::{HandlePositions, LineConstraintSolver, LineSide, LineState, SolveReport};
