mod best_solution;
pub use best_solution::{BestSolution, Offer};
