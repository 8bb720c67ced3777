// Pending-candidate ranking.
// `engine` is the pure ordering algorithm; `store` owns all review state and
// decides when the ordering is recomputed.

pub mod engine;
pub mod store;
