pub mod context;
pub mod error;
pub mod pdb_control;
pub mod reconciler;
pub mod store;
pub mod validation;

pub use context::{Context, FailureTracker};
pub use error::{BackoffConfig, Error, Result};
pub use pdb_control::{PdbAction, PodDisruptionBudgetControl};
pub use reconciler::{error_policy, reconcile, requeue_delay};
pub use store::{KubePdbStore, PdbStore};
pub use validation::{MAX_PRIMARIES, MAX_REPLICATION_FACTOR, MIN_PRIMARIES, validate_spec};
