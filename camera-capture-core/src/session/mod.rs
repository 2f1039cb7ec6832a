pub mod completion;
pub mod device_state;
pub(crate) mod engine;
pub mod observers;
pub mod orchestrator;
pub(crate) mod queue;
pub mod snapshot;
pub(crate) mod transaction;
