pub mod backpressure;
pub mod resumability;
pub mod scheduler_contract;
