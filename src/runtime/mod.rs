pub mod processor;
pub mod quantum_state;

pub use processor::{Config, Mode, Processor, Snapshot};
pub use quantum_state::QuantumState;
