pub mod payload_queue;
pub mod pending_queue;
pub mod reassembly_queue;
