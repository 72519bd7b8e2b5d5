//! Adapters implementing domain ports.
//!
//! Infrastructure implementations of the traits defined in [`crate::ports`]:
//! the reference predictor and the weight stores. Adapters depend on ports,
//! not the other way around.

pub mod in_memory_store;
pub mod linear_predictor;
pub mod msgpack_store;

pub use in_memory_store::InMemoryWeightStore;
pub use linear_predictor::LinearPredictor;
pub use msgpack_store::MsgPackWeightStore;
