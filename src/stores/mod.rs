//! Store seams for policies and claim records
//!
//! The core reads community policies and claim records through these traits;
//! production wires the MongoDB implementations, tests wire the in-memory
//! ones.

mod claims;
mod memory;
mod policy;

pub use claims::{ClaimSnapshot, ClaimStore, MongoClaimStore};
pub use memory::{MemoryClaimStore, MemoryPolicyStore};
pub use policy::{MongoPolicyStore, PolicyStore};
