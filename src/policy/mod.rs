//! Entitlement resolution
//!
//! Computes the effective access terms (enabled, cost, cooldown, daily limit)
//! for one user, one community policy, and one item type. Leaf module: pure
//! functions over read-only policy views, no I/O.

mod resolver;

pub use resolver::{resolve, EffectiveAccess, RoleMembership};
