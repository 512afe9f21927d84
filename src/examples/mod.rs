//! Ready-made example systems.
//!
//! These are shared by the integration tests and the benches, and double as
//! small usage references.
pub mod front_stop;
pub mod hemisphere;
pub mod singlet;
pub mod slab;
