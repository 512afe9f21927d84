/// Numerical searches over traced rays.
pub(crate) mod boundary;
pub(crate) mod brent;
pub(crate) mod chief;
