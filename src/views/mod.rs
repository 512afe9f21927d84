/// Beam-level outputs built on top of the tracer and solvers.
pub(crate) mod cross_beam;
pub(crate) mod spot;
