// Domain layer: core models and ports (interfaces). No knowledge of the
// concrete browser or ledger backends.

pub mod model;
pub mod ports;
