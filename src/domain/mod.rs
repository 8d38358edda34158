// Domain layer: scene model, input formats and ports (interfaces).

pub mod format;
pub mod model;
pub mod ports;
