// Domain layer: scan models and ports. No process or file-format details live here.

pub mod model;
pub mod ports;
