// Domain layer: core models and ports. No browser or SMTP types leak in here.

pub mod model;
pub mod ports;
