// Domain layer: record models and ports (interfaces) the pipelines are written against.

pub mod model;
pub mod ports;
