// Domain layer: records, entities and the ports every AWS adapter implements.

pub mod model;
pub mod ports;
