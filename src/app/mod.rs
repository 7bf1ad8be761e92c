// Application layer: wires CLI commands to adapters and core operations.

pub mod commands;

pub use commands::run;
