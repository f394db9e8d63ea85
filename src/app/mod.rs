// Application layer: wires CLI arguments and configuration to the core helpers.

#[cfg(feature = "cli")]
pub mod commands;
