/// CLI functionality and checks
pub mod cli;
/// Contains the contig table and patch data types
pub mod data_types;
/// Blocking subprocess helpers for the external consensus and filter tools
pub mod external;
/// Moves variant records onto a named contig with a positional offset
pub mod liftover;
/// Organizes the per-patch workflow: extraction, consensus, region filtering, and liftover
pub mod polish;
/// Contains all the various output writer functionality
pub mod writers;
