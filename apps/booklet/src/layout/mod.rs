// Layout: style resolution, size estimation, pagination, commentary grouping, assembly.
// Everything here is synchronous and free of I/O; diagnostics go through a `LogSink`.

pub mod assembler;
pub mod estimator;
pub mod grouping;
pub mod html;
pub mod planner;
pub mod style;

// Re-export the public API consumed by handlers and the CLI.
pub use assembler::{LayoutDescription, LayoutMode};
pub use planner::PolicyKind;
