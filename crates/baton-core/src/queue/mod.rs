//! Queue module: the controller's task registry.

mod registry;

pub use registry::TaskRegistry;
