mod mesh_coordinator;
mod mesh_event;

pub use mesh_coordinator::*;
pub use mesh_event::*;
