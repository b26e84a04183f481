pub mod entity_emitter;
pub mod error;
pub mod host;
pub mod mirror;

pub use entity_emitter::EntityEmitter;
pub use error::HostError;
pub use host::Host;
pub use mirror::HostMirror;
