pub mod api;
pub mod config;
pub mod debounce;
pub mod flight;
pub mod guard;
pub mod latex;
pub mod poll;
pub mod resource;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use api::{Artifact, Backend, BackendClient, GeneratedResult};
pub use config::{Config, SessionConfig};
pub use resource::{BlobStore, RenderedHandle, TempFileStore};
pub use session::{Session, SessionEvent};
pub use state::{OpKind, Phase, Tab};
