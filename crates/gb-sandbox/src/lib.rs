pub mod environment;
pub mod error;
pub mod host;
pub mod policy;

pub use environment::{DocumentEnvironment, FrameId, HeadlessEnvironment, HeadlessFrame, ListenerId};
pub use error::SandboxError;
pub use host::{HostEvent, HostState, SandboxHost, SandboxOptions, DEFAULT_LOAD_TIMEOUT};
pub use policy::{Capability, SandboxPolicy};
