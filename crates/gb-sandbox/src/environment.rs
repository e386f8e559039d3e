use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::SandboxError;
use crate::policy::SandboxPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// What the host needs from the surrounding page: isolated frames, a
/// per-frame message subscription and a monotonic clock.
pub trait DocumentEnvironment {
    fn now(&self) -> Duration;

    fn create_frame(
        &mut self,
        container: &str,
        policy: &SandboxPolicy,
        document: &str,
    ) -> Result<FrameId, SandboxError>;

    fn destroy_frame(&mut self, frame: FrameId) -> Result<(), SandboxError>;

    fn subscribe_messages(&mut self, frame: FrameId) -> Result<ListenerId, SandboxError>;

    fn unsubscribe_messages(&mut self, listener: ListenerId) -> Result<(), SandboxError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessFrame {
    pub container: String,
    pub sandbox: String,
    pub document: String,
}

/// In-memory environment. Frames never run their scripts; callers drive load
/// and message events through the host directly.
#[derive(Debug, Clone, Default)]
pub struct HeadlessEnvironment {
    clock: Duration,
    next_id: u64,
    containers: Vec<String>,
    frames: BTreeMap<FrameId, HeadlessFrame>,
    listeners: BTreeMap<ListenerId, FrameId>,
    destroyed: Vec<FrameId>,
}

impl HeadlessEnvironment {
    /// An environment where every non-empty container name resolves.
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment that only knows the given containers.
    pub fn with_containers<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            containers: containers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
    }

    pub fn frame(&self, frame: FrameId) -> Option<&HeadlessFrame> {
        self.frames.get(&frame)
    }

    pub fn live_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn listeners_for(&self, frame: FrameId) -> usize {
        self.listeners.values().filter(|owner| **owner == frame).count()
    }

    pub fn destroyed_frames(&self) -> &[FrameId] {
        &self.destroyed
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn knows_container(&self, container: &str) -> bool {
        if self.containers.is_empty() {
            !container.trim().is_empty()
        } else {
            self.containers.iter().any(|known| known == container)
        }
    }
}

impl DocumentEnvironment for HeadlessEnvironment {
    fn now(&self) -> Duration {
        self.clock
    }

    fn create_frame(
        &mut self,
        container: &str,
        policy: &SandboxPolicy,
        document: &str,
    ) -> Result<FrameId, SandboxError> {
        if !self.knows_container(container) {
            return Err(SandboxError::ContainerMissing(container.to_string()));
        }
        let frame = FrameId(self.next_id());
        self.frames.insert(
            frame,
            HeadlessFrame {
                container: container.to_string(),
                sandbox: policy.attribute(),
                document: document.to_string(),
            },
        );
        Ok(frame)
    }

    fn destroy_frame(&mut self, frame: FrameId) -> Result<(), SandboxError> {
        if self.frames.remove(&frame).is_none() {
            return Err(SandboxError::UnknownFrame(frame.0));
        }
        self.destroyed.push(frame);
        Ok(())
    }

    fn subscribe_messages(&mut self, frame: FrameId) -> Result<ListenerId, SandboxError> {
        if !self.frames.contains_key(&frame) {
            return Err(SandboxError::UnknownFrame(frame.0));
        }
        let listener = ListenerId(self.next_id());
        self.listeners.insert(listener, frame);
        Ok(listener)
    }

    fn unsubscribe_messages(&mut self, listener: ListenerId) -> Result<(), SandboxError> {
        self.listeners
            .remove(&listener)
            .map(|_| ())
            .ok_or(SandboxError::UnknownListener(listener.0))
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn headless_environment_tracks_frames_and_listeners() {
        let mut env = HeadlessEnvironment::new();
        let frame = env
            .create_frame("game-root", &SandboxPolicy::minimal(), "<p>x</p>")
            .expect("frame should be created");
        let listener = env.subscribe_messages(frame).expect("subscribe");

        let record = env.frame(frame).expect("frame recorded");
        assert_eq!(record.sandbox, "allow-scripts allow-same-origin");
        assert_eq!(record.container, "game-root");
        assert_eq!(env.listeners_for(frame), 1);

        env.unsubscribe_messages(listener).expect("unsubscribe");
        env.destroy_frame(frame).expect("destroy");
        assert_eq!(env.live_frames(), 0);
        assert_eq!(env.live_listeners(), 0);
        assert_eq!(env.destroyed_frames(), &[frame]);
    }

    #[test]
    fn headless_environment_rejects_unknown_handles() {
        let mut env = HeadlessEnvironment::with_containers(["root"]);
        let error = env
            .create_frame("missing", &SandboxPolicy::minimal(), "")
            .expect_err("unknown container should fail");
        assert_eq!(error.code(), "SANDBOX_CONTAINER_MISSING");

        let error = env.destroy_frame(FrameId(9)).expect_err("unknown frame");
        assert_eq!(error.code(), "SANDBOX_UNKNOWN_FRAME");
        let error = env
            .unsubscribe_messages(ListenerId(9))
            .expect_err("unknown listener");
        assert_eq!(error.code(), "SANDBOX_UNKNOWN_LISTENER");
    }

    #[test]
    fn headless_clock_is_monotonic() {
        let mut env = HeadlessEnvironment::new();
        assert_eq!(env.now(), Duration::ZERO);
        env.advance(Duration::from_millis(250));
        env.advance(Duration::from_millis(250));
        assert_eq!(env.now(), Duration::from_millis(500));
    }
}
