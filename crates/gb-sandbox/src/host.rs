use std::time::Duration;

use gb_core::{decode_wire, AssembledDocument, BridgeMessage, Inbound};
use serde_json::Value as JsonValue;

use crate::environment::{DocumentEnvironment, FrameId, ListenerId};
use crate::error::SandboxError;
use crate::policy::SandboxPolicy;

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOptions {
    pub load_timeout: Duration,
    pub policy: SandboxPolicy,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            policy: SandboxPolicy::minimal(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Empty,
    Loading,
    Ready,
    Reloading,
    Unmounted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Loaded { attempt: u32 },
    Message(BridgeMessage),
    LoadFailed { attempt: u32, waited: Duration },
}

#[derive(Debug)]
struct Mount {
    container: String,
    document: AssembledDocument,
    frame: FrameId,
    listener: ListenerId,
    started_at: Duration,
    timeout_reported: bool,
}

/// Owns the single embedded document of one mount point.
///
/// Every (re)load tears down the previous frame and its message listener
/// before the next frame is created, so events from a stale frame are
/// recognised by id and dropped.
#[derive(Debug)]
pub struct SandboxHost<E: DocumentEnvironment> {
    env: E,
    options: SandboxOptions,
    state: HostState,
    attempt: u32,
    mount: Option<Mount>,
    events: Vec<HostEvent>,
}

impl<E: DocumentEnvironment> SandboxHost<E> {
    pub fn new(env: E, options: SandboxOptions) -> Self {
        Self {
            env,
            options,
            state: HostState::Empty,
            attempt: 0,
            mount: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// 1-based load attempt of the current mount; 0 before the first mount.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn current_frame(&self) -> Option<FrameId> {
        self.mount.as_ref().map(|mount| mount.frame)
    }

    pub fn document(&self) -> Option<&AssembledDocument> {
        self.mount.as_ref().map(|mount| &mount.document)
    }

    /// Mounts `document` into `container`, replacing whatever was mounted.
    pub fn mount(&mut self, container: &str, document: AssembledDocument) -> Result<(), SandboxError> {
        self.teardown()?;
        self.events.clear();
        self.attempt = 1;
        if document.is_degraded() {
            tracing::warn!(container, "mounting a degraded document");
        }
        self.establish(container.to_string(), document)
    }

    pub fn unmount(&mut self) -> Result<(), SandboxError> {
        self.teardown()?;
        self.set_state(HostState::Unmounted);
        Ok(())
    }

    /// Swaps in a fresh frame carrying the same document. Load outcomes still
    /// queued for the replaced frame are discarded; its messages are kept.
    pub fn reload(&mut self) -> Result<(), SandboxError> {
        let Some(mount) = self.teardown()? else {
            return Err(SandboxError::NotMounted);
        };
        let queued = self.events.len();
        self.events.retain(|event| matches!(event, HostEvent::Message(_)));
        if self.events.len() != queued {
            tracing::debug!(
                dropped = queued - self.events.len(),
                "discarding load events of replaced frame"
            );
        }
        self.set_state(HostState::Reloading);
        self.attempt += 1;
        self.establish(mount.container, mount.document)
    }

    /// The frame's load event. Loads from frames that are no longer current
    /// are dropped.
    pub fn on_frame_load(&mut self, frame: FrameId) {
        if self.current_frame() != Some(frame) {
            tracing::debug!(%frame, "dropping load event from stale frame");
            return;
        }
        if self.state != HostState::Loading {
            return;
        }
        self.set_state(HostState::Ready);
        self.events.push(HostEvent::Loaded {
            attempt: self.attempt,
        });
    }

    /// A cross-document message received by the listener of `frame`.
    pub fn on_message(&mut self, frame: FrameId, message: &JsonValue) {
        if self.current_frame() != Some(frame) {
            tracing::debug!(%frame, "dropping message from inactive frame");
            return;
        }
        match decode_wire(message) {
            Inbound::Bridge(message) => {
                tracing::debug!(kind = message.kind_name(), "bridge message");
                self.events.push(HostEvent::Message(message));
            }
            Inbound::Loaded => self.on_frame_load(frame),
            Inbound::Ignored => {}
        }
    }

    /// Emits `LoadFailed` once per attempt when the current frame has been
    /// loading for at least the configured timeout. Returns whether it fired.
    pub fn check_timeout(&mut self, now: Duration) -> bool {
        if self.state != HostState::Loading {
            return false;
        }
        let Some(mount) = self.mount.as_mut() else {
            return false;
        };
        let waited = now.saturating_sub(mount.started_at);
        if mount.timeout_reported || waited < self.options.load_timeout {
            return false;
        }
        mount.timeout_reported = true;
        tracing::warn!(
            attempt = self.attempt,
            waited_ms = waited.as_millis() as u64,
            "embedded document did not load in time"
        );
        self.events.push(HostEvent::LoadFailed {
            attempt: self.attempt,
            waited,
        });
        true
    }

    pub fn drain_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    fn establish(&mut self, container: String, document: AssembledDocument) -> Result<(), SandboxError> {
        let result = self.create_mount(container, document);
        if result.is_err() {
            self.set_state(HostState::Unmounted);
        }
        result
    }

    fn create_mount(&mut self, container: String, document: AssembledDocument) -> Result<(), SandboxError> {
        let frame = self
            .env
            .create_frame(&container, &self.options.policy, document.as_str())?;
        let listener = match self.env.subscribe_messages(frame) {
            Ok(listener) => listener,
            Err(error) => {
                self.env.destroy_frame(frame)?;
                return Err(error);
            }
        };
        self.mount = Some(Mount {
            container,
            document,
            frame,
            listener,
            started_at: self.env.now(),
            timeout_reported: false,
        });
        self.set_state(HostState::Loading);
        Ok(())
    }

    /// Releases the listener and the frame. Both are attempted even when one
    /// fails; the mount is gone either way and the first error is returned.
    fn teardown(&mut self) -> Result<Option<Mount>, SandboxError> {
        let Some(mount) = self.mount.take() else {
            return Ok(None);
        };
        let unsubscribed = self.env.unsubscribe_messages(mount.listener);
        let destroyed = self.env.destroy_frame(mount.frame);
        if let Err(error) = unsubscribed.and(destroyed) {
            tracing::warn!(frame = %mount.frame, %error, "sandbox teardown incomplete");
            self.set_state(HostState::Unmounted);
            return Err(error);
        }
        Ok(Some(mount))
    }

    fn set_state(&mut self, state: HostState) {
        if self.state != state {
            tracing::info!(from = ?self.state, to = ?state, attempt = self.attempt, "sandbox host state");
            self.state = state;
        }
    }
}

#[cfg(test)]
mod host_tests {
    use super::*;
    use crate::environment::HeadlessEnvironment;
    use serde_json::json;

    fn host() -> SandboxHost<HeadlessEnvironment> {
        SandboxHost::new(HeadlessEnvironment::new(), SandboxOptions::default())
    }

    fn document() -> AssembledDocument {
        AssembledDocument::new(
            "<!DOCTYPE html>\n<html><head><meta charset=\"UTF-8\"><meta name=\"viewport\" content=\"width=device-width\"><title>T</title></head><body></body></html>",
        )
        .expect("valid document")
    }

    #[test]
    fn mount_then_load_reaches_ready() {
        let mut host = host();
        assert_eq!(host.state(), HostState::Empty);
        host.mount("root", document()).expect("mount");
        assert_eq!(host.state(), HostState::Loading);

        let frame = host.current_frame().expect("frame");
        host.on_frame_load(frame);
        host.on_frame_load(frame);
        assert_eq!(host.state(), HostState::Ready);
        assert_eq!(host.drain_events(), vec![HostEvent::Loaded { attempt: 1 }]);
        assert!(host.drain_events().is_empty());
    }

    #[test]
    fn reload_swaps_frame_and_drops_stale_load() {
        let mut host = host();
        host.mount("root", document()).expect("mount");
        let first = host.current_frame().expect("first frame");
        host.reload().expect("reload");
        let second = host.current_frame().expect("second frame");
        assert_ne!(first, second);

        host.on_frame_load(first);
        host.on_frame_load(second);
        assert_eq!(host.drain_events(), vec![HostEvent::Loaded { attempt: 2 }]);

        let env = host.environment();
        assert_eq!(env.live_frames(), 1);
        assert_eq!(env.live_listeners(), 1);
        assert_eq!(env.listeners_for(first), 0);
        assert_eq!(env.destroyed_frames(), &[first]);
    }

    #[test]
    fn messages_after_unmount_are_dropped() {
        let mut host = host();
        host.mount("root", document()).expect("mount");
        let frame = host.current_frame().expect("frame");
        host.on_message(frame, &json!({ "type": "setHeight", "payload": { "height": 200 } }));
        host.unmount().expect("unmount");
        host.on_message(frame, &json!({ "type": "setHeight", "payload": { "height": 300 } }));

        assert_eq!(host.state(), HostState::Unmounted);
        assert_eq!(host.environment().live_listeners(), 0);
        let events = host.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            HostEvent::Message(BridgeMessage::Height(payload)) if payload.height == 200.0
        ));
    }

    #[test]
    fn loaded_wire_signal_counts_as_load_and_unknown_messages_are_ignored() {
        let mut host = host();
        host.mount("root", document()).expect("mount");
        let frame = host.current_frame().expect("frame");
        host.on_message(frame, &json!({ "type": "chat", "payload": {} }));
        host.on_message(frame, &json!({ "type": "game-loaded" }));
        assert_eq!(host.state(), HostState::Ready);
        assert_eq!(host.drain_events(), vec![HostEvent::Loaded { attempt: 1 }]);
    }

    #[test]
    fn check_timeout_fires_once_per_attempt() {
        let mut host = SandboxHost::new(
            HeadlessEnvironment::new(),
            SandboxOptions {
                load_timeout: Duration::from_millis(500),
                ..SandboxOptions::default()
            },
        );
        host.mount("root", document()).expect("mount");
        assert!(!host.check_timeout(Duration::from_millis(499)));
        assert!(host.check_timeout(Duration::from_millis(600)));
        assert!(!host.check_timeout(Duration::from_millis(900)));
        assert_eq!(
            host.drain_events(),
            vec![HostEvent::LoadFailed {
                attempt: 1,
                waited: Duration::from_millis(600),
            }]
        );

        host.environment_mut().advance(Duration::from_millis(1000));
        host.reload().expect("reload");
        assert!(!host.check_timeout(Duration::from_millis(1200)));
        assert!(host.check_timeout(Duration::from_millis(1500)));
    }

    #[test]
    fn reload_without_mount_is_an_error() {
        let mut host = host();
        let error = host.reload().expect_err("nothing mounted");
        assert_eq!(error.code(), "SANDBOX_NOT_MOUNTED");
    }

    #[test]
    fn reload_discards_load_events_queued_by_old_frame() {
        let mut host = host();
        host.mount("root", document()).expect("mount");
        let first = host.current_frame().expect("frame");
        host.on_message(first, &json!({ "type": "setHeight", "payload": { "height": 40 } }));
        host.on_frame_load(first);
        host.reload().expect("reload");

        assert_eq!(host.state(), HostState::Loading);
        assert_eq!(host.attempt(), 2);
        let events = host.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], HostEvent::Message(BridgeMessage::Height(_))));
    }

    #[test]
    fn teardown_destroys_frame_even_when_listener_is_already_gone() {
        let mut host = host();
        host.mount("root", document()).expect("mount");
        let listener = host.mount.as_ref().expect("mounted").listener;
        host.environment_mut()
            .unsubscribe_messages(listener)
            .expect("external unsubscribe");

        let error = host.unmount().expect_err("listener missing");
        assert_eq!(error.code(), "SANDBOX_UNKNOWN_LISTENER");
        assert_eq!(host.current_frame(), None);
        assert_eq!(host.state(), HostState::Unmounted);
        assert_eq!(host.environment().live_frames(), 0);

        host.mount("root", document()).expect("remount");
        assert_eq!(host.environment().live_frames(), 1);
    }

    #[test]
    fn failed_mount_leaves_no_frame_behind() {
        let mut host = SandboxHost::new(
            HeadlessEnvironment::with_containers(["root"]),
            SandboxOptions::default(),
        );
        let error = host.mount("elsewhere", document()).expect_err("unknown container");
        assert_eq!(error.code(), "SANDBOX_CONTAINER_MISSING");
        assert_eq!(host.current_frame(), None);
        assert_eq!(host.state(), HostState::Unmounted);
        assert_eq!(host.environment().live_frames(), 0);
    }
}
