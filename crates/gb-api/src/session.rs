use std::time::Duration;

use gb_core::{AssembledDocument, BridgeMessage, CompletionPayload, ErrorPayload, GameBoxError};
use gb_sandbox::{DocumentEnvironment, FrameId, HostEvent, SandboxHost, SandboxOptions};
use serde_json::Value as JsonValue;

/// Game error reports kept per session; older ones are dropped first.
pub const MAX_RECORDED_ERRORS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total loads allowed, the first one included.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub sandbox: SandboxOptions,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading { attempt: u32 },
    WaitingRetry { attempt: u32, retry_at: Duration },
    Ready,
    Failed { attempts: u32 },
    Closed,
}

/// One played game: a mounted document, the caller-side retry loop and the
/// latest values reported over the bridge.
#[derive(Debug)]
pub struct GameSession<E: DocumentEnvironment> {
    host: SandboxHost<E>,
    retry: RetryPolicy,
    status: SessionStatus,
    latest_stats: Option<JsonValue>,
    completion: Option<CompletionPayload>,
    errors: Vec<ErrorPayload>,
    error_count: u64,
    height: Option<f64>,
}

impl<E: DocumentEnvironment> GameSession<E> {
    pub fn start(
        env: E,
        container: &str,
        document: AssembledDocument,
        options: SessionOptions,
    ) -> Result<Self, GameBoxError> {
        let mut host = SandboxHost::new(env, options.sandbox);
        host.mount(container, document)?;
        Ok(Self {
            host,
            retry: options.retry,
            status: SessionStatus::Loading { attempt: 1 },
            latest_stats: None,
            completion: None,
            errors: Vec::new(),
            error_count: 0,
            height: None,
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn host(&self) -> &SandboxHost<E> {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut SandboxHost<E> {
        &mut self.host
    }

    pub fn current_frame(&self) -> Option<FrameId> {
        self.host.current_frame()
    }

    pub fn latest_stats(&self) -> Option<&JsonValue> {
        self.latest_stats.as_ref()
    }

    pub fn completion(&self) -> Option<&CompletionPayload> {
        self.completion.as_ref()
    }

    /// The most recent error reports, at most [`MAX_RECORDED_ERRORS`].
    pub fn errors(&self) -> &[ErrorPayload] {
        &self.errors
    }

    /// Every error reported since the session started, dropped ones included.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn height(&self) -> Option<f64> {
        self.height
    }

    /// Advances the session to the environment clock: starts a due retry,
    /// checks the load timeout and folds host events into the session.
    /// Returns the bridge messages received since the previous poll.
    pub fn poll(&mut self) -> Result<Vec<BridgeMessage>, GameBoxError> {
        let now = self.host.environment().now();
        let mut messages = Vec::new();
        self.fold_events(now, &mut messages)?;

        if let SessionStatus::WaitingRetry { retry_at, .. } = self.status {
            if now >= retry_at {
                self.host.reload()?;
                self.status = SessionStatus::Loading {
                    attempt: self.host.attempt(),
                };
                tracing::info!(attempt = self.host.attempt(), "retrying game load");
            }
        }
        if self.host.check_timeout(now) {
            self.fold_events(now, &mut messages)?;
        }
        Ok(messages)
    }

    pub fn close(&mut self) -> Result<(), GameBoxError> {
        self.host.unmount()?;
        self.status = SessionStatus::Closed;
        Ok(())
    }

    fn fold_events(
        &mut self,
        now: Duration,
        messages: &mut Vec<BridgeMessage>,
    ) -> Result<(), GameBoxError> {
        let current = self.host.attempt();
        for event in self.host.drain_events() {
            match event {
                HostEvent::Loaded { attempt } | HostEvent::LoadFailed { attempt, .. }
                    if attempt != current =>
                {
                    tracing::debug!(attempt, current, "ignoring event from an earlier load attempt");
                }
                HostEvent::Loaded { .. } => self.status = SessionStatus::Ready,
                HostEvent::Message(message) => {
                    self.record(&message);
                    messages.push(message);
                }
                HostEvent::LoadFailed { attempt, .. } => self.on_load_failed(attempt, now)?,
            }
        }
        Ok(())
    }

    fn on_load_failed(&mut self, attempt: u32, now: Duration) -> Result<(), GameBoxError> {
        if attempt >= self.retry.max_attempts {
            tracing::warn!(attempts = attempt, "game failed to load; giving up");
            self.host.unmount()?;
            self.status = SessionStatus::Failed { attempts: attempt };
        } else {
            self.status = SessionStatus::WaitingRetry {
                attempt,
                retry_at: now + self.retry.backoff,
            };
        }
        Ok(())
    }

    fn record(&mut self, message: &BridgeMessage) {
        match message {
            BridgeMessage::Stats(stats) => self.latest_stats = Some(stats.clone()),
            BridgeMessage::Complete(payload) => self.completion = Some(payload.clone()),
            BridgeMessage::Error(payload) => {
                tracing::warn!(message = %payload.message, "game reported an error");
                self.error_count += 1;
                if self.errors.len() == MAX_RECORDED_ERRORS {
                    self.errors.remove(0);
                }
                self.errors.push(payload.clone());
            }
            BridgeMessage::Height(payload) => self.height = Some(payload.height),
        }
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;
    use gb_sandbox::HeadlessEnvironment;
    use serde_json::json;

    fn document() -> AssembledDocument {
        gb_assembler::build_document("<p id=\"a\"></p>", &Default::default()).document
    }

    fn session(retry: RetryPolicy) -> GameSession<HeadlessEnvironment> {
        let options = SessionOptions {
            sandbox: SandboxOptions {
                load_timeout: Duration::from_secs(5),
                ..SandboxOptions::default()
            },
            retry,
        };
        GameSession::start(HeadlessEnvironment::new(), "root", document(), options)
            .expect("session should start")
    }

    fn advance(session: &mut GameSession<HeadlessEnvironment>, secs: u64) {
        session
            .host_mut()
            .environment_mut()
            .advance(Duration::from_secs(secs));
    }

    #[test]
    fn load_then_messages_update_session() {
        let mut session = session(RetryPolicy::default());
        let frame = session.current_frame().expect("frame");
        session.host_mut().on_frame_load(frame);
        session
            .host_mut()
            .on_message(frame, &json!({ "type": "gameStats", "payload": { "moves": 4 } }));
        session.host_mut().on_message(
            frame,
            &json!({ "type": "gameComplete", "payload": { "completed": true, "score": 80 } }),
        );
        session
            .host_mut()
            .on_message(frame, &json!({ "type": "gameError", "payload": { "message": "oops" } }));

        let messages = session.poll().expect("poll");
        assert_eq!(messages.len(), 3);
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.latest_stats(), Some(&json!({ "moves": 4 })));
        assert_eq!(session.completion().and_then(|c| c.score), Some(80.0));
        assert_eq!(session.errors().len(), 1);
    }

    #[test]
    fn load_failure_retries_with_backoff_then_fails() {
        let mut session = session(RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_secs(2),
        });

        advance(&mut session, 5);
        session.poll().expect("poll");
        assert_eq!(
            session.status(),
            SessionStatus::WaitingRetry {
                attempt: 1,
                retry_at: Duration::from_secs(7),
            }
        );

        advance(&mut session, 1);
        session.poll().expect("poll");
        assert!(matches!(session.status(), SessionStatus::WaitingRetry { .. }));

        advance(&mut session, 1);
        session.poll().expect("poll");
        assert_eq!(session.status(), SessionStatus::Loading { attempt: 2 });

        advance(&mut session, 5);
        session.poll().expect("poll");
        assert_eq!(session.status(), SessionStatus::Failed { attempts: 2 });
        assert_eq!(session.host().environment().live_frames(), 0);
    }

    #[test]
    fn retry_that_loads_reaches_ready() {
        let mut session = session(RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        });
        advance(&mut session, 5);
        session.poll().expect("poll");
        session.poll().expect("poll");
        assert_eq!(session.status(), SessionStatus::Loading { attempt: 2 });

        let frame = session.current_frame().expect("frame");
        session.host_mut().on_frame_load(frame);
        advance(&mut session, 1);
        session.poll().expect("poll");
        assert_eq!(session.status(), SessionStatus::Ready);
    }

    #[test]
    fn late_load_of_timed_out_frame_is_consistent_with_host() {
        let mut session = session(RetryPolicy::default());
        let first = session.current_frame().expect("frame");
        advance(&mut session, 5);
        session.poll().expect("poll");
        assert!(matches!(session.status(), SessionStatus::WaitingRetry { .. }));

        session.host_mut().on_frame_load(first);
        advance(&mut session, 1);
        session.poll().expect("poll");
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.host().state(), gb_sandbox::HostState::Ready);
        assert_eq!(session.current_frame(), Some(first));
    }

    #[test]
    fn load_of_replaced_frame_does_not_mark_retry_ready() {
        let mut session = session(RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        });
        let first = session.current_frame().expect("frame");
        advance(&mut session, 5);
        session.poll().expect("poll");
        session.poll().expect("poll");
        assert_eq!(session.status(), SessionStatus::Loading { attempt: 2 });

        session.host_mut().on_frame_load(first);
        session
            .host_mut()
            .on_message(first, &json!({ "type": "game-loaded" }));
        session.poll().expect("poll");
        assert_eq!(session.status(), SessionStatus::Loading { attempt: 2 });
        assert_eq!(session.host().state(), gb_sandbox::HostState::Loading);
    }

    #[test]
    fn error_reports_are_capped_but_counted() {
        let mut session = session(RetryPolicy::default());
        let frame = session.current_frame().expect("frame");
        let total = MAX_RECORDED_ERRORS + 7;
        for index in 0..total {
            session.host_mut().on_message(
                frame,
                &json!({ "type": "gameError", "payload": { "message": format!("e{index}") } }),
            );
        }
        session.poll().expect("poll");

        assert_eq!(session.errors().len(), MAX_RECORDED_ERRORS);
        assert_eq!(session.error_count(), total as u64);
        assert_eq!(session.errors()[0].message, "e7");
        assert_eq!(
            session.errors().last().map(|error| error.message.as_str()),
            Some(format!("e{}", total - 1).as_str())
        );
    }

    #[test]
    fn close_stops_message_delivery() {
        let mut session = session(RetryPolicy::default());
        let frame = session.current_frame().expect("frame");
        session.close().expect("close");
        session
            .host_mut()
            .on_message(frame, &json!({ "type": "setHeight", "payload": { "height": 10 } }));
        assert!(session.poll().expect("poll").is_empty());
        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(session.height(), None);
    }
}
