use std::time::Duration;

use gb_assembler::{build_document, BuildOptions};
use gb_sandbox::{
    DocumentEnvironment, HeadlessEnvironment, HostEvent, HostState, SandboxHost, SandboxOptions,
};
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone, Copy)]
enum Op {
    Mount,
    Reload,
    Unmount,
    LoadCurrent,
    LoadStale,
    Height,
    Advance,
}

fn op() -> impl Strategy<Value = Op> {
    prop::sample::select(vec![
        Op::Mount,
        Op::Reload,
        Op::Unmount,
        Op::LoadCurrent,
        Op::LoadStale,
        Op::Height,
        Op::Advance,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn host_never_keeps_more_than_one_frame(ops in prop::collection::vec(op(), 1..40)) {
        let document = build_document("<p id=\"x\"></p>", &BuildOptions::default()).document;
        let mut host = SandboxHost::new(
            HeadlessEnvironment::new(),
            SandboxOptions {
                load_timeout: Duration::from_millis(300),
                ..SandboxOptions::default()
            },
        );
        let mut stale = Vec::new();

        for op in ops {
            let before = host.current_frame();
            match op {
                Op::Mount => host.mount("root", document.clone()).expect("mount"),
                Op::Reload => {
                    let result = host.reload();
                    prop_assert_eq!(result.is_ok(), before.is_some());
                }
                Op::Unmount => host.unmount().expect("unmount"),
                Op::LoadCurrent => {
                    if let Some(frame) = before {
                        host.on_frame_load(frame);
                    }
                }
                Op::LoadStale => {
                    if let Some(frame) = stale.last().copied() {
                        host.on_frame_load(frame);
                    }
                }
                Op::Height => {
                    for frame in stale.iter().copied().chain(before) {
                        host.on_message(frame, &json!({ "type": "setHeight", "payload": { "height": 10 } }));
                    }
                }
                Op::Advance => {
                    host.environment_mut().advance(Duration::from_millis(200));
                    let now = host.environment().now();
                    host.check_timeout(now);
                }
            }
            if let Some(frame) = before {
                if host.current_frame() != Some(frame) {
                    stale.push(frame);
                }
            }

            let env = host.environment();
            prop_assert!(env.live_frames() <= 1);
            prop_assert_eq!(env.live_frames(), env.live_listeners());
            prop_assert_eq!(host.current_frame().is_some(), env.live_frames() == 1);

            let events = host.drain_events();
            let messages = events
                .iter()
                .filter(|event| matches!(event, HostEvent::Message(_)))
                .count();
            let loads = events
                .iter()
                .filter(|event| matches!(event, HostEvent::Loaded { .. }))
                .count();
            // Only the current frame is heard; stale frames are silent.
            let expected_messages = usize::from(matches!(op, Op::Height) && before.is_some());
            prop_assert_eq!(messages, expected_messages);
            if matches!(op, Op::LoadStale) {
                prop_assert_eq!(loads, 0);
            }
            if host.state() == HostState::Unmounted {
                prop_assert!(host.current_frame().is_none());
            }
        }
    }
}
