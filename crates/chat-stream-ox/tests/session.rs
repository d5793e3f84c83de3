use chat_stream_ox::{
    ChatStreamError, MessageStatus, SessionState, StreamHandler, WireEvent,
    error::ErrorInfo,
    session::{CancelHandle, StreamSession},
};
use futures_util::stream;

#[derive(Default)]
struct Recorder {
    started: Vec<String>,
    fragments: Vec<String>,
    buffered: Vec<String>,
    ended: Vec<String>,
    errors: Vec<String>,
    cancel: Option<CancelHandle>,
    cancel_after_fragments: usize,
}

impl StreamHandler for Recorder {
    fn on_start(&mut self, message_id: &chat_stream_ox::MessageId) {
        self.started.push(message_id.to_string());
    }

    fn on_content(&mut self, fragment: &str, buffered: &str) {
        self.fragments.push(fragment.to_string());
        self.buffered.push(buffered.to_string());
        if let Some(cancel) = &self.cancel {
            if self.fragments.len() >= self.cancel_after_fragments {
                cancel.cancel();
            }
        }
    }

    fn on_end(&mut self, message_id: &chat_stream_ox::MessageId) {
        self.ended.push(message_id.to_string());
    }

    fn on_error(&mut self, error: &ChatStreamError) {
        self.errors.push(error.to_string());
    }
}

fn ok_events(events: Vec<WireEvent>) -> impl futures_util::Stream<Item = Result<WireEvent, ChatStreamError>> + Unpin {
    stream::iter(events.into_iter().map(Ok).collect::<Vec<_>>())
}

fn delta(text: &str) -> WireEvent {
    WireEvent::ContentDelta {
        text: text.to_string(),
    }
}

#[tokio::test]
async fn fragments_concatenate_in_arrival_order() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    let events = ok_events(vec![
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        delta("He"),
        delta("llo, "),
        delta("world!"),
        WireEvent::MessageStop {
            id: "m1".to_string(),
        },
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(message.content(), "Hello, world!");
    assert_eq!(message.status(), MessageStatus::Sent);
    assert_eq!(message.id.as_str(), "m1");
    assert_eq!(recorder.fragments, vec!["He", "llo, ", "world!"]);
    assert_eq!(
        recorder.buffered,
        vec!["He", "Hello, ", "Hello, world!"]
    );
}

#[tokio::test]
async fn on_start_fires_exactly_once_before_content() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    let events = ok_events(vec![
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        WireEvent::MessageStart {
            id: "m2".to_string(),
        },
        delta("x"),
        WireEvent::MessageStop {
            id: "m1".to_string(),
        },
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(recorder.started, vec!["m1"]);
    assert_eq!(recorder.ended, vec!["m1"]);
    assert_eq!(message.id.as_str(), "m1");
}

#[tokio::test]
async fn content_before_start_marker_opens_the_session() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    let events = ok_events(vec![
        delta("hi"),
        WireEvent::MessageStop {
            id: "m1".to_string(),
        },
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(recorder.started.len(), 1);
    assert_eq!(recorder.fragments, vec!["hi"]);
    assert_eq!(message.status(), MessageStatus::Sent);
}

#[tokio::test]
async fn exactly_one_terminal_callback_and_nothing_after() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    // Events after the stop marker must be ignored (idempotent close).
    let events = ok_events(vec![
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        delta("done"),
        WireEvent::MessageStop {
            id: "m1".to_string(),
        },
        delta("late"),
        WireEvent::MessageStop {
            id: "m1".to_string(),
        },
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(recorder.ended.len(), 1);
    assert!(recorder.errors.is_empty());
    assert_eq!(recorder.fragments, vec!["done"]);
    assert_eq!(message.content(), "done");
}

#[tokio::test]
async fn wire_error_event_fails_the_message() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    let events = ok_events(vec![
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        delta("partial"),
        WireEvent::Error {
            error: ErrorInfo {
                r#type: "overloaded".to_string(),
                message: "busy".to_string(),
            },
        },
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(message.status(), MessageStatus::Error);
    assert!(message.content().starts_with("partial"));
    assert!(message.content().contains("busy"));
    assert_eq!(recorder.errors.len(), 1);
    assert!(recorder.ended.is_empty());
}

#[tokio::test]
async fn transport_error_surfaces_through_on_error() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    let events = stream::iter(vec![
        Ok(delta("half")),
        Err(ChatStreamError::StreamRead("connection reset".to_string())),
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(message.status(), MessageStatus::Error);
    assert_eq!(recorder.errors.len(), 1);
    assert_eq!(recorder.fragments, vec!["half"]);
}

#[tokio::test]
async fn stream_eof_without_stop_marker_is_an_error() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    let events = ok_events(vec![
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        delta("cut off"),
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(message.status(), MessageStatus::Error);
    assert_eq!(recorder.errors.len(), 1);
    assert!(recorder.ended.is_empty());
}

#[tokio::test]
async fn noise_events_are_ignored() {
    let mut recorder = Recorder::default();
    let session = StreamSession::new("c1");
    let events = ok_events(vec![
        WireEvent::Ping,
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        WireEvent::Unknown,
        delta("ok"),
        WireEvent::Ping,
        WireEvent::MessageStop {
            id: "m1".to_string(),
        },
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(message.content(), "ok");
    assert_eq!(recorder.fragments, vec!["ok"]);
}

#[tokio::test]
async fn cancellation_keeps_partial_content_as_sent() {
    let session = StreamSession::new("c1");
    let mut recorder = Recorder {
        cancel: Some(session.cancel_handle()),
        cancel_after_fragments: 2,
        ..Recorder::default()
    };
    let events = ok_events(vec![
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        delta("keep "),
        delta("this"),
        delta("drop this"),
        WireEvent::MessageStop {
            id: "m1".to_string(),
        },
    ]);

    let message = session.run(events, &mut recorder).await;

    // User-initiated stop is not a failure.
    assert_eq!(message.status(), MessageStatus::Sent);
    assert_eq!(message.content(), "keep this");
    assert_eq!(recorder.fragments, vec!["keep ", "this"]);
    assert_eq!(recorder.ended.len(), 1);
    assert!(recorder.errors.is_empty());
}

#[tokio::test]
async fn cancel_before_run_dispatches_nothing() {
    let session = StreamSession::new("c1");
    session.cancel_handle().cancel();
    // Safe to call again; subsequent cancels are no-ops.
    session.cancel_handle().cancel();
    let mut recorder = Recorder::default();
    let events = ok_events(vec![
        WireEvent::MessageStart {
            id: "m1".to_string(),
        },
        delta("never seen"),
    ]);

    let message = session.run(events, &mut recorder).await;

    assert_eq!(message.status(), MessageStatus::Sent);
    assert!(message.content().is_empty());
    assert!(recorder.started.is_empty());
    assert!(recorder.fragments.is_empty());
    assert_eq!(recorder.ended.len(), 1);
}

#[tokio::test]
async fn session_state_reaches_terminal() {
    let session = StreamSession::new("c1");
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.conversation_id(), "c1");
    assert!(session.message().is_streaming());

    let message = session
        .run(
            ok_events(vec![WireEvent::MessageStop {
                id: "m1".to_string(),
            }]),
            &mut (),
        )
        .await;
    assert_eq!(message.status(), MessageStatus::Sent);
}
