//! Command loop tests against scripted backends and stub collaborators

mod common;

use serde_json::json;

use common::{RepeatingBackend, ScriptedBackend, StubContacts, Stubs, action};
use senior_assistant::backend::BackendResponse;
use senior_assistant::conversation::{Conversation, Part, Role};
use senior_assistant::{ActionErrorKind, ActionResult, Error, LoopEvent, Utterance};

fn utterance() -> Utterance {
    Utterance::wav(b"RIFF....WAVE".to_vec())
}

/// Result recorded in the last turn the backend saw on call `index`
fn result_seen(backend: &ScriptedBackend, index: usize) -> ActionResult {
    let requests = backend.requests();
    let last = requests[index].turns.last().expect("turns");
    assert_eq!(last.role, Role::User);
    match &last.parts[0] {
        Part::ActionResult(result) => result.clone(),
        other => panic!("expected action result, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_answer_needs_one_call() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse::text("Hello there!"))]);

    let text = stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    assert_eq!(text, "Hello there!");
    assert_eq!(backend.calls(), 1);

    let request = &backend.requests()[0];
    assert!(request.system_instruction.contains("Current time is"));
    assert_eq!(
        request.action_names,
        vec!["get_weather", "search_contacts", "call_someone", "set_reminder"]
    );
    assert_eq!(request.turns.len(), 1);
    assert!(matches!(request.turns[0].parts[1], Part::Audio(_)));
}

#[tokio::test]
async fn weather_result_is_fed_back() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("get_weather", json!({"city": "Paris"})))),
        Ok(BackendResponse::text("It is 18 degrees and clear in Paris.")),
    ]);

    let text = stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    assert_eq!(text, "It is 18 degrees and clear in Paris.");
    assert_eq!(backend.calls(), 2);

    let turns = &backend.requests()[1].turns;
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].role, Role::Model);
    match result_seen(&backend, 1) {
        ActionResult::Success { name, payload } => {
            assert_eq!(name, "get_weather");
            assert_eq!(payload["city"], "Paris");
            assert_eq!(payload["windSpeed"], 3.1);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn call_by_name_searches_then_dials() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("search_contacts", json!({"name": "John"})))),
        Ok(BackendResponse::action(action(
            "call_someone",
            json!({"phoneNumber": "555-0100"}),
        ))),
        Ok(BackendResponse::text("Calling John now.")),
    ]);

    let text = stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    assert_eq!(text, "Calling John now.");
    assert_eq!(backend.calls(), 3);
    assert_eq!(stubs.dialer.opened(), vec!["tel:555-0100".to_string()]);
    assert_eq!(
        result_seen(&backend, 2),
        ActionResult::success("call_someone", json!("Calling 555-0100"))
    );
}

#[tokio::test]
async fn ambiguous_contacts_are_returned_unmodified() {
    let mut stubs = Stubs::new();
    stubs.contacts = StubContacts::with(&[
        ("John Smith", &["555-0100", "555-0101"]),
        ("John Doe", &["555-0199"]),
        ("Johnny NoPhone", &[]),
    ]);
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("search_contacts", json!({"name": "John"})))),
        Ok(BackendResponse::text("I found two Johns. Which one should I call?")),
    ]);

    let text = stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    assert!(text.contains("two Johns"));
    assert!(stubs.dialer.opened().is_empty());
    assert_eq!(
        result_seen(&backend, 1),
        ActionResult::success(
            "search_contacts",
            json!([
                {"name": "John Smith", "phoneNumber": "555-0100"},
                {"name": "John Doe", "phoneNumber": "555-0199"}
            ])
        )
    );
}

#[tokio::test]
async fn unknown_action_is_reported_to_backend() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("order_pizza", json!({"size": "large"})))),
        Ok(BackendResponse::text("Sorry, I can't do that.")),
    ]);

    let text = stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    assert_eq!(text, "Sorry, I can't do that.");
    let result = result_seen(&backend, 1);
    assert_eq!(result.name(), "order_pizza");
    assert_eq!(result.error_kind(), Some(ActionErrorKind::UnknownAction));
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_provider() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("set_reminder", json!({"title": "Doctor"})))),
        Ok(BackendResponse::text("When should I remind you?")),
    ]);

    stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    assert!(stubs.calendar.created().is_empty());
    assert_eq!(
        result_seen(&backend, 1).error_kind(),
        Some(ActionErrorKind::InvalidArgument)
    );
}

#[tokio::test]
async fn provider_failure_becomes_a_result() {
    let mut stubs = Stubs::new();
    stubs.contacts = StubContacts::denied();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("search_contacts", json!({"name": "John"})))),
        Ok(BackendResponse::text("I can't see your contacts.")),
    ]);

    stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    match result_seen(&backend, 1) {
        ActionResult::Failure { kind, message, .. } => {
            assert_eq!(kind, ActionErrorKind::PermissionDenied);
            assert_eq!(message, "Contacts permission not granted");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn only_first_requested_action_runs() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse {
            final_text: None,
            action_requests: vec![
                action("get_weather", json!({"city": "Paris"})),
                action("call_someone", json!({"phoneNumber": "555-0100"})),
            ],
        }),
        Ok(BackendResponse::text("Sunny.")),
    ]);

    stubs.command_loop(backend.clone()).run(utterance()).await.unwrap();

    assert_eq!(stubs.weather.seen.lock().unwrap().len(), 1);
    assert!(stubs.dialer.opened().is_empty());
    assert_eq!(backend.requests()[1].turns.len(), 3);
}

#[tokio::test]
async fn loop_exceeded_after_exactly_the_bound() {
    let stubs = Stubs::new();
    let backend = RepeatingBackend::new(action("get_weather", json!({"city": "Paris"})));

    let err = stubs
        .command_loop(backend.clone())
        .with_max_round_trips(3)
        .run(utterance())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LoopExceeded { bound: 3 }));
    assert!(err.is_terminal());
    assert_eq!(backend.calls(), 4);
    assert_eq!(stubs.weather.seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn zero_bound_refuses_any_action() {
    let stubs = Stubs::new();
    let backend = RepeatingBackend::new(action("get_weather", json!({"city": "Paris"})));

    let err = stubs
        .command_loop(backend.clone())
        .with_max_round_trips(0)
        .run(utterance())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LoopExceeded { bound: 0 }));
    assert_eq!(backend.calls(), 1);
    assert!(stubs.weather.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn answer_at_the_bound_still_succeeds() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("get_weather", json!({"city": "Paris"})))),
        Ok(BackendResponse::action(action("get_weather", json!({"city": "Lyon"})))),
        Ok(BackendResponse::text("Both are sunny.")),
    ]);

    let text = stubs
        .command_loop(backend.clone())
        .with_max_round_trips(2)
        .run(utterance())
        .await
        .unwrap();

    assert_eq!(text, "Both are sunny.");
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn backend_failure_is_not_retried() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("get_weather", json!({"city": "Paris"})))),
        Err(Error::Backend("503 Service Unavailable".to_string())),
        Ok(BackendResponse::text("never reached")),
    ]);

    let err = stubs.command_loop(backend.clone()).run(utterance()).await.unwrap_err();

    assert!(matches!(err, Error::Backend(ref m) if m.contains("503")));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn other_backend_errors_are_reported_as_backend_errors() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![Err(Error::Config("bad key".to_string()))]);

    let err = stubs.command_loop(backend).run(utterance()).await.unwrap_err();

    assert!(matches!(err, Error::Backend(ref m) if m.contains("bad key")));
}

#[tokio::test]
async fn blank_answer_is_a_backend_error() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse::text("   "))]);

    let err = stubs.command_loop(backend).run(utterance()).await.unwrap_err();

    assert!(matches!(err, Error::Backend(_)));
}

#[tokio::test]
async fn progress_events_bracket_each_action() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::action(action("search_contacts", json!({"name": "John"})))),
        Ok(BackendResponse::action(action("order_pizza", json!({})))),
        Ok(BackendResponse::text("Done.")),
    ]);
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);

    stubs
        .command_loop(backend)
        .with_notify(tx)
        .run(utterance())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            LoopEvent::ActionStarted {
                round: 1,
                name: "search_contacts".to_string(),
                invocation: "search_contacts: John".to_string(),
            },
            LoopEvent::ActionFinished {
                round: 1,
                name: "search_contacts".to_string(),
                invocation: "search_contacts: John".to_string(),
                is_error: false,
            },
            LoopEvent::ActionStarted {
                round: 2,
                name: "order_pizza".to_string(),
                invocation: "order_pizza: {}".to_string(),
            },
            LoopEvent::ActionFinished {
                round: 2,
                name: "order_pizza".to_string(),
                invocation: "order_pizza: {}".to_string(),
                is_error: true,
            },
        ]
    );
}

#[tokio::test]
async fn seeded_conversation_keeps_its_instruction() {
    let stubs = Stubs::new();
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse::text("Hi"))]);

    let conversation = Conversation::new("Answer briefly.".to_string(), utterance());
    stubs
        .command_loop(backend.clone())
        .run_conversation(conversation)
        .await
        .unwrap();

    assert_eq!(backend.requests()[0].system_instruction, "Answer briefly.");
}
