//! Interaction router tests
//!
//! Classification, context resolution, not-found handling and failure
//! containment.

mod common;

use common::*;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use modhost::gateway::{GatewayEvent, Message, ResponseBody, SharedSink};
use modhost::interaction::types::codes;
use modhost::interaction::{ContextProvider, DispatchOutcome, ExecutionError, InteractionRouter};
use modhost::module::{Action, ModuleError, ModuleHost, ModuleManager, ModuleSource};
use modhost::settings::{MemoryTenantDirectory, SettingsModule};
use modhost::storage::{MemorySettingsStore, SettingsRecord, SettingsStore};

async fn host(sources: Vec<Box<dyn ModuleSource>>) -> ModuleHost {
    ModuleManager::new(sources).start().await.unwrap()
}

fn router(host: &ModuleHost, sink: Arc<RecordingSink>) -> InteractionRouter {
    let sink: SharedSink = sink;
    InteractionRouter::new(host, ContextProvider::disabled(), sink)
}

#[tokio::test]
async fn command_reaches_handler() {
    let echo = EchoCommand::new("ping", "pong");
    let calls = Arc::clone(&echo.calls);
    let host = host(vec![source_with("core", move |d| {
        d.with_command(EchoCommand {
            name: "ping",
            reply: "pong",
            calls: Arc::clone(&calls),
        })
    })])
    .await;
    let sink = RecordingSink::new();
    let router = router(&host, Arc::clone(&sink));

    let outcome = router.dispatch(raw_command("i1", Some("g1"), "ping")).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.responses()[0].interaction_id, "i1");
    assert_eq!(sink.messages(), vec![Message::text("pong")]);
}

#[tokio::test]
async fn unknown_targets_are_no_ops() {
    let host = host(vec![source_with("core", |d| d)]).await;
    let sink = RecordingSink::new();
    let router = router(&host, Arc::clone(&sink));

    assert_eq!(
        router.dispatch(raw_command("i1", None, "nothing")).await,
        DispatchOutcome::NotFound
    );
    assert_eq!(
        router.dispatch(raw_component("i2", "missing:button")).await,
        DispatchOutcome::NotFound
    );
    assert_eq!(
        router.dispatch_event("unknownEvent", &json!({})).await,
        DispatchOutcome::NotFound
    );
    assert!(sink.responses().is_empty());
}

#[tokio::test]
async fn unsupported_kinds_are_dropped() {
    let host = host(vec![source_with("core", |d| d)]).await;
    let router = router(&host, RecordingSink::new());

    let mut ping = raw_command("i1", None, "ping");
    ping.kind = codes::PING;
    assert_eq!(router.dispatch(ping).await, DispatchOutcome::Dropped);

    let mut empty = raw_command("i2", None, "ping");
    empty.data = None;
    assert_eq!(router.dispatch(empty).await, DispatchOutcome::Dropped);
}

#[tokio::test]
async fn components_route_by_prefix() {
    let host = host(vec![source_with("tickets", |d| {
        d.with_component(EchoComponent("ticket"))
    })])
    .await;
    let sink = RecordingSink::new();
    let router = router(&host, Arc::clone(&sink));

    let outcome = router.dispatch(raw_component("i1", "ticket:close:42")).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(sink.messages(), vec![Message::text("ticket:close:42")]);
}

#[tokio::test]
async fn failures_reply_through_error_hook() {
    let host = host(vec![source_with("core", |d| {
        d.with_command(FailingCommand {
            name: "strict",
            error: ExecutionError::user("Invalid value."),
        })
        .with_command(FailingCommand {
            name: "broken",
            error: ExecutionError::Internal("db down".to_string()),
        })
    })])
    .await;
    let sink = RecordingSink::new();
    let router = router(&host, Arc::clone(&sink));

    assert_eq!(
        router.dispatch(raw_command("i1", None, "strict")).await,
        DispatchOutcome::Failed
    );
    assert_eq!(sink.last_description().as_deref(), Some("Invalid value."));
    assert!(sink.messages()[0].ephemeral);

    assert_eq!(
        router.dispatch(raw_command("i2", None, "broken")).await,
        DispatchOutcome::Failed
    );
    let shown = sink.last_description().unwrap();
    assert!(!shown.contains("db down"));
}

#[tokio::test]
async fn panics_are_contained() {
    let host = host(vec![source_with("core", |d| {
        d.with_command(PanickingCommand)
            .with_command(EchoCommand::new("ping", "pong"))
    })])
    .await;
    let sink = RecordingSink::new();
    let router = router(&host, Arc::clone(&sink));

    let explode = GatewayEvent::Interaction {
        interaction: raw_command("i1", None, "explode"),
    };
    assert_eq!(router.handle_guarded(explode).await, DispatchOutcome::Panicked);

    let ping = GatewayEvent::Interaction {
        interaction: raw_command("i2", None, "ping"),
    };
    assert_eq!(router.handle_guarded(ping).await, DispatchOutcome::Handled);
    assert_eq!(sink.messages(), vec![Message::text("pong")]);
}

#[tokio::test]
async fn run_loop_survives_panics_and_drains() {
    let host = host(vec![source_with("core", |d| {
        d.with_command(PanickingCommand)
            .with_command(EchoCommand::new("ping", "pong"))
    })])
    .await;
    let sink = RecordingSink::new();
    let router = Arc::new(router(&host, Arc::clone(&sink)));

    let (tx, rx) = mpsc::channel(8);
    let (_stop_tx, stop_rx) = watch::channel(false);
    for (id, name) in [("i1", "explode"), ("i2", "ping"), ("i3", "explode"), ("i4", "ping")] {
        tx.send(GatewayEvent::Interaction {
            interaction: raw_command(id, None, name),
        })
        .await
        .unwrap();
    }
    drop(tx);

    router.run(rx, stop_rx).await;

    let mut answered: Vec<String> = sink
        .responses()
        .into_iter()
        .map(|r| r.interaction_id)
        .collect();
    answered.sort();
    assert_eq!(answered, vec!["i2", "i4"]);
}

#[tokio::test]
async fn run_loop_stops_on_shutdown() {
    let host = host(vec![source_with("core", |d| d)]).await;
    let router = Arc::new(router(&host, RecordingSink::new()));

    let (_tx, rx) = mpsc::channel::<GatewayEvent>(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(router.run(rx, stop_rx));
    stop_tx.send_replace(true);
    handle.await.unwrap();
}

#[tokio::test]
async fn events_receive_payloads() {
    let event = CountingEvent::new("memberJoin");
    let seen = Arc::clone(&event.seen);
    let host = host(vec![source_with("core", move |d| {
        d.with_event(CountingEvent {
            name: "memberJoin",
            seen: Arc::clone(&seen),
        })
    })])
    .await;
    let router = router(&host, RecordingSink::new());

    let outcome = router
        .handle(GatewayEvent::Dispatch {
            name: "memberJoin".to_string(),
            payload: json!({"user": "u1"}),
        })
        .await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(*event.seen.lock().unwrap(), vec![json!({"user": "u1"})]);
}

#[tokio::test]
async fn context_provider_fetches_or_creates_settings() {
    let store = Arc::new(MemorySettingsStore::new());
    let settings: Box<dyn ModuleSource> = Box::new(SettingsModule::new(
        store.clone(),
        Arc::new(MemoryTenantDirectory::new()),
    ));
    let host = host(vec![
        settings,
        source_with("probe", |d| d.with_command(SettingsProbe)),
    ])
    .await;
    let provider =
        ContextProvider::from_registry(&host.actions(), "settings", "getSettings", "createSettings")
            .unwrap();
    assert!(provider.is_enabled());

    let sink = RecordingSink::new();
    let shared: SharedSink = sink.clone();
    let router = InteractionRouter::new(&host, provider, shared);

    router.dispatch(raw_command("i1", Some("g7"), "probe")).await;
    let created = store.get("g7").await.unwrap().unwrap();

    router.dispatch(raw_command("i2", Some("g7"), "probe")).await;
    assert_eq!(store.get("g7").await.unwrap().unwrap().id, created.id);

    router.dispatch(raw_command("i3", None, "probe")).await;
    assert_eq!(
        sink.messages(),
        vec![
            Message::text("settings:g7"),
            Message::text("settings:g7"),
            Message::text("no settings"),
        ]
    );
}

#[tokio::test]
async fn missing_provider_degrades_to_empty_context() {
    let host = host(vec![source_with("probe", |d| d.with_command(SettingsProbe))]).await;
    let provider =
        ContextProvider::from_registry(&host.actions(), "settings", "getSettings", "createSettings")
            .unwrap();
    assert!(!provider.is_enabled());

    let sink = RecordingSink::new();
    let shared: SharedSink = sink.clone();
    let router = InteractionRouter::new(&host, provider, shared);
    router.dispatch(raw_command("i1", Some("g1"), "probe")).await;
    assert_eq!(sink.messages(), vec![Message::text("no settings")]);
}

#[tokio::test]
async fn provider_with_wrong_signature_is_rejected() {
    let host = host(vec![source_with("settings", |d| {
        d.with_action("getSettings", Action::new(|n: u64| async move { Ok(n) }))
            .with_action(
                "createSettings",
                Action::new(|tenant: String| async move { Ok(SettingsRecord::new(tenant)) }),
            )
    })])
    .await;

    let err =
        ContextProvider::from_registry(&host.actions(), "settings", "getSettings", "createSettings")
            .unwrap_err();
    assert!(matches!(err, ModuleError::ActionSignatureMismatch { .. }));
}

#[tokio::test]
async fn autocomplete_defaults_to_no_choices() {
    let host = host(vec![source_with("core", |d| {
        d.with_command(EchoCommand::new("ping", "pong"))
    })])
    .await;
    let sink = RecordingSink::new();
    let router = router(&host, Arc::clone(&sink));

    let mut raw = raw_command("i1", None, "ping");
    raw.kind = codes::AUTOCOMPLETE;
    assert_eq!(router.dispatch(raw).await, DispatchOutcome::Handled);
    assert_eq!(
        sink.responses()[0].body,
        ResponseBody::Autocomplete { choices: Vec::new() }
    );
}
