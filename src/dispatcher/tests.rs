//! Tests for the command dispatcher

use super::*;
use crate::error::TransportError;
use crate::mixer::testing::{snapshot, ScriptedTransport};
use crate::mixer::API_PATH;
use crate::sync::{EngineEvent, EngineSettings};
use parking_lot::Mutex;
use std::time::Duration;

/// Connected dispatcher over a transport serving `snapshot` and answering
/// commands with `on_command(path, nth)`
async fn connected<F>(
    active: Option<&str>,
    preview: Option<&str>,
    on_command: F,
) -> (Dispatcher, Arc<ScriptedTransport>)
where
    F: Fn(&str, usize) -> std::result::Result<String, TransportError> + Send + Sync + 'static,
{
    let xml = snapshot(4, active, preview);
    let transport = Arc::new(ScriptedTransport::new(move |path, nth| {
        if path == API_PATH {
            Ok(xml.clone())
        } else {
            on_command(path, nth)
        }
    }));
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&transport) as Arc<dyn crate::mixer::Transport>,
        EngineSettings {
            poll_interval: Duration::from_secs(3600),
            ..EngineSettings::default()
        },
    ));
    engine.connect("10.0.0.5", 8088).await.unwrap();
    (Dispatcher::new(engine), transport)
}

fn accept_all(_: &str, _: usize) -> std::result::Result<String, TransportError> {
    Ok(String::new())
}

#[tokio::test]
async fn test_preview_input_updates_local_state() {
    let (dispatcher, transport) = connected(Some("1"), Some("2"), accept_all).await;
    let events: Arc<Mutex<Vec<EngineEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    dispatcher
        .engine()
        .subscribe(Arc::new(move |event: EngineEvent| sink.lock().push(event)));

    let outcome = dispatcher.preview_input("3").await.unwrap();

    assert_eq!(outcome.message, "📺 Set to preview: V3");
    assert_eq!(dispatcher.engine().state().preview.as_deref(), Some("3"));
    assert_eq!(transport.commands(), vec!["/api/?Function=PreviewInput&Input=3"]);
    assert_eq!(
        events.lock().clone(),
        vec![EngineEvent::StateChanged {
            active: Some("1".to_string()),
            preview: Some("3".to_string()),
        }]
    );
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_preview_input_failure_leaves_state() {
    let (dispatcher, _) = connected(Some("1"), Some("2"), |_, _| Err(TransportError::HttpError(500))).await;

    let err = dispatcher.preview_input("3").await.unwrap_err();

    assert_eq!(err, MixerError::Transport(TransportError::HttpError(500)));
    assert_eq!(dispatcher.engine().state().preview.as_deref(), Some("2"));
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_quick_play_fades_preview_to_program() {
    let (dispatcher, transport) = connected(Some("1"), Some("3"), accept_all).await;

    let outcome = dispatcher.quick_play().await.unwrap();

    assert!(outcome.message.contains("Smooth transition to V3"));
    assert_eq!(dispatcher.engine().state().active.as_deref(), Some("3"));
    assert_eq!(transport.commands(), vec!["/api/?Function=Fade&Input=3"]);
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_quick_play_falls_back_to_cut() {
    let (dispatcher, transport) = connected(Some("1"), Some("3"), |path, _| {
        if path.contains("Function=Fade") {
            Err(TransportError::HttpError(500))
        } else {
            Ok(String::new())
        }
    })
    .await;

    let outcome = dispatcher.quick_play().await.unwrap();

    assert!(outcome.message.contains("Cut transition to V3"));
    assert_eq!(dispatcher.engine().state().active.as_deref(), Some("3"));
    assert_eq!(
        transport.commands(),
        vec!["/api/?Function=Fade&Input=3", "/api/?Function=Cut&Input=3"]
    );
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_quick_play_reports_failure_when_both_fail() {
    let (dispatcher, transport) = connected(Some("1"), Some("3"), |_, _| Err(TransportError::TimedOut)).await;

    let err = dispatcher.quick_play().await.unwrap_err();

    assert_eq!(err, MixerError::Transport(TransportError::TimedOut));
    assert_eq!(dispatcher.engine().state().active.as_deref(), Some("1"));
    // One fade, one cut, no retries
    assert_eq!(transport.commands().len(), 2);
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_quick_play_requires_preview() {
    let (dispatcher, transport) = connected(Some("1"), None, accept_all).await;

    let err = dispatcher.quick_play().await.unwrap_err();

    assert_eq!(err, MixerError::precondition("no preview selected"));
    assert!(transport.commands().is_empty());
    dispatcher.engine().disconnect();
}

/// FadeToBlack commands fail on the `fail_at`-th send (0-based)
fn fail_ftb_at(
    fail_at: usize,
) -> impl Fn(&str, usize) -> std::result::Result<String, TransportError> + Send + Sync + 'static {
    move |path: &str, nth: usize| {
        if path.contains("FadeToBlack") && nth == fail_at {
            Err(TransportError::HttpError(500))
        } else {
            Ok(String::new())
        }
    }
}

#[tokio::test]
async fn test_fade_to_black_twice_second_fails() {
    let (dispatcher, transport) = connected(Some("1"), Some("2"), fail_ftb_at(1)).await;

    let first = dispatcher.toggle_fade_to_black().await;
    let second = dispatcher.toggle_fade_to_black().await;

    assert!(first.is_ok());
    assert!(second.is_err());
    assert!(!dispatcher.engine().fade_to_black().active);
    assert!(!dispatcher.engine().blink_phase());
    assert_eq!(
        transport.commands(),
        vec!["/api/?Function=FadeToBlack", "/api/?Function=FadeToBlack"]
    );
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_fade_to_black_failed_enable_reverts() {
    let (dispatcher, _) = connected(Some("1"), Some("2"), fail_ftb_at(0)).await;
    let events: Arc<Mutex<Vec<EngineEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    dispatcher
        .engine()
        .subscribe(Arc::new(move |event: EngineEvent| sink.lock().push(event)));

    assert!(dispatcher.toggle_fade_to_black().await.is_err());
    assert!(!dispatcher.engine().fade_to_black().active);

    // Blink timer stopped with the flag
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!events
        .lock()
        .iter()
        .any(|e| matches!(e, EngineEvent::FadeToBlackBlink(_))));

    // Next toggle enables again
    dispatcher.toggle_fade_to_black().await.unwrap();
    assert!(dispatcher.engine().fade_to_black().active);
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_toggle_overlay_flips_one_layer() {
    let (dispatcher, transport) = connected(Some("1"), Some("2"), accept_all).await;

    dispatcher.toggle_overlay(2).await.unwrap();
    let overlays = dispatcher.engine().overlays();
    assert!(overlays.is_on(2));
    assert_eq!(overlays.iter().filter(|(_, on)| *on).count(), 1);

    dispatcher.toggle_overlay(2).await.unwrap();
    assert!(!dispatcher.engine().overlays().is_on(2));

    assert_eq!(
        transport.commands(),
        vec![
            "/api/?Function=OverlayInput2&Input=2",
            "/api/?Function=OverlayInput2&Input=2",
        ]
    );
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_toggle_overlay_preconditions() {
    let (dispatcher, transport) = connected(Some("1"), None, accept_all).await;

    assert_eq!(
        dispatcher.toggle_overlay(1).await.unwrap_err(),
        MixerError::precondition("no preview selected")
    );
    assert!(matches!(
        dispatcher.toggle_overlay(5).await,
        Err(MixerError::PreconditionFailed(_))
    ));
    assert!(transport.commands().is_empty());
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_toggle_overlay_failure_keeps_flag() {
    let (dispatcher, _) = connected(Some("1"), Some("2"), |_, _| Err(TransportError::HttpError(500))).await;

    assert!(dispatcher.toggle_overlay(3).await.is_err());
    assert!(!dispatcher.engine().overlays().is_on(3));
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_remove_all_overlays_continues_past_rejected_layer() {
    let (dispatcher, transport) = connected(Some("1"), Some("2"), |path, _| {
        if path.contains("OverlayInput3Out") {
            Err(TransportError::HttpError(500))
        } else {
            Ok(String::new())
        }
    })
    .await;
    for layer in 1..=4 {
        dispatcher.toggle_overlay(layer).await.unwrap();
    }

    let outcome = dispatcher.remove_all_overlays().await;

    assert!(outcome.is_ok());
    assert!(!dispatcher.engine().overlays().any_on());
    let outs: Vec<_> = transport
        .commands()
        .into_iter()
        .filter(|path| path.ends_with("Out"))
        .collect();
    assert_eq!(
        outs,
        vec![
            "/api/?Function=OverlayInput1Out",
            "/api/?Function=OverlayInput2Out",
            "/api/?Function=OverlayInput3Out",
            "/api/?Function=OverlayInput4Out",
        ]
    );
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_remove_all_overlays_reports_hard_failure() {
    let (dispatcher, transport) = connected(Some("1"), Some("2"), |path, _| {
        if path.contains("OverlayInput2Out") {
            Err(TransportError::TimedOut)
        } else {
            Ok(String::new())
        }
    })
    .await;
    dispatcher.toggle_overlay(1).await.unwrap();

    let err = dispatcher.remove_all_overlays().await.unwrap_err();

    assert_eq!(err, MixerError::Transport(TransportError::TimedOut));
    assert!(!dispatcher.engine().overlays().any_on());
    assert_eq!(
        transport.commands().iter().filter(|p| p.ends_with("Out")).count(),
        4
    );
    dispatcher.engine().disconnect();
}

#[tokio::test]
async fn test_commands_require_connection() {
    let transport = Arc::new(ScriptedTransport::serving(&snapshot(1, None, None)));
    let engine = Arc::new(SyncEngine::new(transport.clone(), EngineSettings::default()));
    let dispatcher = Dispatcher::new(engine);

    assert!(matches!(
        dispatcher.preview_input("1").await,
        Err(MixerError::PreconditionFailed(_))
    ));
    assert!(dispatcher.quick_play().await.is_err());
    assert!(dispatcher.toggle_fade_to_black().await.is_err());
    assert!(dispatcher.remove_all_overlays().await.is_err());
    assert!(!dispatcher.engine().fade_to_black().active);
    assert!(transport.requests().is_empty());
}
