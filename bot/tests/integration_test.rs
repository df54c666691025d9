//! Integration tests for kirppu
//!
//! These tests drive whole conversations through the dispatcher against the
//! in-memory ad service and the canned advisor, and assert on the remote
//! traffic the conversation produced.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use kirppu::chat::{ChatError, ChatPort, Choice, MessageId};
use kirppu::config::Config;
use kirppu::dispatch::Dispatcher;
use kirppu::event::{InboundEvent, PhotoPayload, PhotoVariant, UserId};
use kirppu::market::memory::InMemoryMarket;
use kirppu::market::{CategoryCandidate, DraftId};
use kirppu::session::{Deps, SessionHandle, SessionView};
use kirppu::{DraftState, StubAdvisor};

// =============================================================================
// Test fixtures
// =============================================================================

/// Chat sink that records every outbound message and keyboard
#[derive(Default)]
struct RecordingChat {
    texts: Mutex<Vec<String>>,
    keyboards: Mutex<Vec<(String, Vec<Choice>)>>,
    next_id: Mutex<i64>,
}

impl RecordingChat {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    fn keyboards(&self) -> Vec<(String, Vec<Choice>)> {
        self.keyboards.lock().unwrap().clone()
    }

    fn next(&self) -> MessageId {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        MessageId(*id)
    }
}

#[async_trait]
impl ChatPort for RecordingChat {
    async fn send_text(&self, _user: UserId, text: &str) -> Result<MessageId, ChatError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(self.next())
    }

    async fn send_choices(&self, _user: UserId, text: &str, choices: &[Choice]) -> Result<MessageId, ChatError> {
        self.keyboards.lock().unwrap().push((text.to_string(), choices.to_vec()));
        Ok(self.next())
    }

    async fn send_status(&self, _user: UserId) -> Result<(), ChatError> {
        Ok(())
    }
}

struct Harness {
    market: Arc<InMemoryMarket>,
    chat: Arc<RecordingChat>,
    dispatcher: Dispatcher,
}

fn harness() -> Harness {
    harness_with(StubAdvisor::new())
}

fn harness_with(advisor: StubAdvisor) -> Harness {
    let mut config = Config::default();
    config.session.album_window_ms = 200;
    config.session.status_tick_ms = 60_000;

    let market = Arc::new(InMemoryMarket::new());
    let chat = Arc::new(RecordingChat::default());
    let dispatcher = Dispatcher::new(Deps {
        market: market.clone(),
        advisory: Arc::new(advisor),
        chat: chat.clone(),
        config: Arc::new(config),
    });
    Harness {
        market,
        chat,
        dispatcher,
    }
}

fn photo() -> InboundEvent {
    InboundEvent::Photo(PhotoPayload {
        variants: vec![PhotoVariant {
            width: 1280,
            height: 960,
            data: vec![0xde, 0xad],
            mime: "image/jpeg".to_string(),
        }],
        caption: None,
    })
}

fn text(s: &str) -> InboundEvent {
    InboundEvent::Text {
        text: s.to_string(),
        reply_to: None,
    }
}

fn callback(data: &str) -> InboundEvent {
    InboundEvent::Callback {
        data: data.to_string(),
    }
}

/// Poll until no album, creation or remote flow is in flight
async fn settle(handle: &SessionHandle) -> SessionView {
    for _ in 0..600 {
        let view = handle.inspect().await.expect("session actor gone");
        if !view.creating && view.busy.is_none() && view.album_photos == 0 {
            return view;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("session never settled");
}

// =============================================================================
// Concurrency and album aggregation
// =============================================================================

#[tokio::test]
async fn test_fifty_concurrent_photos_one_create_call() {
    let h = harness();
    let user = UserId(1);
    let handle = h.dispatcher.session(user).await;

    // 50 tasks race their photo into the same session
    let mut tasks = Vec::new();
    for _ in 0..50 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle.submit(photo()).await.expect("submit failed");
        }));
    }
    for task in tasks {
        task.await.expect("submit task panicked");
    }

    let view = settle(&handle).await;
    assert!(view.has_draft);
    assert_eq!(view.image_count, 50);
    assert_eq!(h.market.counters.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.market.counters.upload_calls.load(Ordering::SeqCst), 50);
    // One patch committed title, description and all fifty images
    assert_eq!(view.version_token.as_deref(), Some("v1"));
    assert_eq!(h.market.counters.conflicts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sessions_do_not_interfere() {
    let h = harness();
    let a = h.dispatcher.session(UserId(1)).await;
    let b = h.dispatcher.session(UserId(2)).await;

    a.submit_and_wait(photo()).await.unwrap();
    b.submit_and_wait(photo()).await.unwrap();

    let view_a = settle(&a).await;
    let view_b = settle(&b).await;
    assert!(view_a.has_draft);
    assert!(view_b.has_draft);
    assert_eq!(h.market.counters.create_calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// End-to-end publish
// =============================================================================

#[tokio::test]
async fn test_end_to_end_publish() {
    let h = harness();
    h.market.set_candidates(vec![
        CategoryCandidate {
            id: "bikes".to_string(),
            label: "Bicycles".to_string(),
        },
        CategoryCandidate {
            id: "parts".to_string(),
            label: "Bike parts".to_string(),
        },
    ]);
    h.market
        .set_attributes(vec![InMemoryMarket::attr("condition", "Condition", &[("good", "Good"), ("worn", "Worn")])]);

    let user = UserId(1);
    let handle = h.dispatcher.session(user).await;

    // Photos arrive, the draft is created and the category keyboard shows
    handle.submit_and_wait(photo()).await.unwrap();
    handle.submit_and_wait(photo()).await.unwrap();
    let view = settle(&handle).await;
    assert_eq!(view.state, Some(DraftState::AwaitingCategory));
    let keyboards = h.chat.keyboards();
    let (_, choices) = keyboards.last().expect("no category keyboard");
    assert!(choices.iter().any(|c| c.data == "cat:bikes"));

    // Category, attribute, price, shipping, postal code
    handle.submit_and_wait(callback("cat:bikes")).await.unwrap();
    let view = settle(&handle).await;
    assert_eq!(view.state, Some(DraftState::AwaitingAttribute { index: 0 }));

    handle.submit_and_wait(text("Good")).await.unwrap();
    handle.submit_and_wait(text("1 000 eur")).await.unwrap();
    handle.submit_and_wait(callback("ship:yes")).await.unwrap();
    handle.submit_and_wait(text("00100")).await.unwrap();

    let view = handle.inspect().await.unwrap();
    assert_eq!(view.state, Some(DraftState::ReadyToPublish));

    // The summary keyboard offers publish
    let keyboards = h.chat.keyboards();
    let (summary, choices) = keyboards.last().expect("no summary keyboard");
    assert!(summary.contains("1000 €"));
    assert!(choices.iter().any(|c| c.data == "publish"));

    handle.submit_and_wait(callback("publish")).await.unwrap();
    let view = settle(&handle).await;

    assert!(!view.has_draft);
    assert_eq!(h.market.counters.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.market.counters.update_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.market.counters.publish_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.market.counters.conflicts.load(Ordering::SeqCst), 0);
    assert!(h.market.is_published(&DraftId("draft-1".to_string())));
    assert!(h.chat.texts().iter().any(|t| t.starts_with("Published!")));
}

#[tokio::test]
async fn test_advisor_prefills_category_and_attributes() {
    let advisor = StubAdvisor::new().with_category("bikes").with_attributes(
        [("gears".to_string(), "21".to_string())].into_iter().collect(),
    );
    let h = harness_with(advisor);
    h.market.set_candidates(vec![CategoryCandidate {
        id: "bikes".to_string(),
        label: "Bicycles".to_string(),
    }]);
    h.market.set_attributes(vec![
        InMemoryMarket::attr("gears", "Gears", &[("21", "21"), ("3", "3")]),
        InMemoryMarket::attr("condition", "Condition", &[("good", "Good"), ("worn", "Worn")]),
    ]);

    let handle = h.dispatcher.session(UserId(1)).await;
    handle.submit_and_wait(photo()).await.unwrap();
    let view = settle(&handle).await;

    // The advisor committed "bikes" on its own and resolved the gear
    // count; condition is manual-only, so it is the one question left
    assert_eq!(view.state, Some(DraftState::AwaitingAttribute { index: 0 }));
    let prompts = h.chat.texts();
    assert!(prompts.iter().any(|t| t.contains("Condition")));
    assert!(!prompts.iter().any(|t| t.contains("Gears?")));
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_publish_failure_allows_retry() {
    let h = harness();
    let handle = h.dispatcher.session(UserId(1)).await;

    handle.submit_and_wait(photo()).await.unwrap();
    settle(&handle).await;
    handle.submit_and_wait(callback("cat:misc")).await.unwrap();
    settle(&handle).await;
    handle.submit_and_wait(text("50€")).await.unwrap();
    handle.submit_and_wait(callback("ship:no")).await.unwrap();
    handle.submit_and_wait(text("00100")).await.unwrap();

    let view = handle.inspect().await.unwrap();
    let before = view.version_token;

    h.market.fail_next_publish("maintenance window");
    handle.submit_and_wait(text("/publish")).await.unwrap();
    let view = settle(&handle).await;

    // The draft survives a failed publish and keeps tracking the token the
    // final update advanced, so the retry is not doomed to a conflict
    assert!(view.has_draft);
    assert_eq!(view.state, Some(DraftState::ReadyToPublish));
    assert_ne!(view.version_token, before);
    assert!(h.chat.texts().iter().any(|t| t.contains("Publishing failed")));

    handle.submit_and_wait(text("/publish")).await.unwrap();
    let view = settle(&handle).await;
    assert!(!view.has_draft);
    assert_eq!(h.market.counters.publish_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.market.counters.conflicts.load(Ordering::SeqCst), 0);
    assert!(h.market.is_published(&DraftId("draft-1".to_string())));
}

#[tokio::test]
async fn test_attribute_fetch_failure_allows_reselect() {
    let h = harness();
    let handle = h.dispatcher.session(UserId(1)).await;

    handle.submit_and_wait(photo()).await.unwrap();
    let view = settle(&handle).await;
    let before = view.version_token;

    // The category patch lands, then the attribute fetch blows up
    h.market.fail_next_attributes("schema service down");
    handle.submit_and_wait(callback("cat:misc")).await.unwrap();
    let view = settle(&handle).await;

    assert_eq!(view.state, Some(DraftState::AwaitingCategory));
    assert_ne!(view.version_token, before);
    assert!(h.chat.texts().iter().any(|t| t.contains("Couldn't set the category")));

    // Picking again works with the token the failed flow advanced
    handle.submit_and_wait(callback("cat:misc")).await.unwrap();
    let view = settle(&handle).await;
    assert_eq!(view.state, Some(DraftState::AwaitingPrice));
    assert_eq!(h.market.counters.conflicts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_analysis_creates_no_draft() {
    let advisor = StubAdvisor::new();
    advisor.fail_next_analysis("model overloaded");
    let h = harness_with(advisor);
    let handle = h.dispatcher.session(UserId(1)).await;

    handle.submit_and_wait(photo()).await.unwrap();
    let view = settle(&handle).await;

    assert!(!view.has_draft);
    assert_eq!(h.market.counters.create_calls.load(Ordering::SeqCst), 0);
    assert!(h.chat.texts().iter().any(|t| t.contains("Couldn't set up the listing")));
}

// =============================================================================
// Conversation odds and ends
// =============================================================================

#[tokio::test]
async fn test_reply_edits_title_before_publish() {
    let h = harness();
    let handle = h.dispatcher.session(UserId(1)).await;

    handle.submit_and_wait(photo()).await.unwrap();
    settle(&handle).await;

    // The first breadcrumb after creation carries the title; replying to
    // it replaces the title in the final listing
    let texts = h.chat.texts();
    let title_pos = texts
        .iter()
        .position(|t| t == "Secondhand item")
        .expect("title breadcrumb missing");
    let title_msg = MessageId(title_pos as i64 + 1);

    handle
        .submit_and_wait(InboundEvent::Text {
            text: "Trek 820, 21 gears".to_string(),
            reply_to: Some(title_msg),
        })
        .await
        .unwrap();
    assert!(h.chat.texts().iter().any(|t| t == "Title updated."));

    handle.submit_and_wait(callback("cat:misc")).await.unwrap();
    settle(&handle).await;
    handle.submit_and_wait(text("annetaan")).await.unwrap();
    handle.submit_and_wait(callback("ship:no")).await.unwrap();
    handle.submit_and_wait(text("00100")).await.unwrap();

    let keyboards = h.chat.keyboards();
    let (summary, _) = keyboards.last().expect("no summary keyboard");
    assert!(summary.contains("Trek 820, 21 gears"));
    assert!(summary.contains("give-away"));
}

#[tokio::test]
async fn test_cancel_clears_the_session() {
    let h = harness();
    let handle = h.dispatcher.session(UserId(1)).await;

    handle.submit_and_wait(photo()).await.unwrap();
    settle(&handle).await;
    handle.submit_and_wait(text("/cancel")).await.unwrap();

    let view = handle.inspect().await.unwrap();
    assert!(!view.has_draft);

    // A fresh burst starts a fresh draft
    handle.submit_and_wait(photo()).await.unwrap();
    let view = settle(&handle).await;
    assert!(view.has_draft);
    assert_eq!(h.market.counters.create_calls.load(Ordering::SeqCst), 2);
}
