//! Several engines, one database file, many threads.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

use convene_core::{Engine, EventDraft, NewUser, Policy};
use convene_shared::{ConversationId, ConversationStatus, EventId, UserId};

use chrono::{NaiveDate, NaiveTime};

const WORKERS: usize = 8;

struct Fixture {
    _dir: tempfile::TempDir,
    path: PathBuf,
    host: UserId,
    event: EventId,
}

fn fixture(max_attendees: u32) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("convene.db");
    let engine = Engine::open_at(&path, Policy::default()).unwrap();

    let host = register(&engine, "host");
    let event = engine
        .create_event(
            host,
            EventDraft {
                title: "Harbour cleanup".into(),
                description: String::new(),
                category_id: None,
                max_attendees,
                start_date: NaiveDate::from_ymd_opt(2030, 4, 22).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2030, 4, 22).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                street: "Quai des Belges".into(),
                city: "Marseille".into(),
                state: "PACA".into(),
                postal_code: "13001".into(),
            },
        )
        .unwrap();

    Fixture {
        _dir: dir,
        path,
        host,
        event: event.id,
    }
}

fn register(engine: &Engine, name: &str) -> UserId {
    engine
        .register_user(NewUser {
            name: name.into(),
            email: format!("{name}@example.com"),
            password_hash: "hash".into(),
        })
        .unwrap()
        .id
}

/// Run `work` on `WORKERS` threads, each with its own engine, released
/// together.
fn race<T, F>(path: &Path, work: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize, &Engine) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(WORKERS));
    let work = Arc::new(work);

    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let work = Arc::clone(&work);
            let path = path.to_path_buf();
            thread::spawn(move || {
                let engine = Engine::open_at(&path, Policy::default()).unwrap();
                barrier.wait();
                work(i, &engine)
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn parallel_confirmations_of_distinct_conversations_all_count() {
    let fx = fixture(100);
    let engine = Engine::open_at(&fx.path, Policy::default()).unwrap();

    let conversations: Vec<ConversationId> = (0..WORKERS)
        .map(|i| {
            let guest = register(&engine, &format!("guest{i}"));
            engine
                .submit_request(fx.event, guest, "Can I help?")
                .unwrap()
                .conversation
                .id
        })
        .collect();

    let host = fx.host;
    let results = race(&fx.path, move |i, engine| {
        engine.transition_status(conversations[i], host, ConversationStatus::Confirmed)
    });
    assert!(results.iter().all(|r| r.is_ok()));

    let event = engine.get_event(fx.event).unwrap();
    assert_eq!(event.event.confirmed_attendees, WORKERS as u32);
}

#[test]
fn parallel_confirmations_of_one_conversation_count_once() {
    let fx = fixture(100);
    let engine = Engine::open_at(&fx.path, Policy::default()).unwrap();
    let guest = register(&engine, "guest");
    let conversation = engine
        .submit_request(fx.event, guest, "Hello")
        .unwrap()
        .conversation
        .id;

    let host = fx.host;
    let results = race(&fx.path, move |_, engine| {
        engine.transition_status(conversation, host, ConversationStatus::Confirmed)
    });
    assert!(results.iter().all(|r| r.is_ok()));

    let event = engine.get_event(fx.event).unwrap();
    assert_eq!(event.event.confirmed_attendees, 1);
}

#[test]
fn parallel_submissions_share_one_conversation() {
    let fx = fixture(100);
    let engine = Engine::open_at(&fx.path, Policy::default()).unwrap();
    let guest = register(&engine, "guest");

    let event = fx.event;
    let outcomes = race(&fx.path, move |i, engine| {
        engine
            .submit_request(event, guest, &format!("message {i}"))
            .unwrap()
    });

    let first = outcomes[0].conversation.id;
    assert!(outcomes.iter().all(|o| o.conversation.id == first));
    assert_eq!(outcomes.iter().filter(|o| o.is_new_conversation).count(), 1);

    let thread = engine.get_thread(first).unwrap();
    assert_eq!(thread.messages.len(), WORKERS);
}

#[test]
fn parallel_confirm_and_reject_leave_a_consistent_counter() {
    let fx = fixture(100);
    let engine = Engine::open_at(&fx.path, Policy::default()).unwrap();
    let guest = register(&engine, "guest");
    let conversation = engine
        .submit_request(fx.event, guest, "Hello")
        .unwrap()
        .conversation
        .id;

    let host = fx.host;
    race(&fx.path, move |i, engine| {
        let status = if i % 2 == 0 {
            ConversationStatus::Confirmed
        } else {
            ConversationStatus::Rejected
        };
        engine
            .transition_status(conversation, host, status)
            .unwrap()
    });

    let thread = engine.get_thread(conversation).unwrap();
    let expected = match thread.conversation.status {
        ConversationStatus::Confirmed => 1,
        _ => 0,
    };
    let event = engine.get_event(fx.event).unwrap();
    assert_eq!(event.event.confirmed_attendees, expected);
}
