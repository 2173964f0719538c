use super::*;
use crate::session::SessionEvent;
use crate::testing::{Probe, ScriptedResolver, fast_settings, track};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

struct Fixture {
    session: Session,
    events: Receiver<SessionEvent>,
    resolver: Arc<ScriptedResolver>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let resolver = Arc::new(ScriptedResolver::new(dir.path()));
    let (session, events) = Session::start(
        resolver.clone(),
        Probe::default().factory(),
        &fast_settings(dir.path()),
    )
    .unwrap();
    Fixture {
        session,
        events,
        resolver,
        _dir: dir,
    }
}

fn transcript(session: &Session, script: &str) -> String {
    let mut input = Cursor::new(script.as_bytes().to_vec());
    let mut out = Vec::new();
    run(session, &mut input, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn empty_session_reports_nothing() {
    let f = fixture();
    let out = transcript(&f.session, "queue\nnow\n");
    assert!(out.contains("(queue is empty)"));
    assert!(out.contains("Nothing is playing."));
}

#[test]
fn bad_input_gets_one_line_and_the_loop_continues() {
    let f = fixture();
    let out = transcript(&f.session, "bogus\nplay\n\nhelp\nquit\nqueue\n");
    assert!(out.contains("Unknown command. Type 'help' for usage.\n"));
    assert!(out.contains("Usage: play <query>\n"));
    assert!(out.contains("mix <url>"));
    // Nothing after `quit` is read.
    assert!(!out.contains("(queue is empty)"));
}

#[test]
fn play_prompts_and_enqueues_the_chosen_candidate() {
    let f = fixture();
    f.resolver
        .on_search("lofi", vec![track("a"), track("b").with_duration(Some(90))]);

    let out = transcript(&f.session, "play lofi\n2\n");
    assert!(out.contains("Search results:\n  1. Track a\n  2. Track b [1:30]\n"));
    assert!(out.contains("Choose a track number (default 1): "));
    assert!(out.contains("Enqueued: Track b [1:30]"));

    let ev = f.events.recv_timeout(Duration::from_secs(3)).unwrap();
    assert!(matches!(ev, SessionEvent::NowPlaying(t) if t.id == "b"));
}

#[test]
fn play_with_a_bad_choice_takes_the_first() {
    let f = fixture();
    f.resolver.on_search("lofi", vec![track("a"), track("b")]);

    let out = transcript(&f.session, "play lofi\nnine\n");
    assert!(out.contains("Enqueued: Track a"));
}

#[test]
fn play_reports_resolver_errors() {
    let f = fixture();
    f.resolver.on_search("void", Vec::new());
    let out = transcript(&f.session, "play void\n");
    assert!(out.contains("! no results for \"void\""));
    assert!(f.session.queue().is_empty());
}

#[test]
fn mix_enqueues_and_queue_lists_pending() {
    let f = fixture();
    let url = "https://example.test/watch?v=x&list=RDx";
    f.resolver
        .on_collection(url, ["m1", "m2", "m3"].map(track).to_vec());

    let out = transcript(&f.session, &format!("mix {url}\n"));
    assert!(out.contains("Enqueued 3 tracks from mix/playlist."));

    // Wait for the worker to take the first one so the listing is stable.
    let ev = f.events.recv_timeout(Duration::from_secs(3)).unwrap();
    assert!(matches!(ev, SessionEvent::NowPlaying(_)));
    let out = transcript(&f.session, "queue\nnow\n");
    assert!(out.contains("Queue:\n  1. Track m2\n  2. Track m3\n"));
    assert!(out.contains("Now playing: Track m1"));
}
