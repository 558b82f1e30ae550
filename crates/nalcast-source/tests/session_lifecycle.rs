//! Session lifecycle tests against scripted host handles.
//!
//! The fakes count every acquire, bind, poll and release so the tests can
//! check exactly-once release and the order in which the read path consults
//! its inputs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use bytes::Bytes;
use nalcast_source::{
    BindError, ByteSource, HostHandle, NalQueue, OversizePolicy, Owned, ParamSetSource,
    PayloadError, QueueError, Session, SessionState, SourceError, SourceOptions, StreamSize,
    ThreadBinder,
};

#[derive(Default)]
struct Ledger {
    queue_released: AtomicUsize,
    payload_released: AtomicUsize,
    polls: AtomicUsize,
    binds: AtomicUsize,
    bound_threads: Mutex<Vec<ThreadId>>,
}

/// Context handed out by the fake binder; remembers the thread it was made on.
struct FakeEnv {
    thread: ThreadId,
}

struct FakeBinder {
    ledger: Arc<Ledger>,
    fail: Arc<AtomicBool>,
}

impl ThreadBinder for FakeBinder {
    type Context = FakeEnv;

    fn bind(&self) -> Result<FakeEnv, BindError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BindError::Attach("thread limit reached".into()));
        }
        self.ledger.binds.fetch_add(1, Ordering::SeqCst);
        let thread = thread::current().id();
        self.ledger.bound_threads.lock().unwrap().push(thread);
        Ok(FakeEnv { thread })
    }
}

enum Step {
    Item(Vec<u8>),
    Timeout,
    Fail,
}

struct ScriptedQueue {
    script: Mutex<VecDeque<Step>>,
    ledger: Arc<Ledger>,
}

impl HostHandle for ScriptedQueue {
    fn release(self) {
        self.ledger.queue_released.fetch_add(1, Ordering::SeqCst);
    }
}

impl NalQueue<FakeEnv> for ScriptedQueue {
    fn poll(&self, cx: &mut FakeEnv, _timeout: Duration) -> Result<Option<Bytes>, QueueError> {
        assert_eq!(cx.thread, thread::current().id(), "context used off its thread");
        self.ledger.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Item(bytes)) => Ok(Some(Bytes::from(bytes))),
            Some(Step::Timeout) | None => Ok(None),
            Some(Step::Fail) => Err(QueueError::Runtime("InterruptedException".into())),
        }
    }
}

struct FakePayload {
    bytes: Option<Vec<u8>>,
    ledger: Arc<Ledger>,
}

impl HostHandle for FakePayload {
    fn release(self) {
        self.ledger.payload_released.fetch_add(1, Ordering::SeqCst);
    }
}

impl ParamSetSource<FakeEnv> for FakePayload {
    fn copy_bytes(&self, _cx: &mut FakeEnv) -> Result<Vec<u8>, PayloadError> {
        self.bytes
            .clone()
            .ok_or_else(|| PayloadError("array elements unavailable".into()))
    }
}

struct Harness {
    ledger: Arc<Ledger>,
    fail_bind: Arc<AtomicBool>,
    session: Session<FakeBinder, ScriptedQueue, FakePayload>,
}

fn harness(payload: Option<Option<Vec<u8>>>, script: Vec<Step>, options: SourceOptions) -> Harness {
    let ledger = Arc::new(Ledger::default());
    let fail_bind = Arc::new(AtomicBool::new(false));

    let binder = FakeBinder {
        ledger: ledger.clone(),
        fail: fail_bind.clone(),
    };
    let queue = Owned::new(
        "queue",
        ScriptedQueue {
            script: Mutex::new(script.into()),
            ledger: ledger.clone(),
        },
    );
    let payload = payload.map(|bytes| {
        Owned::new(
            "payload",
            FakePayload {
                bytes,
                ledger: ledger.clone(),
            },
        )
    });

    Harness {
        ledger,
        fail_bind,
        session: Session::new(binder, queue, payload, options),
    }
}

fn read_n(session: &mut impl ByteSource, capacity: usize) -> Result<Vec<u8>, SourceError> {
    let mut buf = vec![0u8; capacity];
    let n = session.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

#[test]
fn prepend_of_ten_with_four_byte_reads() {
    let payload: Vec<u8> = (1..=10).collect();
    let mut h = harness(
        Some(Some(payload.clone())),
        vec![Step::Item(vec![0xAA; 3])],
        SourceOptions::default(),
    );

    assert_eq!(h.session.open().unwrap(), StreamSize::Unbounded);
    assert_eq!(h.ledger.payload_released.load(Ordering::SeqCst), 1);

    let mut delivered = Vec::new();
    let mut sizes = Vec::new();
    for _ in 0..3 {
        let chunk = read_n(&mut h.session, 4).unwrap();
        sizes.push(chunk.len());
        delivered.extend(chunk);
        assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 0);
    }
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(delivered, payload);
    assert_eq!(h.session.prepend_remaining(), 0);

    assert_eq!(read_n(&mut h.session, 4).unwrap(), vec![0xAA; 3]);
    assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 1);
}

#[test]
fn prepend_chunks_follow_capacity() {
    for (len, capacity) in [(1usize, 1usize), (7, 3), (16, 16), (33, 8), (5, 100)] {
        let payload: Vec<u8> = (0..len as u8).collect();
        let mut h = harness(Some(Some(payload.clone())), vec![], SourceOptions::default());
        h.session.open().unwrap();

        let mut so_far = 0;
        while so_far < len {
            let chunk = read_n(&mut h.session, capacity).unwrap();
            assert_eq!(chunk.len(), capacity.min(len - so_far));
            assert_eq!(chunk, payload[so_far..so_far + chunk.len()]);
            so_far += chunk.len();
        }
        assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn without_payload_first_read_polls_queue() {
    let mut h = harness(None, vec![Step::Item(vec![7; 50])], SourceOptions::default());
    h.session.open().unwrap();

    let chunk = read_n(&mut h.session, 1500).unwrap();
    assert_eq!(chunk.len(), 50);
    assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 1);
}

#[test]
fn timeout_then_item_on_retry() {
    let mut h = harness(
        None,
        vec![Step::Timeout, Step::Item(vec![1, 2, 3])],
        SourceOptions::default(),
    );
    h.session.open().unwrap();

    assert_eq!(read_n(&mut h.session, 64).unwrap().len(), 0);
    assert_eq!(h.session.state(), SessionState::Opened);
    assert_eq!(read_n(&mut h.session, 64).unwrap(), vec![1, 2, 3]);
    assert_eq!(h.session.stats().timeouts, 1);
}

#[test]
fn oversized_item_truncates_under_truncate_policy() {
    let item: Vec<u8> = (0..10).collect();
    let mut h = harness(
        None,
        vec![Step::Item(item.clone()), Step::Item(vec![0xEE])],
        SourceOptions::default().with_oversize(OversizePolicy::Truncate),
    );
    h.session.open().unwrap();

    assert_eq!(read_n(&mut h.session, 4).unwrap(), item[..4]);
    // The rest of the first item is gone; the next read moves on.
    assert_eq!(read_n(&mut h.session, 4).unwrap(), vec![0xEE]);
    assert_eq!(h.session.stats().discarded_bytes, 6);
}

#[test]
fn oversized_item_is_retained_by_default() {
    let item: Vec<u8> = (0..10).collect();
    let mut h = harness(
        None,
        vec![Step::Item(item.clone()), Step::Item(vec![0xEE])],
        SourceOptions::default(),
    );
    h.session.open().unwrap();

    assert_eq!(read_n(&mut h.session, 4).unwrap(), item[..4]);
    assert_eq!(h.session.pending_len(), 6);
    assert_eq!(read_n(&mut h.session, 4).unwrap(), item[4..8]);
    assert_eq!(read_n(&mut h.session, 4).unwrap(), item[8..]);
    assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 1);
    assert_eq!(read_n(&mut h.session, 4).unwrap(), vec![0xEE]);
    assert_eq!(h.session.stats().discarded_bytes, 0);
}

#[test]
fn item_over_limit_is_fatal() {
    let mut h = harness(
        None,
        vec![Step::Item(vec![0; 64])],
        SourceOptions::default().with_max_item_len(32),
    );
    h.session.open().unwrap();

    assert!(matches!(
        read_n(&mut h.session, 1500),
        Err(SourceError::OversizedItem { len: 64, max: 32 })
    ));
    assert_eq!(h.session.state(), SessionState::Opened);
}

#[test]
fn queue_failure_is_fatal_but_distinct_from_timeout() {
    let mut h = harness(None, vec![Step::Fail, Step::Item(vec![9])], SourceOptions::default());
    h.session.open().unwrap();

    assert!(matches!(
        read_n(&mut h.session, 16),
        Err(SourceError::Queue(QueueError::Runtime(_)))
    ));
    assert_eq!(h.session.state(), SessionState::Opened);
    assert_eq!(read_n(&mut h.session, 16).unwrap(), vec![9]);
}

#[test]
fn bind_failure_fails_call_without_touching_state() {
    let mut h = harness(Some(Some(vec![1, 2, 3])), vec![], SourceOptions::default());
    h.session.open().unwrap();

    h.fail_bind.store(true, Ordering::SeqCst);
    assert!(matches!(
        read_n(&mut h.session, 2),
        Err(SourceError::Bind(BindError::Attach(_)))
    ));
    assert_eq!(h.session.prepend_remaining(), 3);

    h.fail_bind.store(false, Ordering::SeqCst);
    assert_eq!(read_n(&mut h.session, 2).unwrap(), vec![1, 2]);
}

#[test]
fn open_fails_when_runtime_unavailable() {
    let mut h = harness(Some(Some(vec![1])), vec![], SourceOptions::default());
    h.fail_bind.store(true, Ordering::SeqCst);

    assert!(matches!(h.session.open(), Err(SourceError::Bind(_))));
    assert_eq!(h.session.state(), SessionState::Uninitialized);
    assert_eq!(h.ledger.payload_released.load(Ordering::SeqCst), 0);
}

#[test]
fn payload_copy_failure_opens_without_prepend() {
    let mut h = harness(Some(None), vec![Step::Item(vec![5])], SourceOptions::default());
    h.session.open().unwrap();

    assert_eq!(h.ledger.payload_released.load(Ordering::SeqCst), 1);
    assert_eq!(read_n(&mut h.session, 8).unwrap(), vec![5]);
}

#[test]
fn seek_fails_for_every_offset() {
    let mut h = harness(None, vec![], SourceOptions::default());
    for offset in [0, 1, 4096, u64::MAX] {
        assert!(matches!(h.session.seek(offset), Err(SourceError::NotSeekable(o)) if o == offset));
    }
    h.session.open().unwrap();
    for offset in [0, 1, 4096, u64::MAX] {
        assert!(h.session.seek(offset).is_err());
    }
    assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 0);
}

#[test]
fn close_releases_each_handle_once() {
    let mut h = harness(Some(Some(vec![1, 2])), vec![], SourceOptions::default());
    h.session.open().unwrap();
    h.session.close();
    h.session.close();
    drop(h.session);

    assert_eq!(h.ledger.queue_released.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.payload_released.load(Ordering::SeqCst), 1);
}

#[test]
fn close_before_open_releases_unused_payload() {
    let mut h = harness(Some(Some(vec![1, 2])), vec![], SourceOptions::default());
    h.session.close();
    assert_eq!(h.session.state(), SessionState::Closed);
    assert!(h.session.open().is_err());

    drop(h.session);
    assert_eq!(h.ledger.queue_released.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.payload_released.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_unopened_session_releases_handles() {
    let h = harness(Some(Some(vec![1])), vec![], SourceOptions::default());
    let ledger = h.ledger.clone();
    drop(h);

    assert_eq!(ledger.queue_released.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.payload_released.load(Ordering::SeqCst), 1);
}

#[test]
fn callbacks_bind_on_whichever_thread_calls_them() {
    let mut h = harness(
        Some(Some(vec![1, 2])),
        vec![Step::Item(vec![3])],
        SourceOptions::default(),
    );
    let ledger = h.ledger.clone();

    h.session.open().unwrap();
    let session = thread::spawn(move || {
        let mut session = h.session;
        assert_eq!(read_n(&mut session, 8).unwrap(), vec![1, 2]);
        session
    })
    .join()
    .unwrap();

    let mut session = thread::spawn(move || {
        let mut session = session;
        assert_eq!(read_n(&mut session, 8).unwrap(), vec![3]);
        session
    })
    .join()
    .unwrap();
    session.close();

    // open, two reads, close: one bind each.
    assert_eq!(ledger.binds.load(Ordering::SeqCst), 4);
    let threads = ledger.bound_threads.lock().unwrap();
    assert_ne!(threads[1], threads[2]);
    assert_eq!(threads[0], threads[3]);
}
