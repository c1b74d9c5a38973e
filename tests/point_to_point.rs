//! Multi-participant transfer tests.
//!
//! Each participant runs on its own scoped thread. Scenarios that would
//! block forever are released with `Group::cancel` / `Group::abort`.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use minimpi::{Communicator, Error, Group, ANY_SOURCE, ANY_TAG};

/// How long a receive must stay blocked before we call it blocked.
const BLOCKED_FOR: Duration = Duration::from_millis(100);

/// Run `body` once per rank, each on its own thread, and collect results in
/// rank order.
fn run<R, F>(group: &Group, body: F) -> Vec<R>
where
    R: Send,
    F: Fn(Communicator) -> R + Sync,
{
    let comms = group.participants().expect("claim participants");
    thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let body = &body;
                s.spawn(move || body(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("participant panicked"))
            .collect()
    })
}

#[test]
fn initialize_assigns_a_permutation_of_ranks() {
    for n in 1..=8 {
        let group = minimpi::initialize(n).unwrap();
        let mut ranks: Vec<i32> = thread::scope(|s| {
            let handles: Vec<_> = (0..n)
                .map(|_| {
                    let group = group.clone();
                    s.spawn(move || {
                        let comm = group.initialize().unwrap();
                        assert_eq!(comm.size(), n);
                        comm.rank()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        ranks.sort_unstable();
        assert_eq!(ranks, (0..n).collect::<Vec<_>>(), "group of {n}");
    }
}

#[test]
fn same_tag_receives_follow_send_order() {
    let group = minimpi::initialize(2).unwrap();
    let received = run(&group, |comm| {
        let mut seen = Vec::new();
        if comm.rank() == 0 {
            for i in 0..50i32 {
                comm.send(&[i, -i], 1, 3).unwrap();
            }
        } else {
            let mut buf = [0i32; 2];
            for _ in 0..50 {
                let (source, tag, count) = comm.recv(&mut buf, 0, 3).unwrap();
                assert_eq!((source, tag, count), (0, 3, 2));
                seen.push(buf[0]);
            }
        }
        comm.finalize().unwrap();
        seen
    });
    assert_eq!(received[1], (0..50).collect::<Vec<_>>());
}

#[test]
fn payload_round_trips_unchanged() {
    let group = minimpi::initialize(2).unwrap();
    let count = minimpi::buffer_len(17).unwrap();
    let sent: Vec<u64> = (0..count as u64).map(|i| i * 1_000_003 + 7).collect();

    let received = run(&group, |comm| {
        let mut buf = vec![0u64; count];
        if comm.rank() == 0 {
            comm.send(&sent, 1, 0).unwrap();
        } else {
            comm.recv(&mut buf, 0, 0).unwrap();
        }
        buf
    });
    assert_eq!(received[1], sent);
}

#[test]
fn second_receive_with_same_tag_does_not_take_other_tag() {
    // Rank 0 sends tag 1 then tag 2; rank 1 asks for tag 1 twice.
    let group = minimpi::initialize(2).unwrap();
    let sender = group.participant(0).unwrap();
    let receiver = group.participant(1).unwrap();

    let count = 4;
    let p1: Vec<i32> = (0..count).collect();
    let p2: Vec<i32> = (0..count).map(|i| i + 100).collect();
    sender.send(&p1, 1, 1).unwrap();
    sender.send(&p2, 1, 2).unwrap();

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut buf = vec![0i32; count as usize];
        let first = receiver.recv(&mut buf, 0, 1).map(|_| buf.clone());
        tx.send(first).unwrap();
        let second = receiver.recv(&mut buf, 0, 1);
        tx.send(second.map(|_| buf.clone())).unwrap();
        receiver
    });

    assert_eq!(rx.recv().unwrap(), Ok(p1));
    assert!(
        rx.recv_timeout(BLOCKED_FOR).is_err(),
        "second tag-1 receive must block, not match the tag-2 message"
    );

    group.cancel(1).unwrap();
    assert_eq!(rx.recv().unwrap(), Err(Error::Aborted));
    handle.join().unwrap();
}

#[test]
fn tag_two_message_is_still_there_for_a_tag_two_receive() {
    let group = minimpi::initialize(2).unwrap();
    let sender = group.participant(0).unwrap();
    let receiver = group.participant(1).unwrap();

    sender.send(&[1i32, 1], 1, 1).unwrap();
    sender.send(&[2i32, 2], 1, 2).unwrap();

    let mut buf = [0i32; 2];
    receiver.recv(&mut buf, 0, 1).unwrap();
    assert_eq!(receiver.try_recv(&mut buf, 0, 1), Ok(None));
    assert_eq!(receiver.recv(&mut buf, 0, 2), Ok((0, 2, 2)));
    assert_eq!(buf, [2, 2]);
}

#[test]
fn blocked_receive_completes_when_matching_send_arrives() {
    let group = minimpi::initialize(2).unwrap();
    let results = run(&group, |comm| {
        if comm.rank() == 0 {
            thread::sleep(Duration::from_millis(30));
            comm.send(&[9.5f32], 1, 0).unwrap();
            None
        } else {
            let mut buf = [0.0f32; 1];
            let status = comm.recv(&mut buf, ANY_SOURCE, ANY_TAG).unwrap();
            Some((status, buf[0]))
        }
    });
    assert_eq!(results[1], Some(((0, 0, 1), 9.5)));
}

#[test]
fn wildcard_receive_takes_earliest_queued() {
    let group = minimpi::initialize(3).unwrap();
    let p0 = group.participant(0).unwrap();
    let p1 = group.participant(1).unwrap();
    let p2 = group.participant(2).unwrap();

    p2.send(&[20u32], 0, 9).unwrap();
    p1.send(&[10u32], 0, 4).unwrap();
    p2.send(&[21u32], 0, 1).unwrap();

    let mut buf = [0u32; 1];
    let mut order = Vec::new();
    for _ in 0..3 {
        let (source, tag, _) = p0.recv(&mut buf, ANY_SOURCE, ANY_TAG).unwrap();
        order.push((source, tag, buf[0]));
    }
    assert_eq!(order, vec![(2, 9, 20), (1, 4, 10), (2, 1, 21)]);
}

#[test]
fn any_source_with_fixed_tag() {
    let group = minimpi::initialize(3).unwrap();
    let p0 = group.participant(0).unwrap();
    let p1 = group.participant(1).unwrap();
    let p2 = group.participant(2).unwrap();

    p1.send(&[1i64], 0, 5).unwrap();
    p2.send(&[2i64], 0, 6).unwrap();

    let mut buf = [0i64; 1];
    assert_eq!(p0.recv(&mut buf, ANY_SOURCE, 6), Ok((2, 6, 1)));
    assert_eq!(buf, [2]);
    assert_eq!(p0.recv(&mut buf, ANY_SOURCE, 5), Ok((1, 5, 1)));
    assert_eq!(buf, [1]);
}

#[test]
fn count_mismatch_fails_without_touching_buffer() {
    let group = minimpi::initialize(2).unwrap();
    let p0 = group.participant(0).unwrap();
    let p1 = group.participant(1).unwrap();

    p0.send(&[1i32, 2, 3, 4], 1, 0).unwrap();

    let mut larger = [7i32; 6];
    assert_eq!(
        p1.recv(&mut larger, 0, 0),
        Err(Error::CountMismatch {
            expected: 6,
            actual: 4
        })
    );
    assert_eq!(larger, [7; 6]);

    let status = p1.probe(0, 0).unwrap();
    assert_eq!(status.count, 4);
}

#[test]
fn datatype_mismatch_is_reported() {
    let group = minimpi::initialize(2).unwrap();
    let p0 = group.participant(0).unwrap();
    let p1 = group.participant(1).unwrap();

    p0.send(&[1.0f64, 2.0], 1, 0).unwrap();
    let mut buf = [0i64; 2];
    assert!(matches!(p1.recv(&mut buf, 0, 0), Err(Error::DatatypeMismatch { .. })));
    let mut right = [0.0f64; 2];
    assert_eq!(p1.recv(&mut right, 0, 0), Ok((0, 0, 2)));
}

#[test]
fn transfers_after_finalize_have_no_side_effect() {
    let group = minimpi::initialize(2).unwrap();
    let p0 = group.participant(0).unwrap();
    let p1 = group.participant(1).unwrap();

    p0.finalize().unwrap();
    assert_eq!(p0.send(&[1u8], 1, 0), Err(Error::GroupFinalized));
    assert_eq!(p1.iprobe(ANY_SOURCE, ANY_TAG), Ok(None));

    let mut buf = [0u8; 1];
    assert_eq!(
        p0.recv(&mut buf, ANY_SOURCE, ANY_TAG),
        Err(Error::GroupFinalized)
    );
    assert_eq!(p0.probe(ANY_SOURCE, ANY_TAG), Err(Error::GroupFinalized));
}

#[test]
fn sends_to_a_finalized_peer_still_succeed() {
    // Rank 1 takes only the tag-1 message, then finalizes; rank 0's later
    // tag-2 send must not depend on rank 1 still being around.
    let group = minimpi::initialize(2).unwrap();
    let sender = group.participant(0).unwrap();
    let receiver = group.participant(1).unwrap();

    sender.send(&[1i32, 1], 1, 1).unwrap();
    let mut buf = [0i32; 2];
    assert_eq!(receiver.recv(&mut buf, 0, 1), Ok((0, 1, 2)));
    receiver.finalize().unwrap();

    assert_eq!(sender.send(&[2i32, 2], 1, 2), Ok(()));
    assert_eq!(sender.send(&[3i32, 3], 1, 1), Ok(()));
    assert!(!group.is_finalized());

    sender.finalize().unwrap();
    assert!(group.is_finalized());
}

#[test]
fn cancel_releases_a_blocked_status_wait() {
    let group = minimpi::initialize(2).unwrap();
    let watcher = group.participant(1).unwrap();

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        tx.send(watcher.probe(0, 0)).unwrap();
        watcher
    });

    assert!(
        rx.recv_timeout(BLOCKED_FOR).is_err(),
        "waiting for a status with nothing queued must block"
    );
    group.cancel(1).unwrap();
    assert_eq!(rx.recv().unwrap(), Err(Error::Aborted));
    handle.join().unwrap();
}

#[test]
fn abort_releases_every_blocked_receive() {
    let group = minimpi::initialize(3).unwrap();
    let (tx, rx) = mpsc::channel();
    let comms = group.participants().unwrap();

    thread::scope(|s| {
        for comm in comms {
            let tx = tx.clone();
            s.spawn(move || {
                let mut buf = [0i32; 1];
                tx.send(comm.recv(&mut buf, ANY_SOURCE, ANY_TAG)).unwrap();
            });
        }
        assert!(rx.recv_timeout(BLOCKED_FOR).is_err());
        group.abort();
    });

    // A participant that had not reached `recv` before the abort sees the
    // torn-down group instead of a shut-down queue.
    let results: Vec<_> = rx.try_iter().collect();
    assert_eq!(results.len(), 3);
    for result in results {
        assert!(matches!(result, Err(Error::Aborted | Error::GroupFinalized)));
    }
    assert!(group.is_finalized());
}

#[test]
fn ring_sendrecv() {
    let group = minimpi::initialize(5).unwrap();
    let received = run(&group, |comm| {
        let rank = comm.rank();
        let size = comm.size();
        let next = (rank + 1) % size;
        let prev = (rank + size - 1) % size;

        let send = [rank * 100 + 1, rank * 100 + 2];
        let mut recv = [0i32; 2];
        let (source, _, _) = comm.sendrecv(&send, next, 0, &mut recv, prev, 0).unwrap();
        assert_eq!(source, prev);
        comm.finalize().unwrap();
        recv
    });
    for (rank, recv) in received.iter().enumerate() {
        let prev = (rank as i32 + 4) % 5;
        assert_eq!(*recv, [prev * 100 + 1, prev * 100 + 2]);
    }
    assert!(group.is_finalized());
}
