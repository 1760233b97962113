//! Window lifecycle under concurrent producers, checked through the decoded wire output

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use anyhow::{Context, Result, ensure};
use beaconbuf::{
    Admission, Frame, HEADER_LEN, Identity, PAYLOAD_MAX, RECORD_LEN, SequenceTracker,
    WindowController,
};
use common::{decode_all, init_tracing, producer_identity};
use proptest::prelude::*;

const PRODUCERS: u8 = 4;
const IDENTITIES_PER_PRODUCER: u8 = 50;
const ROUNDS: u32 = 100;

#[test]
fn concurrent_producers_lose_no_accepted_event() -> Result<()> {
    init_tracing();

    let controller = Arc::new(WindowController::new(1024)?);
    let accepted = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let flusher = {
        let controller = Arc::clone(&controller);
        let done = Arc::clone(&done);
        thread::spawn(move || -> beaconbuf::Result<Vec<u8>> {
            let mut wire: Vec<u8> = Vec::new();
            while !done.load(Ordering::Acquire) {
                controller.flush(&mut wire)?;
                thread::yield_now();
            }
            // Final flush picks up whatever the producers left behind
            controller.flush(&mut wire)?;
            Ok(wire)
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let controller = Arc::clone(&controller);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    for index in 0..IDENTITIES_PER_PRODUCER {
                        let id = producer_identity(producer, index);
                        let payload = [producer, index, round as u8];
                        let rssi = -((index % 90) as i8) - 10;
                        if controller.admit(&id, 0, rssi, 0, &payload).is_accepted() {
                            accepted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().map_err(|_| anyhow::anyhow!("producer panicked"))?;
    }
    done.store(true, Ordering::Release);
    let wire = flusher.join().map_err(|_| anyhow::anyhow!("flusher panicked"))??;

    let total = u64::from(PRODUCERS) * u64::from(IDENTITIES_PER_PRODUCER) * u64::from(ROUNDS);
    ensure!(accepted.load(Ordering::Relaxed) == total, "every admission should be accepted");

    let frames = decode_all(&wire);
    ensure!(!frames.is_empty(), "at least the final window is transmitted");

    let mut tracker = SequenceTracker::new();
    let mut per_identity: HashMap<Identity, u64> = HashMap::new();
    let mut raw_total = 0u64;

    for frame in &frames {
        ensure!(tracker.observe(frame.header.sequence) == 0, "sequence gap in local capture");
        ensure!(
            usize::from(frame.header.unique_count) == frame.records.len(),
            "unique_count matches record count"
        );
        ensure!(frame.header.raw_event_count >= frame.header.unique_count);
        raw_total += u64::from(frame.header.raw_event_count);
        for record in &frame.records {
            *per_identity.entry(record.identity).or_default() += u64::from(record.event_count);
        }
    }

    ensure!(raw_total == total, "raw counts sum to {total}, got {raw_total}");
    ensure!(per_identity.values().sum::<u64>() == total, "record counts cover every event");
    ensure!(per_identity.len() == usize::from(PRODUCERS) * usize::from(IDENTITIES_PER_PRODUCER));
    for (identity, count) in &per_identity {
        ensure!(*count == u64::from(ROUNDS), "{identity} observed {count} times");
    }
    Ok(())
}

/// Outcome of one concurrent run against a small registry
struct ContendedRun {
    calls: u64,
    accepted: u64,
    dropped: u64,
    reported_drops: u64,
    frames: Vec<Frame>,
}

/// Producers admit more distinct identities than the registry holds while a
/// flusher closes windows on a schedule shaped by `flush_pause` and `yield_every`.
fn run_contended(
    producers: u8,
    identities: u8,
    rounds: u32,
    flush_pause: u32,
    yield_every: u32,
) -> Result<ContendedRun> {
    let controller = Arc::new(WindowController::new(64)?);
    let accepted = Arc::new(AtomicU64::new(0));
    let dropped = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let flusher = {
        let controller = Arc::clone(&controller);
        let done = Arc::clone(&done);
        thread::spawn(move || -> beaconbuf::Result<(Vec<u8>, u64)> {
            let mut wire: Vec<u8> = Vec::new();
            let mut reported_drops = 0u64;
            while !done.load(Ordering::Acquire) {
                reported_drops += u64::from(controller.flush(&mut wire)?.dropped_events);
                for _ in 0..flush_pause {
                    thread::yield_now();
                }
            }
            reported_drops += u64::from(controller.flush(&mut wire)?.dropped_events);
            Ok((wire, reported_drops))
        })
    };

    let workers: Vec<_> = (0..producers)
        .map(|producer| {
            let controller = Arc::clone(&controller);
            let accepted = Arc::clone(&accepted);
            let dropped = Arc::clone(&dropped);
            thread::spawn(move || {
                let mut step = 0u32;
                for round in 0..rounds {
                    for index in 0..identities {
                        let id = producer_identity(producer, index);
                        match controller.admit(&id, 0, -70, 0, &[round as u8]) {
                            Admission::Accepted { .. } => accepted.fetch_add(1, Ordering::Relaxed),
                            Admission::Dropped { .. } => dropped.fetch_add(1, Ordering::Relaxed),
                            Admission::Rejected => 0,
                        };
                        step += 1;
                        if step % yield_every == 0 {
                            thread::yield_now();
                        }
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().map_err(|_| anyhow::anyhow!("producer panicked"))?;
    }
    done.store(true, Ordering::Release);
    let (wire, reported_drops) =
        flusher.join().map_err(|_| anyhow::anyhow!("flusher panicked"))??;

    Ok(ContendedRun {
        calls: u64::from(producers) * u64::from(identities) * u64::from(rounds),
        accepted: accepted.load(Ordering::Relaxed),
        dropped: dropped.load(Ordering::Relaxed),
        reported_drops,
        frames: decode_all(&wire),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn contended_small_registry_accounts_for_every_call(
        producers in 1u8..=4,
        rounds in 1u32..=20,
        flush_pause in 0u32..64,
        yield_every in 1u32..32,
    ) {
        let run = run_contended(producers, 200, rounds, flush_pause, yield_every)
            .map_err(|e| TestCaseError::fail(format!("{e:#}")))?;

        prop_assert_eq!(run.accepted + run.dropped, run.calls);
        prop_assert_eq!(run.reported_drops, run.dropped);

        let mut tracker = SequenceTracker::new();
        let mut raw_total = 0u64;
        let mut stored_total = 0u64;
        for frame in &run.frames {
            prop_assert_eq!(tracker.observe(frame.header.sequence), 0);
            prop_assert!(frame.records.len() <= 64);
            prop_assert_eq!(usize::from(frame.header.unique_count), frame.records.len());
            raw_total += u64::from(frame.header.raw_event_count);
            stored_total += frame.total_events();
        }

        prop_assert_eq!(raw_total, run.calls);
        prop_assert_eq!(stored_total, run.accepted);
    }
}

#[test]
fn contended_small_registry_drops_when_flushes_are_rare() -> Result<()> {
    init_tracing();

    // A flusher that rarely runs leaves far more than 64 devices in a window
    let run = run_contended(4, 200, 5, 10_000, 1)?;
    ensure!(run.dropped > 0, "expected capacity drops with 800 identities in 64 slots");
    ensure!(run.accepted + run.dropped == run.calls);
    ensure!(run.frames.iter().map(|f| f.total_events()).sum::<u64>() == run.accepted);
    ensure!(
        run.frames.iter().map(|f| u64::from(f.header.raw_event_count)).sum::<u64>() == run.calls
    );
    Ok(())
}

#[test]
fn full_registry_counts_but_drops_new_devices() -> Result<()> {
    init_tracing();

    let controller = WindowController::new(8)?;
    for index in 0..8 {
        let admission = controller.admit(&producer_identity(0, index), 0, -50, 0, &[]);
        ensure!(admission == Admission::Accepted { new_device: true });
    }

    let overflow = controller.admit(&producer_identity(1, 0), 0, -50, 0, &[]);
    ensure!(overflow == Admission::Dropped { capacity: 8 });

    // Known devices still update in a full registry
    let known = controller.admit(&producer_identity(0, 3), 0, -20, 0, &[9]);
    ensure!(known == Admission::Accepted { new_device: false });

    let mut wire: Vec<u8> = Vec::new();
    let report = controller.flush(&mut wire)?;
    ensure!(report.unique_count == 8);
    ensure!(report.raw_event_count == 10);
    ensure!(report.dropped_events == 1);
    ensure!(report.frame_len == HEADER_LEN + 8 * RECORD_LEN);

    let frame = Frame::decode(&wire)?;
    let updated = frame.record(&producer_identity(0, 3)).context("updated device transmitted")?;
    ensure!(updated.last_signal_level == -20);
    ensure!(updated.event_count == 2);
    ensure!(frame.record(&producer_identity(1, 0)).is_none());
    Ok(())
}

#[test]
fn oversized_payload_is_truncated_on_the_wire() -> Result<()> {
    let controller = WindowController::new(16)?;
    let id = producer_identity(2, 2);
    let long: Vec<u8> = (0..40).collect();
    controller.admit(&id, 1, -33, 4, &long);

    let mut wire: Vec<u8> = Vec::new();
    controller.flush(&mut wire)?;
    let frame = Frame::decode(&wire)?;
    let record = frame.record(&id).context("device transmitted")?;

    ensure!(usize::from(record.payload_len) == PAYLOAD_MAX);
    ensure!(record.payload() == &long[..PAYLOAD_MAX]);
    ensure!(record.identity_kind == 1 && record.last_event_kind == 4);
    Ok(())
}

#[test]
fn each_window_starts_empty_with_next_sequence() -> Result<()> {
    let controller = WindowController::new(16)?;
    let mut wire: Vec<u8> = Vec::new();

    controller.admit(&producer_identity(0, 1), 0, -60, 0, &[1]);
    controller.flush(&mut wire)?;
    controller.flush(&mut wire)?;
    controller.admit(&producer_identity(0, 2), 0, -61, 0, &[2]);
    controller.flush(&mut wire)?;

    let frames = decode_all(&wire);
    let summary: Vec<_> = frames
        .iter()
        .map(|f| (f.header.sequence, f.header.raw_event_count, f.header.unique_count))
        .collect();
    ensure!(summary == vec![(0, 1, 1), (1, 0, 0), (2, 1, 1)], "got {summary:?}");
    ensure!(frames[1].encoded_len() == HEADER_LEN);
    ensure!(controller.completed_windows() == 3);
    Ok(())
}
