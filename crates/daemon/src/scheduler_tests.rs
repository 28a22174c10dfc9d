// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{deliver_one, drop_dir, listener};
use fpoll_core::ListenerConfig;

#[test]
fn sink_forwards_items_to_channel() {
    let dir = drop_dir("a.txt", b"abc");
    let item = deliver_one(dir.path(), ListenerConfig::new("test", "in"));
    let (tx, mut rx) = mpsc::channel(1);
    let mut sink = ChannelSink::new("test", Arc::new(Handler::Log), tx);

    assert_eq!(sink.accept(item).unwrap(), PollItemStatus::Accepted);

    let job = rx.try_recv().unwrap();
    assert_eq!(job.listener, "test");
    assert_eq!(job.item.snapshot().name, "a.txt");
}

#[test]
fn sink_rejects_when_processor_is_gone() {
    let dir = drop_dir("a.txt", b"abc");
    let item = deliver_one(dir.path(), ListenerConfig::new("test", "in"));
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let mut sink = ChannelSink::new("test", Arc::new(Handler::Log), tx);

    assert!(sink.is_stopping());
    let rejected = sink.accept(item).unwrap_err();
    assert_eq!(rejected.item.snapshot().name, "a.txt");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn listener_task_polls_until_shutdown() {
    let dir = drop_dir("a.txt", b"abc");
    let scheduled = ScheduledListener {
        listener: listener(dir.path(), ListenerConfig::new("test", "in")),
        schedule: Schedule {
            frequency: Duration::from_millis(10),
            start_delay: Duration::ZERO,
        },
        handler: Arc::new(Handler::Log),
    };
    let (tx, mut rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(run_listener(scheduled, tx, shutdown_rx));
    let job = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.item.snapshot().name, "a.txt");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_during_start_delay_skips_polling() {
    let dir = drop_dir("a.txt", b"abc");
    let scheduled = ScheduledListener {
        listener: listener(dir.path(), ListenerConfig::new("test", "in")),
        schedule: Schedule {
            frequency: Duration::from_millis(10),
            start_delay: Duration::from_secs(60),
        },
        handler: Arc::new(Handler::Log),
    };
    let (tx, mut rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(run_listener(scheduled, tx, shutdown_rx));
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();

    assert!(rx.recv().await.is_none());
}
