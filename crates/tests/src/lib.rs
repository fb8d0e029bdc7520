//! # Integration Tests
//!
//! Cross-crate tests exercising the public dispatcher surface:
//! lifecycle cycles, drain behavior, overload accounting under a live
//! worker pool, and the concurrency bound.

#[cfg(test)]
mod lifecycle_tests {
    use std::time::Duration;

    use dispatcher::{PushQueue, Worker};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct Recorder {
        tx: mpsc::UnboundedSender<u32>,
    }

    impl Worker<u32> for Recorder {
        async fn process(&self, item: u32) {
            let _ = self.tx.send(item);
        }
    }

    async fn recv_one(rx: &mut mpsc::UnboundedReceiver<u32>) -> u32 {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("worker did not receive item")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_drain_completeness() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (drained_tx, mut drained_rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(2, 5, Recorder { tx }).unwrap();
        queue.on_drained(move || {
            let _ = drained_tx.send(());
        });

        for i in 0..5 {
            queue.put(i);
        }
        queue.drain();

        timeout(Duration::from_secs(1), drained_rx.recv())
            .await
            .expect("drained hook did not fire")
            .unwrap();

        // Every buffered item was dispatched exactly once.
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(recv_one(&mut rx).await);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(rx.try_recv().is_err());

        // Post-drain the machine is stopped and the hook fired once.
        assert!(!queue.is_started());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.metrics().snapshot().drain_count, 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(drained_rx.try_recv().is_err());

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_drain_fires_without_dispatch() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (drained_tx, mut drained_rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(2, 5, Recorder { tx }).unwrap();
        queue.on_drained(move || {
            let _ = drained_tx.send(());
        });
        queue.start();
        queue.drain();

        timeout(Duration::from_secs(1), drained_rx.recv())
            .await
            .expect("drained hook did not fire")
            .unwrap();
        assert_eq!(queue.metrics().snapshot().dispatched_units, 0);

        queue.shutdown().await;
    }

    /// Recorder that holds the worker slot long enough for the test
    /// to interleave lifecycle calls deterministically.
    struct SlowRecorder {
        tx: mpsc::UnboundedSender<u32>,
    }

    impl Worker<u32> for SlowRecorder {
        async fn process(&self, item: u32) {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = self.tx.send(item);
        }
    }

    #[tokio::test]
    async fn test_stop_abandons_drain_silently() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (drained_tx, mut drained_rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(1, 5, SlowRecorder { tx }).unwrap();
        queue.on_drained(move || {
            let _ = drained_tx.send(());
        });

        queue.put(1);
        queue.drain();
        // The worker is still holding the slot, so the drain cannot
        // have completed before stop lands.
        queue.stop();

        // The in-flight item (if the worker grabbed it before stop)
        // still runs to completion, but the drained hook stays silent.
        let _ = timeout(Duration::from_millis(500), rx.recv()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(drained_rx.try_recv().is_err());

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_after_drain() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (drained_tx, mut drained_rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(1, 5, Recorder { tx }).unwrap();
        queue.on_drained(move || {
            let _ = drained_tx.send(());
        });

        queue.start();
        queue.put(1);
        assert_eq!(recv_one(&mut rx).await, 1);

        queue.drain();
        timeout(Duration::from_secs(1), drained_rx.recv())
            .await
            .expect("drained hook did not fire")
            .unwrap();

        // A drained machine can run another full cycle.
        queue.start();
        assert!(queue.is_started());
        assert_eq!(queue.overload_count(), 0);
        queue.put(2);
        assert_eq!(recv_one(&mut rx).await, 2);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_joins_worker_tasks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queue = PushQueue::new(2, 10, Recorder { tx }).unwrap();
        queue.start();

        for i in 0..4 {
            queue.put(i);
        }
        for _ in 0..4 {
            recv_one(&mut rx).await;
        }

        timeout(Duration::from_secs(1), queue.shutdown())
            .await
            .expect("shutdown did not complete");
    }
}

#[cfg(test)]
mod overload_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dispatcher::{PushQueue, Worker};
    use tokio::sync::{mpsc, Semaphore};
    use tokio::time::timeout;

    /// Worker that blocks on a semaphore until the test releases it.
    struct Gated {
        gate: Arc<Semaphore>,
        tx: mpsc::UnboundedSender<u32>,
    }

    impl Worker<u32> for Gated {
        async fn process(&self, item: u32) {
            let _permit = self.gate.acquire().await.expect("gate closed");
            let _ = self.tx.send(item);
        }
    }

    #[tokio::test]
    async fn test_overload_accounting_with_saturated_workers() {
        let gate = Arc::new(Semaphore::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (every_tx, mut every_rx) = mpsc::unbounded_channel();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(
            1,
            3,
            Gated {
                gate: Arc::clone(&gate),
                tx,
            },
        )
        .unwrap();
        queue.on_overload(move |item: &u32| {
            let _ = every_tx.send(*item);
        });
        queue.on_first_overload(move |item: &u32| {
            let _ = first_tx.send(*item);
        });
        queue.start();

        // First item goes in flight and blocks the only worker.
        queue.put(1);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Fill the buffer, then two more inserts overload it.
        for i in [2, 3, 4, 5, 6] {
            queue.put(i);
        }
        assert_eq!(queue.overload_count(), 2);

        let t = Duration::from_secs(1);
        assert_eq!(timeout(t, every_rx.recv()).await.unwrap(), Some(5));
        assert_eq!(timeout(t, every_rx.recv()).await.unwrap(), Some(6));
        assert_eq!(timeout(t, first_rx.recv()).await.unwrap(), Some(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(first_rx.try_recv().is_err());

        // Release the gate: the accepted items all get served.
        gate.add_permits(10);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(timeout(t, rx.recv()).await.unwrap().unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_put_from_plain_thread_fires_overload_hook() {
        let gate = Arc::new(Semaphore::new(0));
        let (tx, _rx) = mpsc::unbounded_channel();
        let (every_tx, mut every_rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(1, 1, Gated { gate, tx }).unwrap();
        queue.on_overload(move |item: &u32| {
            let _ = every_tx.send(*item);
        });

        // Producers are not required to live on the runtime: inserting
        // from a plain OS thread must not panic, even when the insert
        // overloads and a hook is registered.
        let handle = queue.handle();
        let producer = std::thread::spawn(move || {
            handle.put(1);
            handle.put(2);
        });
        assert!(producer.join().is_ok());

        assert_eq!(queue.overload_count(), 1);
        let dropped = timeout(Duration::from_secs(1), every_rx.recv())
            .await
            .expect("overload hook did not fire")
            .unwrap();
        assert_eq!(dropped, 2);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_clear_discards_without_touching_state() {
        let gate = Arc::new(Semaphore::new(0));
        let (tx, _rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(1, 2, Gated { gate, tx }).unwrap();
        queue.put(1);
        queue.put(2);
        queue.put(3); // overload while stopped
        assert_eq!(queue.overload_count(), 1);

        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(!queue.is_started());
        assert_eq!(queue.overload_count(), 1);

        queue.shutdown().await;
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};
    use std::time::Duration;

    use contracts::Worker;
    use dispatcher::{PushQueue, PutHandle};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Worker that tracks how many invocations run at the same time.
    struct InFlight {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        tx: mpsc::UnboundedSender<u32>,
    }

    impl Worker<u32> for InFlight {
        async fn process(&self, item: u32) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            let _ = self.tx.send(item);
        }
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_concurrency() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(
            2,
            50,
            InFlight {
                current: Arc::clone(&current),
                peak: Arc::clone(&peak),
                tx,
            },
        )
        .unwrap();
        queue.start();

        for i in 0..30 {
            queue.put(i);
        }
        for _ in 0..30 {
            timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("worker did not receive item")
                .unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);

        queue.shutdown().await;
    }

    /// Worker that inserts a follow-up item through a producer handle.
    struct Chaining {
        handle: Arc<OnceLock<PutHandle<u32>>>,
        tx: mpsc::UnboundedSender<u32>,
    }

    impl Worker<u32> for Chaining {
        async fn process(&self, item: u32) {
            if item == 1 {
                if let Some(handle) = self.handle.get() {
                    handle.put(2);
                }
            }
            let _ = self.tx.send(item);
        }
    }

    #[tokio::test]
    async fn test_worker_may_reenter_through_handle() {
        let slot = Arc::new(OnceLock::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let queue = PushQueue::new(
            1,
            10,
            Chaining {
                handle: Arc::clone(&slot),
                tx,
            },
        )
        .unwrap();
        assert!(slot.set(queue.handle()).is_ok());
        queue.start();

        queue.put(1);
        let t = Duration::from_secs(1);
        assert_eq!(timeout(t, rx.recv()).await.unwrap(), Some(1));
        assert_eq!(timeout(t, rx.recv()).await.unwrap(), Some(2));

        queue.shutdown().await;
    }
}
