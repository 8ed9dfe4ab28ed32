#![cfg(loom)]

use loom::sync::Arc;
use loom::thread;
use ring_mpmc::{OfferError, RingQueue};

#[test]
fn loom_spsc_handoff() {
    loom::model(|| {
        let queue = Arc::new(RingQueue::<i32>::new(2).unwrap());
        let q = queue.clone();

        let producer = thread::spawn(move || {
            q.try_offer(7).unwrap();
        });

        // The consumer either sees nothing yet or the fully written value.
        let seen = queue.try_poll();
        producer.join().unwrap();

        match seen {
            Some(v) => assert_eq!(v, 7),
            None => assert_eq!(queue.try_poll(), Some(7)),
        }
        assert_eq!(queue.try_poll(), None);
    });
}

#[test]
fn loom_racing_producers() {
    loom::model(|| {
        let queue = Arc::new(RingQueue::<i32>::new(2).unwrap());

        let handles: Vec<_> = (1..=2)
            .map(|v| {
                let q = queue.clone();
                thread::spawn(move || q.try_offer(v).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut got = vec![queue.try_poll().unwrap(), queue.try_poll().unwrap()];
        got.sort_unstable();
        assert_eq!(got, [1, 2]);
        assert_eq!(queue.try_poll(), None);
    });
}

#[test]
fn loom_racing_consumers() {
    loom::model(|| {
        let queue = Arc::new(RingQueue::<i32>::new(2).unwrap());
        queue.try_offer(10).unwrap();
        queue.try_offer(20).unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let q = queue.clone();
                thread::spawn(move || q.try_poll())
            })
            .collect();

        let mut got: Vec<i32> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        got.sort_unstable();
        assert_eq!(got, [10, 20]);
    });
}

#[test]
fn loom_full_queue_does_not_overwrite() {
    loom::model(|| {
        let queue = Arc::new(RingQueue::<i32>::new(2).unwrap());
        queue.try_offer(1).unwrap();
        queue.try_offer(2).unwrap();

        let q = queue.clone();
        let producer = thread::spawn(move || q.try_offer(3));
        let consumer = {
            let q = queue.clone();
            thread::spawn(move || q.try_poll())
        };

        let offered = producer.join().unwrap();
        assert_eq!(consumer.join().unwrap(), Some(1));

        let mut rest = vec![];
        while let Some(v) = queue.try_poll() {
            rest.push(v);
        }
        match offered {
            Ok(()) => assert_eq!(rest, [2, 3]),
            Err(OfferError::Full(v)) => {
                assert_eq!(v, 3);
                assert_eq!(rest, [2]);
            }
            Err(OfferError::InvalidArgument) => unreachable!(),
        }
    });
}
