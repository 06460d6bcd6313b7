use passthrough_mixer_lib::audio::AudioBus;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[cfg(test)]
mod audio_bus_tests {
    use super::*;

    #[test]
    fn test_default_capacity_is_one_mebibyte() {
        let bus = AudioBus::new();
        assert_eq!(bus.capacity(), 1_048_576);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_drop_oldest_on_overflow() {
        let bus = AudioBus::with_capacity(4);
        assert_eq!(bus.write(&[1, 2, 3]), 3);
        assert_eq!(bus.write(&[4, 5, 6]), 3);

        // Two oldest bytes evicted to make room
        assert_eq!(bus.read(4), vec![3, 4, 5, 6]);
        assert_eq!(bus.stats().bytes_dropped, 2);
    }

    #[test]
    fn test_fifo_read_order() {
        let bus = AudioBus::with_capacity(16);
        bus.write(&[1, 2]);
        bus.write(&[3, 4]);
        bus.write(&[5]);

        assert_eq!(bus.read(3), vec![1, 2, 3]);
        assert_eq!(bus.read(10), vec![4, 5]);
        assert!(bus.read(10).is_empty());
    }

    #[test]
    fn test_partial_read_leaves_remainder_in_order() {
        let bus = AudioBus::with_capacity(16);
        bus.write(&[1, 2, 3, 4]);
        bus.write(&[5, 6]);

        assert_eq!(bus.read(3), vec![1, 2, 3]);
        assert_eq!(bus.len(), 3);
        assert_eq!(bus.read(16), vec![4, 5, 6]);
    }

    #[test]
    fn test_read_never_blocks_when_empty() {
        let bus = AudioBus::with_capacity(16);
        assert!(bus.read(1024).is_empty());

        let mut out = [0xAAu8; 4];
        assert_eq!(bus.read_into(&mut out), 0);
        assert_eq!(out, [0xAA; 4]);
    }

    #[test]
    fn test_producers_are_concatenated_not_summed() {
        let bus = AudioBus::with_capacity(16);
        // Two "producers" writing one sample each
        bus.write(&100i16.to_le_bytes());
        bus.write(&200i16.to_le_bytes());

        let bytes = bus.read(16);
        assert_eq!(bytes.len(), 4);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 100);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 200);
    }

    #[test]
    fn test_stats_track_traffic() {
        let bus = AudioBus::with_capacity(8);
        bus.write(&[0; 6]);
        bus.read(2);
        bus.write(&[0; 6]);
        bus.clear();

        let stats = bus.stats();
        assert_eq!(stats.bytes_written, 12);
        assert_eq!(stats.bytes_dropped, 2);
        assert_eq!(stats.bytes_read, 10);
        assert_eq!(stats.buffered_bytes, 0);
        assert_eq!(stats.capacity_bytes, 8);
    }

    #[test]
    fn test_concurrent_writers_stay_bounded() {
        let bus = Arc::new(AudioBus::with_capacity(256));
        let writers: Vec<_> = (0..4u8)
            .map(|id| {
                let bus = bus.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        bus.write(&[id; 10]);
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }

        let stats = bus.stats();
        assert_eq!(bus.len(), 256);
        assert_eq!(stats.bytes_written, 4 * 500 * 10);
        assert_eq!(stats.bytes_written - stats.bytes_dropped, 256);
    }

    #[tokio::test]
    async fn test_wait_for_data_wakes_on_write() {
        let bus = Arc::new(AudioBus::with_capacity(64));
        let writer = bus.clone();

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.write(&[1, 2, 3, 4]);
        });

        tokio::time::timeout(Duration::from_secs(2), bus.wait_for_data())
            .await
            .expect("writer should wake the waiter");
        assert_eq!(bus.len(), 4);
        producer.await.unwrap();
    }

    #[test]
    fn test_wait_for_data_returns_immediately_when_buffered() {
        let bus = AudioBus::with_capacity(64);
        bus.write(&[7]);
        tokio_test::block_on(bus.wait_for_data());
        assert_eq!(bus.read(1), vec![7]);
    }

    #[test]
    fn test_empty_write_does_not_wake_waiters() {
        let bus = AudioBus::with_capacity(64);
        let mut waiter = tokio_test::task::spawn(bus.wait_for_data());
        tokio_test::assert_pending!(waiter.poll());

        bus.write(&[]);
        assert!(!waiter.is_woken());

        bus.write(&[1]);
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }
}

proptest! {
    #[test]
    fn prop_bus_never_exceeds_capacity(
        capacity in 1usize..512,
        writes in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..600), 0..32),
    ) {
        let bus = AudioBus::with_capacity(capacity);
        let mut expected: Vec<u8> = Vec::new();

        for chunk in &writes {
            prop_assert_eq!(bus.write(chunk), chunk.len());
            prop_assert!(bus.len() <= capacity);

            expected.extend_from_slice(chunk);
            if expected.len() > capacity {
                expected.drain(..expected.len() - capacity);
            }
        }

        // Whatever survives is exactly the newest bytes, in order
        prop_assert_eq!(bus.read(capacity), expected);
    }
}
