use crate::pool::{BufferPool, PoolStats};

#[test]
fn hands_out_each_buffer_once() {
    let pool = BufferPool::new("test", 2, 8);

    let first = pool.try_alloc().expect("first buffer");
    let second = pool.try_alloc().expect("second buffer");
    assert!(pool.try_alloc().is_none());
    assert_eq!(pool.available(), 0);

    drop(first);
    assert_eq!(pool.available(), 1);
    let third = pool.try_alloc().expect("recycled buffer");
    assert!(third.is_empty());
    drop((second, third));
    assert_eq!(pool.available(), 2);
}

#[test]
fn tracks_low_water_mark() {
    let pool = BufferPool::new("test", 4, 8);
    let held: Vec<_> = (0..3).filter_map(|_| pool.try_alloc()).collect();

    assert_eq!(
        pool.stats(),
        PoolStats {
            total: 4,
            free: 1,
            used: 3,
            min_free: 1,
        }
    );
    assert_eq!(pool.stats().utilization(), 75);

    drop(held);
    let stats = pool.stats();
    assert_eq!(stats.free, 4);
    assert_eq!(stats.used, 0);
    assert_eq!(stats.min_free, 1);
}

#[test]
fn append_stops_at_buffer_size() {
    let pool = BufferPool::new("test", 1, 4);
    let mut buffer = pool.try_alloc().unwrap();

    assert_eq!(buffer.append(&[1, 2, 3]), 3);
    assert_eq!(buffer.append(&[4, 5, 6]), 1);
    assert_eq!(buffer.as_bytes(), &[1, 2, 3, 4]);
    assert_eq!(buffer.capacity(), 4);
}

#[test]
fn recycled_buffers_come_back_empty() {
    let pool = BufferPool::new("test", 1, 4);
    let mut buffer = pool.try_alloc().unwrap();
    buffer.append(&[9, 9]);
    drop(buffer);

    let buffer = pool.try_alloc().unwrap();
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.pool_name(), "test");
}

#[test]
fn empty_pool_is_exhausted_from_the_start() {
    let pool = BufferPool::new("none", 0, 16);
    assert!(pool.stats().is_exhausted());
    assert_eq!(pool.stats().utilization(), 0);
    assert!(pool.try_alloc().is_none());
}
