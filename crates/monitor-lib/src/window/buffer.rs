//! Fixed-capacity sliding window of data points
//!
//! FIFO ring buffer: inserting into a full window evicts the oldest point
//! and hands it back so the running statistics can forget it.

use std::collections::VecDeque;

use crate::models::DataPoint;

/// Bounded FIFO window of data points
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    points: VecDeque<DataPoint>,
    capacity: usize,
    min_capacity: usize,
}

impl SlidingWindowBuffer {
    /// Create a window holding at most `capacity` points
    ///
    /// `min_capacity` only bounds [`resize`](Self::resize); the initial
    /// capacity is used as given (a zero capacity is raised to one).
    pub fn new(capacity: usize, min_capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            min_capacity: min_capacity.max(1),
        }
    }

    /// Append a point, returning the evicted oldest point if the window was full
    pub fn add(&mut self, point: DataPoint) -> Option<DataPoint> {
        let evicted = if self.points.len() >= self.capacity {
            self.points.pop_front()
        } else {
            None
        };
        self.points.push_back(point);
        evicted
    }

    /// Independent copy of the window, oldest first
    pub fn snapshot(&self) -> Vec<DataPoint> {
        self.points.iter().copied().collect()
    }

    /// Change capacity, returning points truncated from the oldest end
    ///
    /// Never fails: the requested capacity is clamped to the configured
    /// minimum.
    pub fn resize(&mut self, new_capacity: usize) -> Vec<DataPoint> {
        self.capacity = new_capacity.max(self.min_capacity);

        let excess = self.points.len().saturating_sub(self.capacity);
        let truncated: Vec<DataPoint> = self.points.drain(..excess).collect();
        self.points.shrink_to(self.capacity);
        truncated
    }

    /// Most recently inserted point
    pub fn latest(&self) -> Option<&DataPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_capacity(&self) -> usize {
        self.min_capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(i: i64) -> DataPoint {
        DataPoint::new(i as f64, 0.5, 1.0, i)
    }

    #[test]
    fn test_length_tracks_inserts_below_capacity() {
        let mut buffer = SlidingWindowBuffer::new(50, 10);
        for i in 0..30 {
            assert!(buffer.add(point(i)).is_none());
        }
        assert_eq!(buffer.len(), 30);
    }

    #[test]
    fn test_fifo_eviction_keeps_most_recent() {
        let mut buffer = SlidingWindowBuffer::new(50, 10);
        let mut evicted = Vec::new();
        for i in 0..75 {
            if let Some(old) = buffer.add(point(i)) {
                evicted.push(old.timestamp);
            }
        }

        assert_eq!(buffer.len(), 50);
        assert_eq!(evicted, (0..25).collect::<Vec<_>>());

        let timestamps: Vec<i64> = buffer.snapshot().iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, (25..75).collect::<Vec<_>>());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut buffer = SlidingWindowBuffer::new(5, 1);
        buffer.add(point(1));
        let snapshot = buffer.snapshot();
        buffer.add(point(2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_resize_truncates_oldest() {
        let mut buffer = SlidingWindowBuffer::new(40, 10);
        for i in 0..40 {
            buffer.add(point(i));
        }

        let truncated = buffer.resize(20);
        assert_eq!(truncated.len(), 20);
        assert_eq!(truncated.first().map(|p| p.timestamp), Some(0));
        assert_eq!(buffer.capacity(), 20);
        assert_eq!(buffer.snapshot().first().map(|p| p.timestamp), Some(20));
        assert_eq!(buffer.latest().map(|p| p.timestamp), Some(39));
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut buffer = SlidingWindowBuffer::new(16, 10);
        for i in 0..16 {
            buffer.add(point(i));
        }

        let truncated = buffer.resize(4);
        assert_eq!(buffer.capacity(), 10);
        assert_eq!(buffer.len(), 10);
        assert_eq!(truncated.len(), 6);
    }

    #[test]
    fn test_resize_grow_keeps_points() {
        let mut buffer = SlidingWindowBuffer::new(10, 10);
        for i in 0..10 {
            buffer.add(point(i));
        }
        assert!(buffer.resize(30).is_empty());
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.capacity(), 30);
    }
}
