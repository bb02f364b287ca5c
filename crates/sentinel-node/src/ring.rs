use std::collections::VecDeque;

/// Fixed-capacity ring of recently observed packet sizes. Newest values go
/// on the tail; the oldest is evicted once capacity is exceeded.
#[derive(Debug, Clone)]
pub struct RecentDataRing {
    buffer: VecDeque<f64>,
    capacity: usize,
}

impl RecentDataRing {
    pub fn new(capacity: usize) -> Self {
        Self { buffer: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = f64>) {
        for v in values {
            if self.buffer.len() >= self.capacity {
                self.buffer.pop_front();
            }
            self.buffer.push_back(v);
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.iter().sum::<f64>() / self.buffer.len() as f64)
        }
    }

    pub fn as_slice_vec(&self) -> Vec<f64> {
        self.buffer.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest_once_over_capacity() {
        let mut ring = RecentDataRing::new(3);
        ring.extend([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.as_slice_vec(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn mean_is_none_when_empty() {
        let ring = RecentDataRing::new(10);
        assert_eq!(ring.mean(), None);
    }

    #[test]
    fn mean_averages_current_contents() {
        let mut ring = RecentDataRing::new(10);
        ring.extend([10.0, 20.0, 30.0]);
        assert_eq!(ring.mean(), Some(20.0));
    }
}
