//! Fixed-capacity circular sample store (§4.7). Trades exact
//! percentile precision for O(1) insertion and bounded memory: a
//! percentile read sorts a copy of the live region.

const CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct RingBuffer {
    samples: Vec<f64>,
    next: usize,
    len: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    pub fn new() -> Self {
        Self { samples: vec![0.0; CAPACITY], next: 0, len: 0 }
    }

    pub fn add(&mut self, value: f64) {
        self.samples[self.next] = value;
        self.next = (self.next + 1) % CAPACITY;
        if self.len < CAPACITY {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn live_region(&self) -> Vec<f64> {
        self.samples[..self.len].to_vec()
    }

    /// The `p`-th percentile (0..=100) over the live samples, via a
    /// sort-on-read copy. Index `⌊n·p/100⌋`, clamped to `n-1`.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let mut sorted = self.live_region();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let index = ((self.len as f64) * p / 100.0).floor() as usize;
        let index = index.min(self.len - 1);
        sorted[index]
    }

    pub fn min(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.live_region().into_iter().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.live_region().into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn average(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.live_region().iter().sum::<f64>() / self.len as f64
    }

    pub fn reset(&mut self) {
        self.next = 0;
        self.len = 0;
    }
}
