use std::sync::Mutex;
use std::time::Instant;

/// Phase timestamps captured as an `execute` attempt progresses.
///
/// reqwest's high-level API doesn't expose per-phase connection hooks,
/// so DNS is timed separately via an eager `lookup_host` call before
/// handing the request to reqwest; connect and TLS are not
/// independently observable and are folded into `ttfb`.
#[derive(Default, Clone, Copy)]
pub struct PhaseSnapshot {
    pub dns_ms: Option<f64>,
    pub connect_ms: Option<f64>,
    pub tls_ms: Option<f64>,
    pub ttfb_ms: Option<f64>,
}

pub struct TimingCapture {
    overall_start: Instant,
    snapshot: Mutex<PhaseSnapshot>,
}

impl TimingCapture {
    pub fn start() -> Self {
        Self { overall_start: Instant::now(), snapshot: Mutex::new(PhaseSnapshot::default()) }
    }

    pub fn record_dns(&self, elapsed: std::time::Duration) {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).dns_ms = Some(to_ms(elapsed));
    }

    /// Connect and TLS are recorded together as zero-duration markers
    /// since reqwest doesn't separate them from the aggregate
    /// connect+TLS+first-byte span captured by `record_ttfb`.
    pub fn record_connect_and_tls_unmeasured(&self) {
        let mut snap = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snap.connect_ms = Some(0.0);
        snap.tls_ms = Some(0.0);
    }

    pub fn record_ttfb(&self, since: Instant) {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).ttfb_ms = Some(to_ms(since.elapsed()));
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn total_ms(&self) -> f64 {
        to_ms(self.overall_start.elapsed())
    }
}

fn to_ms(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
