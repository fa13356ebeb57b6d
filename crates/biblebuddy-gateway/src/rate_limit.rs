use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

struct Bucket {
    available: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn top_up(&mut self, now: Instant, per_second: f64, capacity: f64) {
        let gained = now.duration_since(self.refilled_at).as_secs_f64() * per_second;
        self.available = (self.available + gained).min(capacity);
        self.refilled_at = now;
    }
}

/// Per-session token bucket guarding turn submission.
///
/// A session may submit `burst` turns back to back, then one more every
/// `1 / per_second` seconds.
pub struct RateLimiter {
    burst: f64,
    per_second: f64,
    buckets: Mutex<HashMap<Uuid, Bucket>>,
}

impl RateLimiter {
    pub fn new(burst: f64, per_second: f64) -> Self {
        Self {
            burst,
            per_second,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Takes one token for `session_id`; `false` means the caller must back off.
    pub async fn check(&self, session_id: Uuid) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(session_id).or_insert_with(|| Bucket {
            available: self.burst,
            refilled_at: now,
        });
        bucket.top_up(now, self.per_second, self.burst);

        if bucket.available < 1.0 {
            return false;
        }
        bucket.available -= 1.0;
        true
    }

    /// Drops the bucket of an ended session.
    pub async fn forget(&self, session_id: Uuid) {
        self.buckets.lock().await.remove(&session_id);
    }

    /// Drops buckets untouched for `max_idle`.
    pub async fn cleanup(&self, max_idle: Duration) {
        let now = Instant::now();
        self.buckets
            .lock()
            .await
            .retain(|_, bucket| now.duration_since(bucket.refilled_at) < max_idle);
    }

    pub async fn tracked(&self) -> usize {
        self.buckets.lock().await.len()
    }
}
