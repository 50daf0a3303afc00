use chrono::{DateTime, Utc};

/// Parameters for a single lock attempt on a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLock {
    /// The timestamp written into `consumed_at`. The holder must present the same value to record its result or to
    /// release the lock.
    pub locked_at: DateTime<Utc>,
    /// If set, a lock that was taken before this instant, and never produced an order, may be taken over.
    pub stale_before: Option<DateTime<Utc>>,
}

impl SessionLock {
    pub fn new(locked_at: DateTime<Utc>) -> Self {
        Self { locked_at, stale_before: None }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn reclaiming_before(mut self, stale_before: DateTime<Utc>) -> Self {
        self.stale_before = Some(stale_before);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockResult {
    /// The conditional update affected the row. The caller owns the session until it records an order or releases.
    Acquired,
    /// Someone else holds, or has already finished with, the session.
    NotAcquired,
}

impl LockResult {
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 1 {
            Self::Acquired
        } else {
            Self::NotAcquired
        }
    }

    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}
