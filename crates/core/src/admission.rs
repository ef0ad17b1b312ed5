use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::cache::{lock, BoundedKeyedCache};
use crate::domain::conversation::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self { max_requests: 3, window: Duration::from_secs(30) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Sliding-window admission control keyed by user.
///
/// Each user keeps the timestamps of their admitted requests inside the
/// trailing window. Rejected requests are not recorded, so a user who keeps
/// retrying is admitted again as soon as the oldest admission ages out.
pub struct RateLimiter {
    windows: BoundedKeyedCache<UserId, VecDeque<Instant>>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, max_tracked_users: usize) -> Self {
        Self { windows: BoundedKeyedCache::with_capacity(max_tracked_users), policy }
    }

    pub fn try_admit(&self, user_id: &UserId, now: Instant) -> Admission {
        let slot = self.windows.slot_or_default(user_id);
        let mut window = lock(&slot);

        while let Some(oldest) = window.front() {
            if now.saturating_duration_since(*oldest) >= self.policy.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.policy.max_requests {
            window.push_back(now);
            return Admission::Admitted;
        }

        let retry_after = window
            .front()
            .map(|oldest| self.policy.window.saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or(self.policy.window);
        Admission::Rejected { retry_after }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn tracked_users(&self) -> usize {
        self.windows.len()
    }
}
