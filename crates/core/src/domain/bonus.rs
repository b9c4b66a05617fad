use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Picks granted while the welcome bonus is active, regardless of tier.
pub const WELCOME_BONUS_PICKS: usize = 5;

/// Time-boxed promotional quota elevation granted after onboarding.
/// Owned by the billing side; read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WelcomeBonusWindow {
    pub claimed: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl WelcomeBonusWindow {
    pub fn unclaimed() -> Self {
        Self::default()
    }

    pub fn claimed_until(expires_at: DateTime<Utc>) -> Self {
        Self {
            claimed: true,
            expires_at: Some(expires_at),
        }
    }

    /// The single authoritative activity check. Expiry is exclusive: a window
    /// whose `expires_at` equals `now` is already over.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.claimed && matches!(self.expires_at, Some(expires_at) if now < expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn unclaimed_window_is_never_active() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let window = WelcomeBonusWindow {
            claimed: false,
            expires_at: Some(now + Duration::hours(1)),
        };
        assert!(!window.is_active_at(now));
    }

    #[test]
    fn claimed_window_without_expiry_is_not_active() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let window = WelcomeBonusWindow {
            claimed: true,
            expires_at: None,
        };
        assert!(!window.is_active_at(now));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let expires_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let window = WelcomeBonusWindow::claimed_until(expires_at);

        assert!(window.is_active_at(expires_at - Duration::milliseconds(1)));
        assert!(!window.is_active_at(expires_at));
        assert!(!window.is_active_at(expires_at + Duration::milliseconds(1)));
    }
}
