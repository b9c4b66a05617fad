use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Elite,
}

impl SubscriptionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Elite => "elite",
        }
    }

    /// Paid tiers bypass the free-tier chat message cap.
    pub fn is_privileged(self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "elite" => Ok(SubscriptionTier::Elite),
            other => anyhow::bail!("unknown subscription tier: {other}"),
        }
    }
}

/// Daily pick quota per tier.
#[derive(Debug, Clone)]
pub struct TierCapabilities {
    free_daily_picks: u32,
    pro_daily_picks: u32,
    elite_daily_picks: u32,
}

impl Default for TierCapabilities {
    fn default() -> Self {
        Self {
            free_daily_picks: 2,
            pro_daily_picks: 10,
            elite_daily_picks: 15,
        }
    }
}

impl TierCapabilities {
    pub fn new(free: u32, pro: u32, elite: u32) -> anyhow::Result<Self> {
        let out = Self {
            free_daily_picks: free,
            pro_daily_picks: pro,
            elite_daily_picks: elite,
        };
        out.validate()?;
        Ok(out)
    }

    /// Env overrides: FREE_DAILY_PICKS / PRO_DAILY_PICKS / ELITE_DAILY_PICKS.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("FREE_DAILY_PICKS") {
            if let Ok(n) = s.parse::<u32>() {
                out.free_daily_picks = n;
            }
        }

        if let Ok(s) = std::env::var("PRO_DAILY_PICKS") {
            if let Ok(n) = s.parse::<u32>() {
                out.pro_daily_picks = n;
            }
        }

        if let Ok(s) = std::env::var("ELITE_DAILY_PICKS") {
            if let Ok(n) = s.parse::<u32>() {
                out.elite_daily_picks = n;
            }
        }

        out.validate()?;
        Ok(out)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.free_daily_picks >= 1,
            "free tier daily picks must be >= 1 (got {})",
            self.free_daily_picks
        );
        ensure!(
            self.free_daily_picks < self.pro_daily_picks,
            "pro daily picks must exceed free ({} >= {})",
            self.free_daily_picks,
            self.pro_daily_picks
        );
        ensure!(
            self.pro_daily_picks <= self.elite_daily_picks,
            "elite daily picks must be >= pro ({} > {})",
            self.pro_daily_picks,
            self.elite_daily_picks
        );
        Ok(())
    }

    pub fn daily_picks(&self, tier: SubscriptionTier) -> usize {
        let n = match tier {
            SubscriptionTier::Free => self.free_daily_picks,
            SubscriptionTier::Pro => self.pro_daily_picks,
            SubscriptionTier::Elite => self.elite_daily_picks,
        };
        n as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tier_names_case_insensitively() {
        assert_eq!(
            "Free".parse::<SubscriptionTier>().unwrap(),
            SubscriptionTier::Free
        );
        assert_eq!(
            " elite ".parse::<SubscriptionTier>().unwrap(),
            SubscriptionTier::Elite
        );
        assert!("vip".parse::<SubscriptionTier>().is_err());
    }

    #[test]
    fn default_quotas_are_strictly_tiered() {
        let caps = TierCapabilities::default();
        assert!(caps.daily_picks(SubscriptionTier::Free) < caps.daily_picks(SubscriptionTier::Pro));
        assert!(
            caps.daily_picks(SubscriptionTier::Pro) <= caps.daily_picks(SubscriptionTier::Elite)
        );
    }

    #[test]
    fn rejects_inverted_quota_ordering() {
        assert!(TierCapabilities::new(10, 2, 15).is_err());
        assert!(TierCapabilities::new(2, 15, 10).is_err());
        assert!(TierCapabilities::new(0, 1, 2).is_err());
        // pro == elite is allowed.
        assert!(TierCapabilities::new(2, 10, 10).is_ok());
    }

    #[test]
    fn only_free_tier_is_unprivileged() {
        assert!(!SubscriptionTier::Free.is_privileged());
        assert!(SubscriptionTier::Pro.is_privileged());
        assert!(SubscriptionTier::Elite.is_privileged());
    }
}
