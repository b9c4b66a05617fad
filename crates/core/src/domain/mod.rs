pub mod bonus;
pub mod prediction;
pub mod tier;

pub use bonus::{WelcomeBonusWindow, WELCOME_BONUS_PICKS};
pub use prediction::{FilteredPredictionSet, PredictionItem};
pub use tier::{SubscriptionTier, TierCapabilities};
