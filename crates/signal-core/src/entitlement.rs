use serde::{Deserialize, Serialize};

/// Subscription standing of a caller, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementTier {
    Anonymous,
    Registered,
    Trialing,
    Active,
}

impl EntitlementTier {
    /// Map an account's billing status to a tier. Unknown statuses
    /// (`canceled`, `past_due`, ...) leave the caller registered but unsubscribed.
    pub fn from_subscription_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "active" => EntitlementTier::Active,
            "trialing" => EntitlementTier::Trialing,
            _ => EntitlementTier::Registered,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self, EntitlementTier::Active | EntitlementTier::Trialing)
    }
}

impl std::fmt::Display for EntitlementTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntitlementTier::Anonymous => write!(f, "anonymous"),
            EntitlementTier::Registered => write!(f, "registered"),
            EntitlementTier::Trialing => write!(f, "trialing"),
            EntitlementTier::Active => write!(f, "active"),
        }
    }
}

/// Who is calling, resolved fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub id: Option<String>,
    pub tier: EntitlementTier,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            tier: EntitlementTier::Anonymous,
        }
    }

    pub fn account(id: impl Into<String>, tier: EntitlementTier) -> Self {
        Self {
            id: Some(id.into()),
            tier,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none() || self.tier == EntitlementTier::Anonymous
    }
}

impl Default for CallerIdentity {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_subscription_status() {
        assert_eq!(EntitlementTier::from_subscription_status("active"), EntitlementTier::Active);
        assert_eq!(EntitlementTier::from_subscription_status("Trialing"), EntitlementTier::Trialing);
        assert_eq!(EntitlementTier::from_subscription_status("canceled"), EntitlementTier::Registered);
        assert_eq!(EntitlementTier::from_subscription_status(""), EntitlementTier::Registered);
    }

    #[test]
    fn test_subscribed_tiers() {
        assert!(EntitlementTier::Active.is_subscribed());
        assert!(EntitlementTier::Trialing.is_subscribed());
        assert!(!EntitlementTier::Registered.is_subscribed());
        assert!(!EntitlementTier::Anonymous.is_subscribed());
    }

    #[test]
    fn test_anonymous_identity() {
        let caller = CallerIdentity::default();
        assert!(caller.is_anonymous());
        assert!(!CallerIdentity::account("u1", EntitlementTier::Registered).is_anonymous());
    }
}
