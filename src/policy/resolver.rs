//! Role-priority entitlement resolver

use serde::{Deserialize, Serialize};

use crate::db::schemas::{AccessRule, CommunityDoc, ItemConfig, ItemOverride, WILDCARD_ITEM};
use crate::ratelimit::UNLIMITED;

/// One role held by the requesting user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMembership {
    /// Role identifier, matching the keys of the community's role policies
    pub role_id: String,

    /// Hierarchy position; higher is more senior
    pub position: i64,
}

impl RoleMembership {
    pub fn new(role_id: impl Into<String>, position: i64) -> Self {
        Self {
            role_id: role_id.into(),
            position,
        }
    }
}

/// Resolved access terms for (user, community, item type).
///
/// Derived fresh per request and never cached: role membership can change
/// between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveAccess {
    pub enabled: bool,
    pub cost: i64,
    pub cooldown_hours: i64,
    /// Claims per user per UTC day; -1 means unlimited
    pub daily_limit: i64,
}

impl EffectiveAccess {
    /// Access denied outcome; also used for unknown item types
    pub fn denied() -> Self {
        Self {
            enabled: false,
            cost: 0,
            cooldown_hours: 0,
            daily_limit: UNLIMITED,
        }
    }

    fn from_base(base: &ItemConfig) -> Self {
        Self {
            enabled: base.enabled,
            cost: base.cost,
            cooldown_hours: base.cooldown,
            daily_limit: UNLIMITED,
        }
    }

    fn merged(base: &ItemConfig, ov: &ItemOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(base.enabled),
            cost: ov.cost.unwrap_or(base.cost),
            cooldown_hours: ov.cooldown.unwrap_or(base.cooldown),
            daily_limit: ov.daily_limit.unwrap_or(UNLIMITED),
        }
    }
}

/// Resolve the effective access for one item type.
///
/// When the community is not role-based the base item config applies as-is.
/// Otherwise the user's roles are scanned in the order given; only roles
/// whose matching access entry (exact item key first, then the `"all"`
/// wildcard) is a structured override are candidates, and a candidate
/// replaces the current winner only on a strictly greater hierarchy
/// position. Equal positions keep the first candidate encountered; this
/// mirrors the long-standing production behavior and is pinned by tests, so
/// do not "fix" it to last-wins or most-specific-wins.
///
/// An unknown item type or a user with no qualifying role resolves to
/// denied, never an error.
pub fn resolve(
    user_roles: &[RoleMembership],
    community: &CommunityDoc,
    item_type: &str,
) -> EffectiveAccess {
    let Some(base) = community.items.get(item_type) else {
        return EffectiveAccess::denied();
    };

    if !community.role_based {
        return EffectiveAccess::from_base(base);
    }

    let mut winner: Option<(i64, &ItemOverride)> = None;

    for role in user_roles {
        let Some(policy) = community.roles.get(&role.role_id) else {
            continue;
        };

        let rule = policy
            .access
            .get(item_type)
            .or_else(|| policy.access.get(WILDCARD_ITEM));

        // Bare flags carry no terms and never win the priority comparison
        let Some(AccessRule::Override(ov)) = rule else {
            continue;
        };

        match winner {
            Some((position, _)) if role.position <= position => {}
            _ => winner = Some((role.position, ov)),
        }
    }

    match winner {
        Some((_, ov)) => EffectiveAccess::merged(base, ov),
        None => EffectiveAccess::denied(),
    }
}
