//! Rewards granted by islands and quests

use serde::{Deserialize, Serialize};

use crate::{CrewMemberId, Currency};

/// A tagged reward: either spendable currency or a specific crew member.
///
/// ```json
/// { "kind": "currency", "amount": 250 }
/// { "kind": "crew_member", "crew_member_id": "navigator" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reward {
    Currency { amount: Currency },
    CrewMember { crew_member_id: CrewMemberId },
}

impl Reward {
    pub fn currency(amount: u64) -> Self {
        Self::Currency {
            amount: Currency::new(amount),
        }
    }

    pub fn crew_member(crew_member_id: CrewMemberId) -> Self {
        Self::CrewMember { crew_member_id }
    }

    /// The crew member this reward names, if it is a crew reward.
    pub fn crew_member_id(&self) -> Option<&CrewMemberId> {
        match self {
            Self::CrewMember { crew_member_id } => Some(crew_member_id),
            Self::Currency { .. } => None,
        }
    }

    /// The currency this reward carries (zero for crew rewards).
    pub fn currency_amount(&self) -> Currency {
        match self {
            Self::Currency { amount } => *amount,
            Self::CrewMember { .. } => Currency::ZERO,
        }
    }
}

impl std::fmt::Display for Reward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Currency { amount } => write!(f, "{} currency", amount),
            Self::CrewMember { crew_member_id } => write!(f, "crew member {}", crew_member_id),
        }
    }
}
