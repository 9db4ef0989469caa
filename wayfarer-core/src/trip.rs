//! Trips and their planning preferences.

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Cost, TransportMode, TripId};

/// Whether a trip belongs to a registered account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum TripKind {
    /// Created without an account.
    #[default]
    Anonymous,
    /// Owned by a registered user.
    Registered,
}

impl TripKind {
    /// Default number of candidate orders to plan for this kind of trip.
    ///
    /// # Examples
    /// ```
    /// use wayfarer_core::TripKind;
    ///
    /// assert_eq!(TripKind::Anonymous.max_candidates(), 4);
    /// assert_eq!(TripKind::Registered.max_candidates(), 10);
    /// ```
    pub const fn max_candidates(self) -> usize {
        match self {
            Self::Anonymous => 4,
            Self::Registered => 10,
        }
    }
}

/// A trip whose points are to be ordered and routed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trip {
    /// Unique identifier.
    pub id: TripId,
    /// Account kind owning the trip.
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: TripKind,
    /// Expected departure time; the enumerator's starting clock.
    pub start: DateTime<Utc>,
    /// Maximum total travel cost, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub budget: Option<Cost>,
    /// Transport mode used for every leg.
    pub preferred_mode: TransportMode,
}

impl Trip {
    /// Create an anonymous trip without a budget.
    pub const fn new(id: TripId, start: DateTime<Utc>, preferred_mode: TransportMode) -> Self {
        Self {
            id,
            kind: TripKind::Anonymous,
            start,
            budget: None,
            preferred_mode,
        }
    }

    /// Set the travel budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: Cost) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Set the account kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: TripKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether `total` fits within the budget. Trips without a budget accept
    /// any cost.
    pub fn within_budget(&self, total: Cost) -> bool {
        self.budget.is_none_or(|budget| total <= budget)
    }
}
