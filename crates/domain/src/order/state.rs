//! Order lifecycle state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Placed ──► Dispatched ──► Completed ──► Returned
///    │            │
///    └────────────┴──► Cancelled
/// ```
///
/// `Cancelled` and `Returned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order has been created and stock reserved.
    #[default]
    Placed,

    /// Order has left the warehouse.
    Dispatched,

    /// Order has been delivered.
    Completed,

    /// Completed order was sent back (terminal state).
    Returned,

    /// Order was cancelled before completion (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Position along the forward path; `Cancelled` is off the path.
    fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Placed => Some(0),
            OrderStatus::Dispatched => Some(1),
            OrderStatus::Completed => Some(2),
            OrderStatus::Returned => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Returns true if an order may move from this status to `requested`.
    ///
    /// Forward moves advance exactly one step. Cancellation is allowed
    /// only before the order completes. Nothing leaves `Cancelled`, and a
    /// status never transitions to itself.
    pub fn can_transition_to(self, requested: OrderStatus) -> bool {
        if self == requested || self == OrderStatus::Cancelled {
            return false;
        }

        let Some(current) = self.rank() else {
            return false;
        };

        if requested == OrderStatus::Cancelled {
            return self.precedes(OrderStatus::Completed);
        }

        match requested.rank() {
            Some(next) => next == current + 1,
            None => false,
        }
    }

    /// Returns true if this status comes strictly before `other` on the
    /// forward path.
    fn precedes(self, other: OrderStatus) -> bool {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Returned | OrderStatus::Cancelled)
    }

    /// Returns true if entering this status puts the order's stock back on hand.
    pub fn releases_stock(&self) -> bool {
        matches!(self, OrderStatus::Returned | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Dispatched => "Dispatched",
            OrderStatus::Completed => "Completed",
            OrderStatus::Returned => "Returned",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// All statuses in forward order, `Cancelled` last.
    pub fn all() -> [OrderStatus; 5] {
        [
            OrderStatus::Placed,
            OrderStatus::Dispatched,
            OrderStatus::Completed,
            OrderStatus::Returned,
            OrderStatus::Cancelled,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A status name that is not one of the known statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::all()
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_default_status_is_placed() {
        assert_eq!(OrderStatus::default(), Placed);
    }

    #[test]
    fn test_legal_transitions() {
        assert!(Placed.can_transition_to(Dispatched));
        assert!(Placed.can_transition_to(Cancelled));
        assert!(Dispatched.can_transition_to(Cancelled));
        assert!(Dispatched.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Returned));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Placed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Returned.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Placed));
        assert!(!Placed.can_transition_to(Placed));
    }

    #[test]
    fn test_no_backward_moves() {
        assert!(!Dispatched.can_transition_to(Placed));
        assert!(!Completed.can_transition_to(Dispatched));
        assert!(!Returned.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for from in [Returned, Cancelled] {
            assert!(from.is_terminal());
            for to in OrderStatus::all() {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_exactly_five_legal_edges() {
        let legal = OrderStatus::all()
            .into_iter()
            .flat_map(|from| OrderStatus::all().map(|to| (from, to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .count();
        assert_eq!(legal, 5);
    }

    #[test]
    fn test_releases_stock() {
        assert!(Cancelled.releases_stock());
        assert!(Returned.releases_stock());
        assert!(!Placed.releases_stock());
        assert!(!Dispatched.releases_stock());
        assert!(!Completed.releases_stock());
    }

    #[test]
    fn test_parse_round_trips_names() {
        for status in OrderStatus::all() {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!(
            "Shipped".parse::<OrderStatus>(),
            Err(UnknownStatus("Shipped".to_string()))
        );
        assert!("placed".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Dispatched).unwrap();
        assert_eq!(json, "\"Dispatched\"");
    }
}
