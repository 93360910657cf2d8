//! Point-to-point signaling relay
//!
//! Forwards WebRTC negotiation payloads between two connections without
//! looking at them. Delivery is best-effort: a message for a connection
//! that is gone is dropped.

use serde_json::Value;

use onair_protocol::{ConnectionId, ServerEvent};

use crate::connection::SessionRegistry;

/// Kind of negotiation message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    fn into_event(self, from: ConnectionId, payload: Value) -> ServerEvent {
        match self {
            SignalKind::Offer => ServerEvent::Offer { from, payload },
            SignalKind::Answer => ServerEvent::Answer { from, payload },
            SignalKind::IceCandidate => ServerEvent::IceCandidate { from, payload },
        }
    }
}

/// Whether a relayed message reached its target's mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    Dropped,
}

impl From<bool> for RelayOutcome {
    fn from(delivered: bool) -> Self {
        if delivered {
            RelayOutcome::Delivered
        } else {
            RelayOutcome::Dropped
        }
    }
}

/// Stateless forwarder
pub struct SignalingRelay;

impl SignalingRelay {
    /// Forward `payload` from `from` to `target`, tagged with the sender
    pub fn forward(
        registry: &SessionRegistry,
        kind: SignalKind,
        from: ConnectionId,
        target: ConnectionId,
        payload: Value,
    ) -> RelayOutcome {
        if from == target {
            tracing::debug!("Dropping {:?} from {} addressed to itself", kind, from);
            return RelayOutcome::Dropped;
        }

        let outcome = RelayOutcome::from(registry.send_to(&target, kind.into_event(from, payload)));
        if outcome == RelayOutcome::Dropped {
            tracing::debug!("Dropping {:?} from {}: {} is gone", kind, from, target);
        }
        outcome
    }

    /// Introduce `viewer` to the broadcaster so it can start an offer
    pub fn introduce(
        registry: &SessionRegistry,
        viewer: ConnectionId,
        broadcaster: Option<ConnectionId>,
    ) -> RelayOutcome {
        match broadcaster {
            Some(broadcaster) if broadcaster != viewer => {
                RelayOutcome::from(registry.send_to(&broadcaster, ServerEvent::NewPeer { peer: viewer }))
            }
            _ => RelayOutcome::Dropped,
        }
    }
}
