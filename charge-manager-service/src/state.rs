//! Override and safe-mode state machines
use charge_manager_interface::{OverrideRequest, PortId};
use embassy_time::Instant;

/// Charge port override state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverrideState {
    /// Normal port selection
    #[default]
    Off,
    /// Don't charge from any port
    DontCharge,
    /// Only charge from this port
    Port(PortId),
    /// Waiting for the port to swap to sink before it becomes the override port
    Pending {
        /// Requested port
        port: PortId,
        /// The request is abandoned at this time
        deadline: Instant,
        /// Override that stays in effect until the swap completes
        previous: OverrideRequest,
    },
}

impl OverrideState {
    /// Override as seen by port selection and the host
    ///
    /// A pending override isn't in effect yet, the one it would replace still is.
    pub fn request(&self) -> OverrideRequest {
        match self {
            OverrideState::Off => OverrideRequest::Off,
            OverrideState::DontCharge => OverrideRequest::DontCharge,
            OverrideState::Port(port) => OverrideRequest::Port(*port),
            OverrideState::Pending { previous, .. } => *previous,
        }
    }

    /// Port of the active override
    pub fn port(&self) -> Option<PortId> {
        self.request().port()
    }

    /// Port waiting for a power role swap
    pub fn pending_port(&self) -> Option<PortId> {
        match self {
            OverrideState::Pending { port, .. } => Some(*port),
            _ => None,
        }
    }

    /// Deadline of a pending override
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            OverrideState::Pending { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Returns true if a pending override would be promoted by a charge on `port` at `now`
    pub fn promotes(&self, port: PortId, now: Instant) -> bool {
        matches!(self, OverrideState::Pending { port: pending, deadline, .. } if *pending == port && now < *deadline)
    }

    /// State left behind when a pending override times out
    pub fn abandoned(&self) -> OverrideState {
        match self {
            OverrideState::Pending { previous, .. } => OverrideState::from(*previous),
            state => *state,
        }
    }

    /// Drop the active port override, a pending override keeps waiting
    pub fn without_port(&self) -> OverrideState {
        match self {
            OverrideState::Port(_) => OverrideState::Off,
            OverrideState::Pending { port, deadline, previous } => OverrideState::Pending {
                port: *port,
                deadline: *deadline,
                previous: match previous {
                    OverrideRequest::Port(_) => OverrideRequest::Off,
                    previous => *previous,
                },
            },
            state => *state,
        }
    }

    /// Returns true if a new charger on `port` should cancel this override
    ///
    /// Not charging is never cancelled, not even a swap pending on top of it.
    pub fn cleared_by(&self, port: PortId) -> bool {
        match self {
            OverrideState::Off | OverrideState::DontCharge => false,
            OverrideState::Port(override_port) => *override_port != port,
            OverrideState::Pending {
                port: pending, previous, ..
            } => *pending != port && *previous != OverrideRequest::DontCharge && previous.port() != Some(port),
        }
    }
}

impl From<OverrideRequest> for OverrideState {
    fn from(request: OverrideRequest) -> Self {
        match request {
            OverrideRequest::Off => OverrideState::Off,
            OverrideRequest::DontCharge => OverrideState::DontCharge,
            OverrideRequest::Port(port) => OverrideState::Port(port),
        }
    }
}

/// Safe mode lifecycle, never re-entered once left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafeMode {
    /// Every charger is treated as dedicated, ceilings are ignored and "no port" is never selected
    Active,
    /// Leave request received, waiting for the delay to pass
    Leaving {
        /// Safe mode ends at this time
        at: Instant,
    },
    /// Normal operation
    Left,
}

impl SafeMode {
    /// Returns true once safe mode has been left
    pub fn is_left(&self) -> bool {
        matches!(self, SafeMode::Left)
    }

    /// Pending exit time
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            SafeMode::Leaving { at } => Some(*at),
            _ => None,
        }
    }
}
