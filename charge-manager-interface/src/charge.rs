//! Charge selection results and request types
use crate::port::PortId;
use crate::supplier::Supplier;

/// A supplier on a specific port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeSource {
    /// Port to charge from
    pub port: PortId,
    /// Supplier on that port
    pub supplier: Supplier,
}

impl ChargeSource {
    /// Create a new charge source
    pub const fn new(port: PortId, supplier: Supplier) -> Self {
        Self { port, supplier }
    }
}

/// Currently applied charge state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActiveCharge {
    /// Active port and supplier, none if not charging
    pub source: Option<ChargeSource>,
    /// Input current limit after ceilings, none until the first selection
    pub current_ma: Option<u32>,
    /// Input current limit before ceilings, none until the first selection
    pub current_uncapped_ma: Option<u32>,
    /// Supply voltage in mV
    pub voltage_mv: u32,
}

impl ActiveCharge {
    /// Active port, if any
    pub fn port(&self) -> Option<PortId> {
        self.source.map(|source| source.port)
    }

    /// Active supplier, if any
    pub fn supplier(&self) -> Option<Supplier> {
        self.source.map(|source| source.supplier)
    }

    /// Applied power limit in uW, zero before the first selection
    pub fn power_limit_uw(&self) -> u64 {
        self.current_ma
            .map_or(0, |current| u64::from(current) * u64::from(self.voltage_mv))
    }
}

/// Parameters for [`crate::Board::set_charge_limit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeLimit {
    /// Active port
    pub port: Option<PortId>,
    /// Active supplier
    pub supplier: Option<Supplier>,
    /// Input current limit after ceilings in mA
    pub current_ma: u32,
    /// Input current limit before ceilings in mA
    pub current_uncapped_ma: u32,
    /// Supply voltage in mV
    pub voltage_mv: u32,
}

/// Requested charge port override
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverrideRequest {
    /// Normal port selection
    #[default]
    Off,
    /// Don't charge from any port
    DontCharge,
    /// Only charge from this port
    Port(PortId),
}

impl OverrideRequest {
    /// Port targeted by the override, if any
    pub fn port(&self) -> Option<PortId> {
        match self {
            OverrideRequest::Port(port) => Some(*port),
            _ => None,
        }
    }
}

/// Override request failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverrideError {
    /// A delayed override is waiting for a power role swap
    Busy,
    /// The port does not exist
    InvalidPort,
    /// The port is sourcing to a partner that cannot source back
    Unsupported,
}

/// The board refused to switch to the requested charge port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rejected;

/// The request cannot be applied in the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Unavailable;
