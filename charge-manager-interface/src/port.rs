//! Per-port definitions
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Charge port ID new type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortId(pub u8);

impl PortId {
    /// Column of this port in the charge table
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Current and voltage offered by one supplier on one port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargePortInfo {
    /// Available current in mA
    pub current_ma: u32,
    /// Supply voltage in mV
    pub voltage_mv: u32,
}

impl ChargePortInfo {
    /// No offer
    pub const ZERO: Self = Self::new(0, 0);

    /// Create a new offer
    pub const fn new(current_ma: u32, voltage_mv: u32) -> Self {
        Self { current_ma, voltage_mv }
    }

    /// Offered power in uW
    pub fn power_uw(&self) -> u64 {
        u64::from(self.current_ma) * u64::from(self.voltage_mv)
    }

    /// Returns true if both current and voltage are non-zero
    pub fn has_charge(&self) -> bool {
        self.current_ma > 0 && self.voltage_mv > 0
    }
}

/// Power role capability of the port partner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DualRoleCapability {
    /// Not yet known, treated like dual-role
    #[default]
    Unknown,
    /// Partner can only source, e.g. an AC adapter
    Dedicated,
    /// Partner can source or sink, e.g. a phone or power bank
    DualRole,
}

/// Current power role of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerRole {
    /// Port provides power to the partner
    Source,
    /// Port receives power from the partner
    Sink,
}

/// Type-C Rp pull-up value advertised when sourcing
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TypecRp {
    /// Default USB power
    Usb,
    /// 1.5A
    Rp1A5,
    /// 3.0A
    Rp3A0,
}

impl TypecRp {
    /// Current advertised by this pull-up in mA
    pub const fn current_ma(self) -> u32 {
        match self {
            TypecRp::Usb => 500,
            TypecRp::Rp1A5 => 1500,
            TypecRp::Rp3A0 => 3000,
        }
    }
}

/// Number of ceiling requestors
pub const CEIL_REQUESTOR_COUNT: usize = 2;

/// Party imposing a current ceiling on a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CeilRequestor {
    /// PD transport, e.g. while a voltage transition is in progress
    Pd,
    /// Host requested limit
    Host,
}

impl CeilRequestor {
    /// Slot of this requestor in a port's ceiling table
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_charge() {
        assert!(!ChargePortInfo::ZERO.has_charge());
        assert!(!ChargePortInfo::new(0, 5000).has_charge());
        assert!(!ChargePortInfo::new(1500, 0).has_charge());
        assert!(ChargePortInfo::new(1500, 5000).has_charge());
    }

    #[test]
    fn test_power() {
        assert_eq!(ChargePortInfo::new(3000, 20000).power_uw(), 60_000_000);
        assert_eq!(ChargePortInfo::new(u32::MAX, 2).power_uw(), u64::from(u32::MAX) * 2);
    }

    #[test]
    fn test_rp_current() {
        assert_eq!(TypecRp::Usb.current_ma(), 500);
        assert_eq!(TypecRp::Rp1A5.current_ma(), 1500);
        assert_eq!(TypecRp::Rp3A0.current_ma(), 3000);
        assert_eq!(TypecRp::try_from(2u8).ok(), Some(TypecRp::Rp3A0));
        assert!(TypecRp::try_from(3u8).is_err());
    }
}
