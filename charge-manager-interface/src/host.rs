//! Host visible power information
use bitfield::bitfield;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::supplier::Supplier;

/// Charger type reported to the host
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UsbChargeType {
    /// Nothing connected, or the port is sourcing
    None,
    /// USB PD
    Pd,
    /// Type-C current
    C,
    /// Proprietary signature
    Proprietary,
    /// BC1.2 DCP
    Bc12Dcp,
    /// BC1.2 CDP
    Bc12Cdp,
    /// BC1.2 SDP
    Bc12Sdp,
    /// Anything else
    Other,
    /// VBUS only
    Vbus,
    /// Detection not yet debounced
    Unknown,
    /// Dedicated charger
    Dedicated,
}

impl From<Supplier> for UsbChargeType {
    fn from(supplier: Supplier) -> Self {
        match supplier {
            Supplier::Pd => UsbChargeType::Pd,
            Supplier::TypeC | Supplier::TypeCDts => UsbChargeType::C,
            Supplier::Proprietary => UsbChargeType::Proprietary,
            Supplier::Bc12Dcp => UsbChargeType::Bc12Dcp,
            Supplier::Bc12Cdp => UsbChargeType::Bc12Cdp,
            Supplier::Bc12Sdp => UsbChargeType::Bc12Sdp,
            Supplier::Vbus => UsbChargeType::Vbus,
            Supplier::Dedicated => UsbChargeType::Dedicated,
            Supplier::TypeCUnder1A5 | Supplier::Other => UsbChargeType::Other,
        }
    }
}

/// Port power role reported to the host
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UsbPowerRole {
    /// Nothing connected
    Disconnected,
    /// Providing power
    Source,
    /// Charging from this port
    Sink,
    /// A charger is present but another port is active
    SinkNotCharging,
}

/// Voltage and current measurements of a port
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerMeasurement {
    /// Maximum voltage in mV
    pub voltage_max_mv: u32,
    /// Measured VBUS in mV
    pub voltage_now_mv: u32,
    /// Maximum current in mA
    pub current_max_ma: u32,
    /// Applied current limit in mA
    pub current_lim_ma: u32,
}

/// Power information for a single port
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerInfo {
    /// Power role
    pub role: UsbPowerRole,
    /// Charger type
    pub charge_type: UsbChargeType,
    /// Port partner is dual-role capable
    pub dualrole: bool,
    /// Measurements
    pub meas: PowerMeasurement,
    /// Maximum power in uW
    pub max_power_uw: u64,
}

bitfield! {
    /// Raw charge flags bit field
    #[derive(Copy, Clone, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    struct ChargeFlagsRaw(u32);
    impl Debug;
    pub u8, role, set_role: 2, 0;
    pub u8, charge_type, set_charge_type: 6, 3;
    pub bool, override_port, set_override_port: 13;
    pub bool, delayed_override, set_delayed_override: 14;
    pub bool, dualrole, set_dualrole: 15;
}

/// Compact per-port flags stored alongside power state log entries
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeFlags(ChargeFlagsRaw);

impl ChargeFlags {
    /// Flags describing the given power info
    pub fn from_power_info(info: &PowerInfo) -> Self {
        let mut raw = ChargeFlagsRaw(0);
        raw.set_role(info.role.into());
        raw.set_charge_type(info.charge_type.into());
        raw.set_dualrole(info.dualrole);
        Self(raw)
    }

    /// Builder method to mark the port as the override port
    pub fn with_override(mut self, value: bool) -> Self {
        self.0.set_override_port(value);
        self
    }

    /// Builder method to mark the port as the delayed override port
    pub fn with_delayed_override(mut self, value: bool) -> Self {
        self.0.set_delayed_override(value);
        self
    }

    /// Power role
    pub fn role(&self) -> Option<UsbPowerRole> {
        UsbPowerRole::try_from(self.0.role()).ok()
    }

    /// Charger type
    pub fn charge_type(&self) -> Option<UsbChargeType> {
        UsbChargeType::try_from(self.0.charge_type()).ok()
    }

    /// Port is the override port
    pub fn is_override(&self) -> bool {
        self.0.override_port()
    }

    /// Port is the delayed override port
    pub fn is_delayed_override(&self) -> bool {
        self.0.delayed_override()
    }

    /// Partner is dual-role
    pub fn is_dualrole(&self) -> bool {
        self.0.dualrole()
    }

    /// Raw value
    pub fn bits(&self) -> u16 {
        // All fields fit in the low 16 bits
        (self.0.0 & 0xffff) as u16
    }
}
