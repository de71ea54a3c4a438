//! Collaborator traits implemented by the board and the PD stack
use crate::charge::{ChargeLimit, Rejected};
use crate::host::PowerMeasurement;
use crate::port::{PortId, PowerRole, TypecRp};
use crate::supplier::Supplier;

/// Battery presence as reported by the battery collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryPresence {
    /// Battery is present
    #[default]
    Yes,
    /// No battery
    No,
    /// Presence cannot be determined yet
    NotSure,
}

/// Board specific hooks
///
/// None of these functions may block, they are called from the middle of a refresh pass.
pub trait Board {
    /// Route input power from the given port, or cut input power off if `None`
    ///
    /// Rejecting `None` is a board integration bug.
    fn set_active_charge_port(&mut self, port: Option<PortId>) -> Result<(), Rejected>;

    /// Apply a new input current limit
    fn set_charge_limit(&mut self, limit: ChargeLimit);

    /// Returns true if a non-PD port is sinking
    fn port_is_sink(&self, _port: PortId) -> bool {
        true
    }

    /// Returns true if something is attached to a non-PD port
    fn port_is_connected(&self, _port: PortId) -> bool {
        true
    }

    /// Battery presence
    fn battery_presence(&self) -> BatteryPresence {
        BatteryPresence::Yes
    }

    /// Returns true if the battery is in ship/cut-off mode
    fn battery_is_cut_off(&self) -> bool {
        false
    }

    /// Returns true if the running image cannot talk PD, so dual-role capability can't be learned
    fn is_ro_locked(&self) -> bool {
        false
    }

    /// Maximum current the charge ramp may reach for this supplier, `None` if ramping isn't allowed
    fn ramp_max_current_ma(&self, _port: PortId, _supplier: Supplier, _current_ma: u32) -> Option<u32> {
        None
    }

    /// Returns true if a charge ramp collaborator exists
    fn has_charge_ramp(&self) -> bool {
        false
    }

    /// Measured VBUS of a charging port in mV
    fn vbus_voltage_mv(&self, _port: PortId) -> u32 {
        0
    }

    /// Power info of a non-PD port that isn't supplying charge
    fn source_power_info(&self, _port: PortId) -> PowerMeasurement {
        PowerMeasurement::default()
    }

    /// Re-check external power presence after a port or limit change
    fn check_extpower(&mut self) {}
}

/// Requests into the per-port PD tasks
///
/// All requests are fire-and-forget.
pub trait PdPorts {
    /// Current power role of the port
    fn power_role(&self, port: PortId) -> PowerRole;

    /// Returns true if a partner is attached
    fn is_connected(&self, port: PortId) -> bool;

    /// Ask the port to swap power roles
    fn request_power_swap(&mut self, port: PortId);

    /// Ask the port to send a new power request to its partner
    fn set_new_power_request(&mut self, port: PortId);

    /// Update the Rp advertised while sourcing
    fn set_source_current_limit(&mut self, _port: PortId, _rp: TypecRp) {}

    /// Limit the voltage requested from the partner
    fn set_external_voltage_limit(&mut self, _port: PortId, _voltage_mv: u32) {}
}
