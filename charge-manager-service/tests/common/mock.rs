#![allow(clippy::indexing_slicing)]
use std::cell::Cell;

use charge_manager_interface::host::PowerMeasurement;
use charge_manager_interface::{
    BatteryPresence, Board, ChargeLimit, PdPorts, PortId, PowerRole, Rejected, Supplier, TypecRp,
};
use charge_manager_service::MAX_CHARGE_PORTS;

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum FnCall {
    SetActiveChargePort(Option<PortId>),
    SetChargeLimit(ChargeLimit),
    CheckExtpower,
    RequestPowerSwap(PortId),
    SetNewPowerRequest(PortId),
    SetSourceCurrentLimit(PortId, TypecRp),
    SetExternalVoltageLimit(PortId, u32),
}

/// Board that accepts every port except the ones in `rejected_ports`
#[derive(Debug, Default)]
pub struct MockBoard {
    pub rejected_ports: Vec<PortId>,
    /// Reject "no port" as well
    pub reject_none: bool,
    pub battery: BatteryPresence,
    pub cut_off: bool,
    pub ro_locked: bool,
    pub ramp_max_ma: Option<u32>,
    pub vbus_mv: u32,
    /// Number of VBUS measurements taken
    pub vbus_reads: Cell<usize>,
    pub source_info: PowerMeasurement,
    /// Calls received so far
    pub calls: Vec<FnCall>,
}

impl MockBoard {
    fn record_fn_call(&mut self, fn_call: FnCall) {
        self.calls.push(fn_call);
    }

    /// Calls since the last time this was called
    pub fn take_calls(&mut self) -> Vec<FnCall> {
        std::mem::take(&mut self.calls)
    }
}

impl Board for MockBoard {
    fn set_active_charge_port(&mut self, port: Option<PortId>) -> Result<(), Rejected> {
        self.record_fn_call(FnCall::SetActiveChargePort(port));
        match port {
            Some(port) if self.rejected_ports.contains(&port) => Err(Rejected),
            None if self.reject_none => Err(Rejected),
            _ => Ok(()),
        }
    }

    fn set_charge_limit(&mut self, limit: ChargeLimit) {
        self.record_fn_call(FnCall::SetChargeLimit(limit));
    }

    fn battery_presence(&self) -> BatteryPresence {
        self.battery
    }

    fn battery_is_cut_off(&self) -> bool {
        self.cut_off
    }

    fn is_ro_locked(&self) -> bool {
        self.ro_locked
    }

    fn ramp_max_current_ma(&self, _port: PortId, supplier: Supplier, _current_ma: u32) -> Option<u32> {
        self.ramp_max_ma.filter(|_| supplier != Supplier::Pd)
    }

    fn has_charge_ramp(&self) -> bool {
        self.ramp_max_ma.is_some()
    }

    fn vbus_voltage_mv(&self, _port: PortId) -> u32 {
        self.vbus_reads.set(self.vbus_reads.get() + 1);
        self.vbus_mv
    }

    fn source_power_info(&self, _port: PortId) -> PowerMeasurement {
        self.source_info
    }

    fn check_extpower(&mut self) {
        self.record_fn_call(FnCall::CheckExtpower);
    }
}

/// PD ports, every port starts as a disconnected sink
#[derive(Debug)]
pub struct MockPdPorts {
    roles: [PowerRole; MAX_CHARGE_PORTS],
    connected: [bool; MAX_CHARGE_PORTS],
    // Internal state
    calls: Vec<FnCall>,
}

impl Default for MockPdPorts {
    fn default() -> Self {
        Self {
            roles: [PowerRole::Sink; MAX_CHARGE_PORTS],
            connected: [false; MAX_CHARGE_PORTS],
            calls: Vec::new(),
        }
    }
}

#[allow(dead_code)]
impl MockPdPorts {
    fn record_fn_call(&mut self, fn_call: FnCall) {
        self.calls.push(fn_call);
    }

    /// Calls since the last time this was called
    pub fn take_calls(&mut self) -> Vec<FnCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn set_role(&mut self, port: PortId, role: PowerRole) {
        self.roles[port.index()] = role;
    }

    pub fn set_connected(&mut self, port: PortId, connected: bool) {
        self.connected[port.index()] = connected;
    }
}

impl PdPorts for MockPdPorts {
    fn power_role(&self, port: PortId) -> PowerRole {
        self.roles[port.index()]
    }

    fn is_connected(&self, port: PortId) -> bool {
        self.connected[port.index()]
    }

    fn request_power_swap(&mut self, port: PortId) {
        self.record_fn_call(FnCall::RequestPowerSwap(port));
    }

    fn set_new_power_request(&mut self, port: PortId) {
        self.record_fn_call(FnCall::SetNewPowerRequest(port));
    }

    fn set_source_current_limit(&mut self, port: PortId, rp: TypecRp) {
        self.record_fn_call(FnCall::SetSourceCurrentLimit(port, rp));
    }

    fn set_external_voltage_limit(&mut self, port: PortId, voltage_mv: u32) {
        self.record_fn_call(FnCall::SetExternalVoltageLimit(port, voltage_mv));
    }
}
