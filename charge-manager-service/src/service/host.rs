//! Host visible state
use charge_manager_interface::host::{ChargeFlags, PowerInfo, PowerMeasurement, UsbChargeType, UsbPowerRole};
use charge_manager_interface::{
    ActiveCharge, Board, ChargePortInfo, DualRoleCapability, OverrideRequest, PdPorts, PortId, Supplier,
};
use embassy_time::Instant;

use super::Service;
use crate::selection::select_best;

/// VBUS while sourcing or sinking without charging
const VSAFE5V_MV: u32 = 5000;

/// Power info request failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerInfoError {
    /// The port does not exist
    InvalidPort,
}

impl<B: Board, P: PdPorts> Service<'_, B, P> {
    /// Applied charge
    pub fn active_charge(&self) -> ActiveCharge {
        self.active
    }

    /// Active charge port
    pub fn active_port(&self) -> Option<PortId> {
        self.active.port()
    }

    /// Active supplier
    pub fn active_supplier(&self) -> Option<Supplier> {
        self.active.supplier()
    }

    /// Applied input current limit, `None` before the first refresh
    pub fn charger_current_ma(&self) -> Option<u32> {
        self.active.current_ma
    }

    /// Supply voltage of the active port
    pub fn charger_voltage_mv(&self) -> u32 {
        self.active.voltage_mv
    }

    /// Applied power limit in uW
    pub fn power_limit_uw(&self) -> u64 {
        self.active.power_limit_uw()
    }

    /// Uncapped current of the active supplier if it is PD
    pub fn pd_current_uncapped_ma(&self) -> Option<u32> {
        self.pd_current_uncapped_ma
    }

    /// Override in effect
    pub fn override_request(&self) -> OverrideRequest {
        self.override_state.request()
    }

    /// Port waiting for a power role swap before becoming the override port
    pub fn delayed_override_port(&self) -> Option<PortId> {
        self.override_state.pending_port()
    }

    /// Port a refresh would select right now, without applying it
    pub fn selected_charge_port(&self) -> Option<PortId> {
        select_best(&self.table, &self.selection_policy()).map(|source| source.port)
    }

    /// Number of charge ports, holes included
    pub fn charge_port_count(&self) -> usize {
        self.config.layout.port_count()
    }

    /// Every non-empty cell of the charge table
    pub fn offers(&self) -> impl Iterator<Item = (PortId, Supplier, ChargePortInfo)> + '_ {
        self.table.offers()
    }

    /// Best supplier on a port among the charges `accept` allows
    fn find_supplier(&self, port: PortId, accept: impl Fn(&ChargePortInfo) -> bool) -> Option<Supplier> {
        let priority = &self.config.supplier_priority;
        let mut best: Option<(Supplier, ChargePortInfo)> = None;

        for supplier in Supplier::ALL {
            let Some(charge) = self.table.get(supplier, port) else {
                continue;
            };

            if charge.voltage_mv == 0 || !accept(&charge) {
                continue;
            }

            let take = match best {
                None => true,
                Some((best_supplier, best_charge)) => {
                    let rank = priority.rank(supplier);
                    let best_rank = priority.rank(best_supplier);
                    rank < best_rank || (rank == best_rank && charge.power_uw() > best_charge.power_uw())
                }
            };

            if take {
                best = Some((supplier, charge));
            }
        }

        best.map(|(supplier, _)| supplier)
    }

    /// Supplier shown for a port
    ///
    /// The active supplier on the active port, otherwise the best supplier with current, otherwise
    /// the best supplier that reported a voltage.
    pub fn current_supplier(&self, port: PortId) -> Option<Supplier> {
        if self.active.port() == Some(port) {
            return self.active.supplier();
        }

        self.find_supplier(port, |charge| charge.current_ma > 0)
            .or_else(|| self.find_supplier(port, |_| true))
    }

    fn power_role(&self, port: PortId, supplier: Option<Supplier>) -> UsbPowerRole {
        if self.active.port() == Some(port) {
            UsbPowerRole::Sink
        } else if self.is_connected(port) && !self.is_sink(port) {
            UsbPowerRole::Source
        } else if supplier.is_some() {
            UsbPowerRole::SinkNotCharging
        } else {
            UsbPowerRole::Disconnected
        }
    }

    /// Power information of a port
    pub fn power_info(&self, port: PortId) -> Result<PowerInfo, PowerInfoError> {
        if port.index() >= self.config.layout.port_count() {
            return Err(PowerInfoError::InvalidPort);
        }

        let supplier = self.current_supplier(port);
        let role = self.power_role(port, supplier);
        let dualrole = self.table.dualrole(port) == DualRoleCapability::DualRole;

        let Some(supplier) = supplier.filter(|_| role != UsbPowerRole::Source) else {
            return Ok(self.idle_power_info(port, role, dualrole));
        };

        let charge = self.table.charge(supplier, port);
        let mut charge_type = UsbChargeType::from(supplier);
        // PD negotiation may still be running right after a change, systems without a battery
        // must already be stable by the time the host asks
        let settled_at = self.table.registration_time(port) + self.config.charge_detect_delay;
        if self.config.battery && Instant::now() < settled_at {
            charge_type = UsbChargeType::Unknown;
        }

        let mut meas = PowerMeasurement {
            voltage_max_mv: charge.voltage_mv,
            voltage_now_mv: if role == UsbPowerRole::SinkNotCharging {
                VSAFE5V_MV
            } else {
                self.board.vbus_voltage_mv(port)
            },
            current_max_ma: charge.current_ma,
            current_lim_ma: charge.current_ma,
        };

        if self.active.port() == Some(port)
            && let Some(ramp_max) = self.board.ramp_max_current_ma(port, supplier, charge.current_ma)
        {
            meas.current_max_ma = ramp_max;
            meas.current_lim_ma = self.active.current_ma.unwrap_or(charge.current_ma);
        }

        Ok(PowerInfo {
            role,
            charge_type,
            dualrole,
            meas,
            max_power_uw: u64::from(meas.current_max_ma) * u64::from(meas.voltage_max_mv),
        })
    }

    /// Power info of a port that isn't offering charge
    fn idle_power_info(&self, port: PortId, role: UsbPowerRole, dualrole: bool) -> PowerInfo {
        let meas = if self.config.layout.is_pd(port) {
            PowerMeasurement {
                voltage_max_mv: 0,
                voltage_now_mv: if role == UsbPowerRole::Source { VSAFE5V_MV } else { 0 },
                current_max_ma: self.source_limits.current_ma(port),
                current_lim_ma: 0,
            }
        } else {
            self.board.source_power_info(port)
        };

        PowerInfo {
            role,
            charge_type: UsbChargeType::None,
            dualrole,
            meas,
            max_power_uw: 0,
        }
    }

    /// Flags stored with power state log entries
    pub fn charge_flags(&self, port: PortId, info: &PowerInfo) -> ChargeFlags {
        ChargeFlags::from_power_info(info)
            .with_override(self.override_state.port() == Some(port))
            .with_delayed_override(self.override_state.pending_port() == Some(port))
    }
}
