//! Refresh pass: pick a port, get the board to accept it and apply the new limit
use charge_manager_interface::{
    ActiveCharge, Board, ChargeLimit, ChargeSource, DualRoleCapability, PdPorts, PortId, Rejected, Supplier,
};
use heapless::Vec;

use super::Service;
use super::context::Event;
use crate::config::MAX_CHARGE_PORTS;
use crate::selection::select_best;
use crate::table::ChargeTable;

/// The board must always accept "no port", anything else leaves charging in an unknown state
#[allow(clippy::panic)]
fn none_rejected() -> ! {
    panic!("Board rejected charge port none");
}

impl<B: Board, P: PdPorts> Service<'_, B, P> {
    /// Select, apply and announce the best charge source
    pub fn refresh(&mut self) {
        self.refresh_pending = false;

        // Rejected ports are zeroed in a scratch copy so they can't be picked again in this pass
        let mut scratch = self.table.clone();
        let mut rejected = Vec::<PortId, MAX_CHARGE_PORTS>::new();
        let selected = self.find_accepted(&mut scratch, &mut rejected);

        for port in rejected {
            self.table.clear_port(port);
        }

        if let Some(selected) = selected {
            self.apply(selected);
        }
    }

    /// Offer candidates to the board until one is accepted
    ///
    /// Returns `None` if nothing should change. Every rejection removes a port from the scratch
    /// table, so this ends at "no port" at the latest.
    fn find_accepted(
        &mut self,
        scratch: &mut ChargeTable,
        rejected: &mut Vec<PortId, MAX_CHARGE_PORTS>,
    ) -> Option<Option<ChargeSource>> {
        loop {
            // A held active port survives the scratch table, it still can't be offered twice
            let candidate = select_best(scratch, &self.selection_policy())
                .filter(|candidate| !rejected.contains(&candidate.port));

            if !self.safe_mode.is_left() && candidate.is_none() {
                debug!("Safe mode, keeping the current port");
                return None;
            }

            if self.active_initialized && candidate == self.active.source {
                return Some(candidate);
            }

            let port = candidate.map(|candidate| candidate.port);
            match self.board.set_active_charge_port(port) {
                Ok(()) => {
                    self.board.check_extpower();
                    return Some(candidate);
                }
                Err(Rejected) => {
                    let Some(port) = port else {
                        none_rejected();
                    };

                    warn!("Board rejected port {}", port.0);
                    scratch.clear_port(port);
                    // Ports are unique and bounded by the table width
                    let _ = rejected.push(port);
                }
            }
        }
    }

    fn apply(&mut self, selected: Option<ChargeSource>) {
        self.active_initialized = true;

        let new_port = selected.map(|source| source.port);
        if let Some(port) = self.override_state.port()
            && Some(port) != new_port
        {
            // The override port has no charge left or was rejected
            info!("Override port {} not selected, clearing override", port.0);
            self.override_state = self.override_state.without_port();
        }

        let (current_ma, current_uncapped_ma, voltage_mv) = match selected {
            None => (
                self.config.default_current_limit_ma,
                self.config.default_current_limit_ma,
                0,
            ),
            Some(source) => {
                let charge = self.table.charge(source.supplier, source.port);
                let uncapped = self
                    .board
                    .ramp_max_current_ma(source.port, source.supplier, charge.current_ma)
                    .unwrap_or(charge.current_ma);
                let capped = match self.table.ceiling(source.port) {
                    Some(ceiling) if self.safe_mode.is_left() => ceiling.min(uncapped),
                    _ => uncapped,
                };
                (capped, uncapped, charge.voltage_mv)
            }
        };

        self.pd_current_uncapped_ma =
            (selected.map(|source| source.supplier) == Some(Supplier::Pd)).then_some(current_uncapped_ma);

        let previous = self.active;
        let power_changed = new_port != previous.port()
            || Some(current_ma) != previous.current_ma
            || selected.map(|source| source.supplier) != previous.supplier();

        if power_changed {
            self.board.set_charge_limit(ChargeLimit {
                port: new_port,
                supplier: selected.map(|source| source.supplier),
                current_ma,
                current_uncapped_ma,
                voltage_mv,
            });
            info!(
                "CL: p{:?} s{:?} i{} v{}",
                new_port.map(|port| port.0),
                selected.map(|source| source.supplier.name()),
                current_ma,
                voltage_mv
            );
            self.board.check_extpower();
        }

        // Ceilings alone don't need a new power request
        let updated_new_port = new_port.filter(|_| {
            new_port != previous.port()
                || Some(current_uncapped_ma) != previous.current_uncapped_ma
                || voltage_mv != previous.voltage_mv
        });

        let updated_old_port = previous.port().filter(|old| Some(*old) != new_port);
        if let Some(old) = updated_old_port {
            self.switch_to_source(old);
        }

        self.active = ActiveCharge {
            source: selected,
            current_ma: Some(current_ma),
            current_uncapped_ma: Some(current_uncapped_ma),
            voltage_mv,
        };

        // Power requests go out only once the new state is visible
        for port in [updated_new_port, updated_old_port].into_iter().flatten() {
            if self.config.layout.is_pd(port) {
                self.pd.set_new_power_request(port);
            }
        }

        if power_changed {
            self.context.publish(Event::PowerSupplyChanged(self.active));
            self.context.publish(Event::HostPowerChange);
        }
    }

    /// We stopped charging from a PD port, let a dual-role partner take power from us instead
    fn switch_to_source(&mut self, port: PortId) {
        if self.config.layout.is_pd(port)
            && self.table.dualrole(port) == DualRoleCapability::DualRole
            && self.is_sink(port)
        {
            self.pd.request_power_swap(port);
        }
    }
}
