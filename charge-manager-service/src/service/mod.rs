//! Charge manager service
use charge_manager_interface::{
    ActiveCharge, BatteryPresence, Board, CeilRequestor, ChargeLimit, ChargePortInfo, DualRoleCapability,
    OverrideError, OverrideRequest, PdPorts, PortId, PowerRole, Supplier, Unavailable,
};
use embassy_time::{Duration, Instant};

use crate::config::Config;
use crate::selection::SelectionPolicy;
use crate::source_current::SourceCurrentLimits;
use crate::state::{OverrideState, SafeMode};
use crate::table::ChargeTable;

pub mod context;
pub mod host;
mod refresh;
pub mod task;

use context::{Context, Event, Request, Response};

/// Type-C advertisements below this current rank with the lowest priority suppliers
const TYPEC_LOW_CURRENT_MA: u32 = 1500;

/// Charge manager
///
/// Owns the charge table and every state machine. All changes go through `&mut self` methods,
/// which only mark a refresh as pending. The refresh itself runs in [`Service::refresh_if_pending`]
/// so any number of changes between two passes result in a single port decision.
pub struct Service<'a, B: Board, P: PdPorts> {
    /// Charge manager context
    pub context: &'a Context,
    /// Board hooks
    board: B,
    /// PD ports
    pd: P,
    /// Config
    config: Config,
    /// Available charge, ceilings and port info
    table: ChargeTable,
    /// Override
    override_state: OverrideState,
    /// Safe mode
    safe_mode: SafeMode,
    /// Applied charge
    active: ActiveCharge,
    /// Set once the board accepted a port
    active_initialized: bool,
    /// Uncapped current of the active PD contract
    pd_current_uncapped_ma: Option<u32>,
    /// Rp of sourcing ports
    source_limits: SourceCurrentLimits,
    /// Time at which the host is told that charger detection settled
    detect_deadline: Option<Instant>,
    /// A refresh was requested
    refresh_pending: bool,
}

impl<'a, B: Board, P: PdPorts> Service<'a, B, P> {
    /// Create a new charge manager
    pub fn new(context: &'a Context, board: B, pd: P, config: Config) -> Self {
        Self {
            context,
            board,
            pd,
            table: ChargeTable::new(config.layout),
            override_state: OverrideState::Off,
            safe_mode: if config.safe_mode {
                SafeMode::Active
            } else {
                SafeMode::Left
            },
            active: ActiveCharge::default(),
            active_initialized: false,
            pd_current_uncapped_ma: None,
            source_limits: SourceCurrentLimits::new(config.source_current),
            detect_deadline: None,
            refresh_pending: false,
            config,
        }
    }

    /// Board hooks
    pub fn board(&self) -> &B {
        &self.board
    }

    /// Board hooks
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// PD ports
    pub fn pd(&self) -> &P {
        &self.pd
    }

    /// PD ports
    pub fn pd_mut(&mut self) -> &mut P {
        &mut self.pd
    }

    /// Config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Charge table
    pub fn table(&self) -> &ChargeTable {
        &self.table
    }

    /// Safe mode state
    pub fn safe_mode(&self) -> SafeMode {
        self.safe_mode
    }

    /// Override state, including a pending override
    pub fn override_state(&self) -> OverrideState {
        self.override_state
    }

    /// Returns true if a refresh will run on the next [`Service::refresh_if_pending`]
    pub fn is_refresh_pending(&self) -> bool {
        self.refresh_pending
    }

    fn schedule_refresh(&mut self) {
        // Don't change ports until every supplier has reported what is attached
        if self.table.is_seeded() {
            self.refresh_pending = true;
        }
    }

    fn is_sink(&self, port: PortId) -> bool {
        if self.config.layout.is_pd(port) {
            self.pd.power_role(port) == PowerRole::Sink
        } else {
            self.board.port_is_sink(port)
        }
    }

    fn is_connected(&self, port: PortId) -> bool {
        if self.config.layout.is_pd(port) {
            self.pd.is_connected(port)
        } else {
            self.board.port_is_connected(port)
        }
    }

    /// Dual-role capability can't be trusted in safe mode or when the image can't talk PD
    fn spoof_dualrole(&self) -> bool {
        !self.safe_mode.is_left() || self.board.is_ro_locked()
    }

    /// Without a stable battery the active port is the only thing keeping the system alive
    fn hold_active(&self) -> bool {
        self.config.battery
            && match self.board.battery_presence() {
                BatteryPresence::No => true,
                BatteryPresence::Yes => self.board.battery_is_cut_off(),
                BatteryPresence::NotSure => false,
            }
    }

    fn selection_policy(&self) -> SelectionPolicy<'_> {
        SelectionPolicy {
            priority: &self.config.supplier_priority,
            override_request: self.override_state.request(),
            accept_dual_role: self.config.drp_charging || self.spoof_dualrole(),
            active: self.active.source,
            hold_active: self.hold_active(),
        }
    }

    /// A new charger showed up on `port`, drop any override that doesn't target it
    fn clear_override_for(&mut self, port: PortId) {
        if !self.config.drp_charging && self.table.dualrole(port) != DualRoleCapability::Dedicated {
            return;
        }

        if self.override_state.cleared_by(port) {
            info!("Charger on port {}, clearing override {:?}", port.0, self.override_state);
            self.override_state = OverrideState::Off;
        }
    }

    /// Update the available charge of a supplier on a port, `None` if the supplier is gone
    pub fn update_charge(&mut self, supplier: Supplier, port: PortId, charge: Option<ChargePortInfo>) {
        if !self.config.layout.is_valid(port) {
            error!("update_charge: port {} invalid", port.0);
            return;
        }

        let charge = charge.unwrap_or(ChargePortInfo::ZERO);
        let previous = self.table.get(supplier, port);
        if previous == Some(charge) {
            return;
        }

        trace!(
            "Port {} supplier {}: {}mA {}mV",
            port.0,
            supplier.name(),
            charge.current_ma,
            charge.voltage_mv
        );

        if charge.current_ma > 0 && previous.is_some_and(|previous| previous.current_ma == 0) {
            self.clear_override_for(port);
        }

        let now = Instant::now();
        self.table.set(supplier, port, charge);
        self.table.register(port, now);

        if charge.current_ma > 0 {
            // A single debounce timer is shared by every port, a newer change restarts it
            self.detect_deadline = Some(now + self.config.charge_detect_delay);

            if self.override_state.promotes(port, now) && self.is_sink(port) {
                info!("Port {} swapped to sink, override active", port.0);
                self.override_state = OverrideState::Port(port);
            }
        }

        self.schedule_refresh();
    }

    /// Update the PD contract of a port
    pub fn update_pd_charge(&mut self, port: PortId, current_ma: u32, voltage_mv: u32) {
        self.update_charge(Supplier::Pd, port, Some(ChargePortInfo::new(current_ma, voltage_mv)));
    }

    /// Update the Type-C current advertisement of a port
    ///
    /// Debug accessory sources may not deliver what they advertise, so they are limited unless a
    /// charge ramp can find the real limit.
    pub fn update_typec_charge(&mut self, port: PortId, current_ma: u32, dts: bool, voltage_mv: u32) {
        let current_ma = if dts && !self.board.has_charge_ramp() {
            current_ma.min(self.config.dts_current_limit_ma)
        } else {
            current_ma
        };

        let supplier = if current_ma < TYPEC_LOW_CURRENT_MA {
            Supplier::TypeCUnder1A5
        } else if dts {
            Supplier::TypeCDts
        } else {
            Supplier::TypeC
        };

        self.update_charge(supplier, port, Some(ChargePortInfo::new(current_ma, voltage_mv)));
        // Only one Type-C supplier may offer charge on a port
        for other in Supplier::ALL.into_iter().filter(|other| other.is_typec() && *other != supplier) {
            self.update_charge(other, port, None);
        }
    }

    /// Update the dual-role capability of a PD port's partner
    pub fn update_dualrole(&mut self, port: PortId, capability: DualRoleCapability) {
        if !self.config.layout.is_pd(port) || !self.table.set_dualrole(port, capability) {
            return;
        }

        debug!("Port {} dual-role capability {:?}", port.0, capability);

        // Only a partner turning out to be dedicated matters, and only if it is offering charge
        if self.config.drp_charging || capability != DualRoleCapability::Dedicated || !self.table.has_current(port) {
            return;
        }

        self.clear_override_for(port);
        self.schedule_refresh();
    }

    /// Set or clear a requestor's current ceiling
    pub fn set_ceiling(&mut self, port: PortId, requestor: CeilRequestor, ceiling_ma: Option<u32>) {
        if !self.config.layout.is_valid(port) {
            error!("set_ceiling: port {} invalid", port.0);
            return;
        }

        if self.table.set_ceiling(port, requestor, ceiling_ma) && self.active.port() == Some(port) {
            self.schedule_refresh();
        }
    }

    /// Lower the PD ceiling of a port
    ///
    /// If the port is charging above the ceiling the new limit is applied right away instead of
    /// waiting for the next refresh.
    pub fn force_ceiling(&mut self, port: PortId, ceiling_ma: u32) {
        let above = self.active.current_ma.is_some_and(|current| ceiling_ma < current);
        if !(self.safe_mode.is_left() && self.active.port() == Some(port) && above) {
            self.set_ceiling(port, CeilRequestor::Pd, Some(ceiling_ma));
            return;
        }

        self.board.set_charge_limit(ChargeLimit {
            port: Some(port),
            supplier: Some(Supplier::Pd),
            current_ma: ceiling_ma,
            current_uncapped_ma: self.active.current_uncapped_ma.unwrap_or(0),
            voltage_mv: self.active.voltage_mv,
        });
        self.active.current_ma = Some(ceiling_ma);
        self.table.set_ceiling(port, CeilRequestor::Pd, Some(ceiling_ma));
        info!(
            "CL: p{} s{} i{} v{} (forced)",
            port.0,
            Supplier::Pd.name(),
            ceiling_ma,
            self.active.voltage_mv
        );
    }

    /// Override port selection
    ///
    /// A port that is currently sourcing to a dual-role partner is asked to swap first, it becomes
    /// the override port once it reports a charge before the power swap timeout.
    pub fn set_override(&mut self, request: OverrideRequest) -> Result<(), OverrideError> {
        info!("Charge override: {:?}", request);

        if self.override_state.pending_port().is_some() {
            return Err(OverrideError::Busy);
        }

        let state = match request {
            OverrideRequest::Off | OverrideRequest::DontCharge => OverrideState::from(request),
            OverrideRequest::Port(port) => {
                if !self.config.layout.is_valid(port) {
                    return Err(OverrideError::InvalidPort);
                }

                if self.is_sink(port) {
                    OverrideState::Port(port)
                } else if self.table.dualrole(port) == DualRoleCapability::DualRole {
                    // The current override stays in effect until the swap completes
                    self.override_state = OverrideState::Pending {
                        port,
                        deadline: Instant::now() + self.config.power_swap_timeout,
                        previous: self.override_state.request(),
                    };
                    self.pd.request_power_swap(port);
                    return Ok(());
                } else {
                    return Err(OverrideError::Unsupported);
                }
            }
        };

        if self.override_state != state {
            self.override_state = state;
            self.schedule_refresh();
        }

        Ok(())
    }

    /// Request to leave safe mode
    ///
    /// Takes effect after the configured delay, fuel gauges sometimes report a healthy charge they
    /// can't deliver right after boot.
    pub fn leave_safe_mode(&mut self) {
        if self.safe_mode != SafeMode::Active {
            return;
        }

        if self.config.leave_safe_mode_delay == Duration::from_ticks(0) {
            self.exit_safe_mode();
        } else {
            self.safe_mode = SafeMode::Leaving {
                at: Instant::now() + self.config.leave_safe_mode_delay,
            };
        }
    }

    fn exit_safe_mode(&mut self) {
        info!("Leaving safe mode");
        self.safe_mode = SafeMode::Left;
        self.schedule_refresh();
    }

    /// Limit every PD port, `None` removes the current ceiling and restores the maximum voltage
    pub fn set_external_power_limit(&mut self, current_ma: Option<u32>, voltage_mv: Option<u32>) {
        let voltage_mv = voltage_mv.unwrap_or(self.config.max_voltage_mv);
        let layout = self.config.layout;
        for port in layout.pd_ports() {
            self.set_ceiling(port, CeilRequestor::Host, current_ma);
            self.pd.set_external_voltage_limit(port, voltage_mv);
        }
    }

    /// Remove the external power limit
    pub fn clear_external_power_limit(&mut self) {
        self.set_external_power_limit(None, None);
    }

    /// Host limit on the dedicated charger
    ///
    /// Only allowed while the dedicated port is charging, the host has to apply it again every
    /// time a dedicated charger is plugged.
    pub fn override_dedicated_limit(&mut self, charge: ChargePortInfo) -> Result<(), Unavailable> {
        match self.config.layout.dedicated_port() {
            Some(port) if self.active.port() == Some(port) => {
                self.update_charge(Supplier::Dedicated, port, Some(charge));
                Ok(())
            }
            _ => Err(Unavailable),
        }
    }

    /// Push new Rp values to every PD port after the set of sourcing ports changed
    pub fn update_source_current(&mut self) {
        let layout = self.config.layout;
        self.source_limits.rebalance(&layout, self.context.source_current_bitmap());
        for port in layout.pd_ports() {
            let rp = self.source_limits.rp(port);
            debug!("Port {} source current {:?}", port.0, rp);
            self.pd.set_source_current_limit(port, rp);
        }
    }

    /// Process a queued request
    pub fn process_request(&mut self, request: Request) -> Option<Response> {
        match request {
            Request::UpdateCharge { supplier, port, charge } => self.update_charge(supplier, port, charge),
            Request::UpdateTypecCharge {
                port,
                current_ma,
                dts,
                voltage_mv,
            } => self.update_typec_charge(port, current_ma, dts, voltage_mv),
            Request::UpdateDualRole { port, capability } => self.update_dualrole(port, capability),
            Request::SetCeiling {
                port,
                requestor,
                ceiling_ma,
            } => self.set_ceiling(port, requestor, ceiling_ma),
            Request::ForceCeiling { port, ceiling_ma } => self.force_ceiling(port, ceiling_ma),
            Request::SetOverride(request) => return Some(Response::Override(self.set_override(request))),
            Request::OverrideDedicatedLimit(charge) => {
                return Some(Response::DedicatedLimit(self.override_dedicated_limit(charge)));
            }
            Request::SetExternalPowerLimit { current_ma, voltage_mv } => {
                self.set_external_power_limit(current_ma, voltage_mv)
            }
            Request::LeaveSafeMode => self.leave_safe_mode(),
        }

        None
    }

    /// Earliest time [`Service::handle_timeouts`] has something to do
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.override_state.deadline(),
            self.detect_deadline,
            self.safe_mode.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fire every timer due at `now`
    pub fn handle_timeouts(&mut self, now: Instant) {
        if let OverrideState::Pending { port, deadline, .. } = self.override_state
            && now >= deadline
        {
            info!("Port {} power swap timed out, dropping override", port.0);
            self.override_state = self.override_state.abandoned();
            self.context.publish(Event::HostPowerChange);
        }

        if self.detect_deadline.is_some_and(|deadline| now >= deadline) {
            self.detect_deadline = None;
            self.context.publish(Event::HostPowerChange);
        }

        if self.safe_mode.deadline().is_some_and(|at| now >= at) {
            self.exit_safe_mode();
        }
    }

    /// Run a refresh pass if one was requested
    pub fn refresh_if_pending(&mut self) {
        if self.refresh_pending {
            self.refresh();
        }
    }
}
