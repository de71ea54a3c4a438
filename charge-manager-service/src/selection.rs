//! Charge port selection
use charge_manager_interface::{ChargeSource, DualRoleCapability, OverrideRequest, Supplier, SupplierPriority};

use crate::table::ChargeTable;

/// Inputs to [`select_best`] besides the charge table
#[derive(Debug, Clone, Copy)]
pub struct SelectionPolicy<'a> {
    /// Supplier ranking
    pub priority: &'a SupplierPriority,
    /// Override in effect
    pub override_request: OverrideRequest,
    /// Consider chargers on dual-role ports
    ///
    /// Set when dual-role charging is allowed, while in safe mode, or when the partner's
    /// capability can't be learned.
    pub accept_dual_role: bool,
    /// Currently active source
    pub active: Option<ChargeSource>,
    /// Keep the active source no matter what is available
    ///
    /// Set when there's no battery or the battery is cut off, switching ports could brown out.
    pub hold_active: bool,
}

/// Pick the best charge source
///
/// Selection order:
/// 1. The override port, as long as it has any charge
/// 2. Lower supplier rank
/// 3. Higher power
/// 4. The active port
pub fn select_best(table: &ChargeTable, policy: &SelectionPolicy<'_>) -> Option<ChargeSource> {
    if policy.override_request == OverrideRequest::DontCharge {
        return None;
    }

    let override_port = policy.override_request.port();
    let active_port = policy.active.map(|source| source.port);
    let mut best: Option<(ChargeSource, u64)> = None;

    for supplier in Supplier::ALL {
        for port in table.layout().ports() {
            let charge = table.charge(supplier, port);
            if !charge.has_charge() {
                continue;
            }

            let best_port = best.map(|(source, _)| source.port);
            if override_port.is_some() && override_port == best_port && override_port != Some(port) {
                continue;
            }

            if !policy.accept_dual_role
                && table.dualrole(port) != DualRoleCapability::Dedicated
                && override_port != Some(port)
            {
                continue;
            }

            let power = charge.power_uw();
            let take = match best {
                None => true,
                Some((source, best_power)) => {
                    let rank = policy.priority.rank(supplier);
                    let best_rank = policy.priority.rank(source.supplier);
                    rank < best_rank
                        || (override_port == Some(port) && best_port != override_port)
                        || (rank == best_rank
                            && (power > best_power || (power == best_power && active_port == Some(port))))
                }
            };

            if take {
                best = Some((ChargeSource::new(port, supplier), power));
            }
        }
    }

    let selected = best.map(|(source, _)| source);
    match policy.active {
        Some(active) if policy.hold_active && Some(active.port) != selected.map(|source| source.port) => Some(active),
        _ => selected,
    }
}
