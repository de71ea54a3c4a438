//! Charge table: available charge per (supplier, port), ceilings, registration times and
//! partner dual-role capability
use charge_manager_interface::{
    CEIL_REQUESTOR_COUNT, CeilRequestor, ChargePortInfo, DualRoleCapability, PortId, SUPPLIER_COUNT, Supplier,
};
use embassy_time::Instant;

use crate::config::{MAX_CHARGE_PORTS, PortLayout};

/// Charge table
///
/// A cell that has never been reported holds `None`. Cells on invalid ports are never written.
#[derive(Debug, Clone)]
pub struct ChargeTable {
    layout: PortLayout,
    available: [[Option<ChargePortInfo>; MAX_CHARGE_PORTS]; SUPPLIER_COUNT],
    ceiling: [[Option<u32>; CEIL_REQUESTOR_COUNT]; MAX_CHARGE_PORTS],
    registration_time: [Instant; MAX_CHARGE_PORTS],
    dualrole: [DualRoleCapability; MAX_CHARGE_PORTS],
    seeded: bool,
}

impl ChargeTable {
    /// Create an empty table, non-PD ports are dedicated
    pub fn new(layout: PortLayout) -> Self {
        let mut dualrole = [DualRoleCapability::Unknown; MAX_CHARGE_PORTS];
        for port in layout.ports().filter(|port| !layout.is_pd(*port)) {
            if let Some(capability) = dualrole.get_mut(port.index()) {
                *capability = DualRoleCapability::Dedicated;
            }
        }

        Self {
            layout,
            available: [[None; MAX_CHARGE_PORTS]; SUPPLIER_COUNT],
            ceiling: [[None; CEIL_REQUESTOR_COUNT]; MAX_CHARGE_PORTS],
            registration_time: [Instant::from_ticks(0); MAX_CHARGE_PORTS],
            dualrole,
            seeded: false,
        }
    }

    /// Port layout
    pub fn layout(&self) -> &PortLayout {
        &self.layout
    }

    /// Reported charge, `None` if never reported or the port is invalid
    pub fn get(&self, supplier: Supplier, port: PortId) -> Option<ChargePortInfo> {
        if !self.layout.is_valid(port) {
            return None;
        }

        self.available
            .get(supplier.index())
            .and_then(|row| row.get(port.index()))
            .copied()
            .flatten()
    }

    /// Reported charge, with never-reported cells read as zero
    pub fn charge(&self, supplier: Supplier, port: PortId) -> ChargePortInfo {
        self.get(supplier, port).unwrap_or(ChargePortInfo::ZERO)
    }

    /// Store a charge, returns false if the port is invalid
    pub fn set(&mut self, supplier: Supplier, port: PortId, charge: ChargePortInfo) -> bool {
        if !self.layout.is_valid(port) {
            return false;
        }

        match self
            .available
            .get_mut(supplier.index())
            .and_then(|row| row.get_mut(port.index()))
        {
            Some(cell) => {
                *cell = Some(charge);
                true
            }
            None => false,
        }
    }

    /// Zero every supplier on the port
    pub fn clear_port(&mut self, port: PortId) {
        for supplier in Supplier::ALL {
            self.set(supplier, port, ChargePortInfo::ZERO);
        }
    }

    /// Returns true if any supplier on the port offers current
    pub fn has_current(&self, port: PortId) -> bool {
        Supplier::ALL
            .iter()
            .any(|supplier| self.charge(*supplier, port).current_ma > 0)
    }

    /// Returns true once every valid (supplier, port) cell has been reported
    ///
    /// The result is cached once true, zeroing a cell later doesn't unseed the table.
    pub fn is_seeded(&mut self) -> bool {
        if !self.seeded {
            self.seeded = self
                .layout
                .ports()
                .all(|port| Supplier::ALL.iter().all(|supplier| self.get(*supplier, port).is_some()));
        }

        self.seeded
    }

    /// Effective ceiling of a port, the minimum across requestors
    pub fn ceiling(&self, port: PortId) -> Option<u32> {
        if !self.layout.is_valid(port) {
            return None;
        }

        self.ceiling
            .get(port.index())
            .and_then(|ceilings| ceilings.iter().flatten().min().copied())
    }

    /// Ceiling of a single requestor
    pub fn requestor_ceiling(&self, port: PortId, requestor: CeilRequestor) -> Option<u32> {
        self.ceiling
            .get(port.index())
            .and_then(|ceilings| ceilings.get(requestor.index()))
            .copied()
            .flatten()
    }

    /// Store a requestor's ceiling, returns true if it changed
    pub fn set_ceiling(&mut self, port: PortId, requestor: CeilRequestor, ceiling: Option<u32>) -> bool {
        if !self.layout.is_valid(port) {
            return false;
        }

        match self
            .ceiling
            .get_mut(port.index())
            .and_then(|ceilings| ceilings.get_mut(requestor.index()))
        {
            Some(slot) if *slot != ceiling => {
                *slot = ceiling;
                true
            }
            _ => false,
        }
    }

    /// Time of the last charge change on the port
    pub fn registration_time(&self, port: PortId) -> Instant {
        self.registration_time
            .get(port.index())
            .copied()
            .unwrap_or(Instant::from_ticks(0))
    }

    /// Record a charge change on the port
    pub fn register(&mut self, port: PortId, now: Instant) {
        if let Some(time) = self.registration_time.get_mut(port.index()) {
            *time = now;
        }
    }

    /// Dual-role capability of the partner
    pub fn dualrole(&self, port: PortId) -> DualRoleCapability {
        self.dualrole
            .get(port.index())
            .copied()
            .unwrap_or(DualRoleCapability::Unknown)
    }

    /// Store the partner's dual-role capability, returns true if it changed
    pub fn set_dualrole(&mut self, port: PortId, capability: DualRoleCapability) -> bool {
        match self.dualrole.get_mut(port.index()) {
            Some(slot) if *slot != capability => {
                *slot = capability;
                true
            }
            _ => false,
        }
    }

    /// Every reported charge with current or voltage on valid ports
    pub fn offers(&self) -> impl Iterator<Item = (PortId, Supplier, ChargePortInfo)> + '_ {
        self.layout.ports().flat_map(move |port| {
            Supplier::ALL.into_iter().filter_map(move |supplier| {
                self.get(supplier, port)
                    .filter(|charge| *charge != ChargePortInfo::ZERO)
                    .map(|charge| (port, supplier, charge))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(table: &mut ChargeTable) {
        let layout = *table.layout();
        for port in layout.ports() {
            for supplier in Supplier::ALL {
                table.set(supplier, port, ChargePortInfo::ZERO);
            }
        }
    }

    #[test]
    fn test_invalid_port_ignored() {
        let mut table = ChargeTable::new(PortLayout::new(4, 2, 1));
        assert!(!table.set(Supplier::Pd, PortId(2), ChargePortInfo::new(3000, 5000)));
        assert_eq!(table.get(Supplier::Pd, PortId(2)), None);
        assert!(!table.set(Supplier::Pd, PortId(9), ChargePortInfo::new(3000, 5000)));
        assert!(!table.set_ceiling(PortId(3), CeilRequestor::Host, Some(500)));
        assert_eq!(table.ceiling(PortId(3)), None);
    }

    #[test]
    fn test_seeding() {
        let mut table = ChargeTable::new(PortLayout::new(4, 2, 1));
        assert!(!table.is_seeded());

        seed(&mut table);
        assert!(table.is_seeded());
        table.clear_port(PortId(0));
        assert!(table.is_seeded());

        // Everything but the dedicated port's VBUS supplier
        let mut partial = ChargeTable::new(PortLayout::new(4, 2, 1));
        for port in [PortId(0), PortId(1), PortId(4)] {
            for supplier in Supplier::ALL {
                if port == PortId(4) && supplier == Supplier::Vbus {
                    continue;
                }
                partial.set(supplier, port, ChargePortInfo::ZERO);
            }
        }
        assert!(!partial.is_seeded());
        partial.set(Supplier::Vbus, PortId(4), ChargePortInfo::ZERO);
        assert!(partial.is_seeded());
    }

    #[test]
    fn test_ceiling_minimum() {
        let mut table = ChargeTable::new(PortLayout::default());
        assert_eq!(table.ceiling(PortId(0)), None);

        assert!(table.set_ceiling(PortId(0), CeilRequestor::Host, Some(2000)));
        assert_eq!(table.ceiling(PortId(0)), Some(2000));
        assert!(table.set_ceiling(PortId(0), CeilRequestor::Pd, Some(500)));
        assert_eq!(table.ceiling(PortId(0)), Some(500));
        assert!(!table.set_ceiling(PortId(0), CeilRequestor::Pd, Some(500)));

        assert!(table.set_ceiling(PortId(0), CeilRequestor::Pd, None));
        assert_eq!(table.ceiling(PortId(0)), Some(2000));
        assert_eq!(table.requestor_ceiling(PortId(0), CeilRequestor::Host), Some(2000));
        assert_eq!(table.ceiling(PortId(1)), None);
    }

    #[test]
    fn test_dedicated_ports() {
        let table = ChargeTable::new(PortLayout::new(2, 2, 1));
        assert_eq!(table.dualrole(PortId(0)), DualRoleCapability::Unknown);
        assert_eq!(table.dualrole(PortId(2)), DualRoleCapability::Dedicated);
    }

    #[test]
    fn test_clear_port() {
        let mut table = ChargeTable::new(PortLayout::default());
        seed(&mut table);
        table.set(Supplier::Pd, PortId(1), ChargePortInfo::new(3000, 20000));
        table.set(Supplier::TypeC, PortId(1), ChargePortInfo::new(3000, 5000));
        assert!(table.has_current(PortId(1)));
        assert_eq!(table.offers().count(), 2);

        table.clear_port(PortId(1));
        assert!(!table.has_current(PortId(1)));
        assert_eq!(table.get(Supplier::Pd, PortId(1)), Some(ChargePortInfo::ZERO));
        assert_eq!(table.offers().count(), 0);
    }
}
