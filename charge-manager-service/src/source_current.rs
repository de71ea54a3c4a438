//! Rp allocation for ports sourcing power to their partner
//!
//! Without a total budget a port gets the maximum source current only while it is the sole source.
//! With a budget a port keeps the maximum until it stops sourcing.
use charge_manager_interface::{PortId, TypecRp};
use portable_atomic::{AtomicU32, Ordering};

use crate::config::{MAX_CHARGE_PORTS, PortLayout, SourceCurrentConfig};

/// Bitmap of sourcing ports, updated from any context
pub struct SourceCurrentAllocator {
    bitmap: AtomicU32,
}

impl Default for SourceCurrentAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceCurrentAllocator {
    /// Create an allocator with no sourcing port
    pub const fn new() -> Self {
        Self {
            bitmap: AtomicU32::new(0),
        }
    }

    /// Mark a port as sourcing or not, returns true if the bitmap changed
    pub fn set_source(&self, port: PortId, enable: bool) -> bool {
        let Some(bit) = 1u32.checked_shl(u32::from(port.0)) else {
            return false;
        };

        let previous = if enable {
            self.bitmap.fetch_or(bit, Ordering::AcqRel)
        } else {
            self.bitmap.fetch_and(!bit, Ordering::AcqRel)
        };

        (previous & bit != 0) != enable
    }

    /// Current bitmap
    pub fn bitmap(&self) -> u32 {
        self.bitmap.load(Ordering::Acquire)
    }
}

/// Rp currently assigned to each PD port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceCurrentLimits {
    config: SourceCurrentConfig,
    rp: [TypecRp; MAX_CHARGE_PORTS],
}

impl SourceCurrentLimits {
    /// Every port starts at the default pull-up
    pub fn new(config: SourceCurrentConfig) -> Self {
        Self {
            config,
            rp: [config.default_pullup; MAX_CHARGE_PORTS],
        }
    }

    /// Rp assigned to a port
    pub fn rp(&self, port: PortId) -> TypecRp {
        self.rp.get(port.index()).copied().unwrap_or(self.config.default_pullup)
    }

    /// Current advertised by a port in mA
    pub fn current_ma(&self, port: PortId) -> u32 {
        self.rp(port).current_ma()
    }

    fn is_active(bitmap: u32, port: PortId) -> bool {
        1u32.checked_shl(u32::from(port.0))
            .is_some_and(|bit| bitmap & bit != 0)
    }

    fn can_supply_max(&self, layout: &PortLayout, bitmap: u32, port: PortId) -> bool {
        if !Self::is_active(bitmap, port) {
            return false;
        }

        if self.config.max_total_source_current_ma.is_some() {
            layout
                .pd_ports()
                .filter(|other| *other != port)
                .all(|other| self.rp(other) != self.config.max_single_source)
        } else {
            layout
                .pd_ports()
                .filter(|other| *other != port)
                .all(|other| !Self::is_active(bitmap, other))
        }
    }

    /// Reassign Rp to every PD port after the sourcing bitmap changed
    ///
    /// Ports are visited in order so with a total budget the first port that finds the maximum
    /// free takes it.
    pub fn rebalance(&mut self, layout: &PortLayout, bitmap: u32) {
        for port in layout.pd_ports() {
            let rp = if self.can_supply_max(layout, bitmap, port) {
                self.config.max_single_source
            } else {
                self.config.default_pullup
            };

            if let Some(slot) = self.rp.get_mut(port.index()) {
                *slot = rp;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap() {
        let allocator = SourceCurrentAllocator::new();
        assert!(allocator.set_source(PortId(1), true));
        assert!(!allocator.set_source(PortId(1), true));
        assert_eq!(allocator.bitmap(), 0b10);
        assert!(allocator.set_source(PortId(0), true));
        assert!(allocator.set_source(PortId(1), false));
        assert!(!allocator.set_source(PortId(1), false));
        assert_eq!(allocator.bitmap(), 0b01);
        assert!(!allocator.set_source(PortId(40), true));
    }

    #[test]
    fn test_single_source_policy() {
        let layout = PortLayout::new(3, 3, 0);
        let mut limits = SourceCurrentLimits::new(SourceCurrentConfig::default());

        limits.rebalance(&layout, 0b001);
        assert_eq!(limits.rp(PortId(0)), TypecRp::Rp3A0);
        assert_eq!(limits.rp(PortId(1)), TypecRp::Rp1A5);

        // Two sources, nobody gets the maximum
        limits.rebalance(&layout, 0b011);
        assert_eq!(limits.rp(PortId(0)), TypecRp::Rp1A5);
        assert_eq!(limits.rp(PortId(1)), TypecRp::Rp1A5);

        limits.rebalance(&layout, 0b010);
        assert_eq!(limits.rp(PortId(1)), TypecRp::Rp3A0);
        assert_eq!(limits.current_ma(PortId(1)), 3000);
    }

    #[test]
    fn test_total_budget_policy() {
        let layout = PortLayout::new(3, 3, 0);
        let mut limits = SourceCurrentLimits::new(SourceCurrentConfig {
            max_total_source_current_ma: Some(6000),
            ..Default::default()
        });

        limits.rebalance(&layout, 0b001);
        assert_eq!(limits.rp(PortId(0)), TypecRp::Rp3A0);

        // Port 0 keeps the maximum when another port starts sourcing
        limits.rebalance(&layout, 0b101);
        assert_eq!(limits.rp(PortId(0)), TypecRp::Rp3A0);
        assert_eq!(limits.rp(PortId(2)), TypecRp::Rp1A5);

        // Port 0 released, port 2 inherits the maximum
        limits.rebalance(&layout, 0b100);
        assert_eq!(limits.rp(PortId(0)), TypecRp::Rp1A5);
        assert_eq!(limits.rp(PortId(2)), TypecRp::Rp3A0);
    }
}
