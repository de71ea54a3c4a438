//! Charge manager configuration
use charge_manager_interface::{PortId, SupplierPriority, TypecRp};
use embassy_time::Duration;

/// Maximum number of charge ports, PD and dedicated combined
pub const MAX_CHARGE_PORTS: usize = 8;

/// Port numbering of a board
///
/// PD ports come first, dedicated ports follow at `pd_port_max_count`. SKUs that populate fewer PD
/// ports than the maximum leave a hole between `pd_port_count` and `pd_port_max_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortLayout {
    /// PD ports the board was designed for
    pub pd_port_max_count: u8,
    /// PD ports populated on this SKU
    pub pd_port_count: u8,
    /// Dedicated charger ports
    pub dedicated_port_count: u8,
}

impl PortLayout {
    /// Create a new layout
    pub const fn new(pd_port_max_count: u8, pd_port_count: u8, dedicated_port_count: u8) -> Self {
        Self {
            pd_port_max_count,
            pd_port_count,
            dedicated_port_count,
        }
    }

    /// Number of port indices, holes included
    pub fn port_count(&self) -> usize {
        let count = usize::from(self.pd_port_max_count) + usize::from(self.dedicated_port_count);
        count.min(MAX_CHARGE_PORTS)
    }

    /// Returns true if the port exists on this SKU
    pub fn is_valid(&self, port: PortId) -> bool {
        port.index() < self.port_count() && !(self.pd_port_count..self.pd_port_max_count).contains(&port.0)
    }

    /// Returns true if the port is a populated PD port
    pub fn is_pd(&self, port: PortId) -> bool {
        port.0 < self.pd_port_count && port.index() < self.port_count()
    }

    /// First dedicated port, if the board has one
    pub fn dedicated_port(&self) -> Option<PortId> {
        let port = PortId(self.pd_port_max_count);
        (self.dedicated_port_count > 0 && port.index() < self.port_count()).then_some(port)
    }

    /// Every valid port in ascending order
    pub fn ports(&self) -> impl Iterator<Item = PortId> + '_ {
        (0..self.port_count())
            .filter_map(|index| u8::try_from(index).ok())
            .map(PortId)
            .filter(|port| self.is_valid(*port))
    }

    /// Every populated PD port in ascending order
    pub fn pd_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.ports().filter(|port| self.is_pd(*port))
    }
}

impl Default for PortLayout {
    fn default() -> Self {
        Self::new(2, 2, 0)
    }
}

/// Rp policy for ports that are sourcing power
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceCurrentConfig {
    /// Rp advertised by the port allowed to source the maximum current
    pub max_single_source: TypecRp,
    /// Rp advertised by every other sourcing port
    pub default_pullup: TypecRp,
    /// Total budget shared by every sourcing port, `None` if only one port may source the maximum
    pub max_total_source_current_ma: Option<u32>,
}

impl Default for SourceCurrentConfig {
    fn default() -> Self {
        Self {
            max_single_source: TypecRp::Rp3A0,
            default_pullup: TypecRp::Rp1A5,
            max_total_source_current_ma: None,
        }
    }
}

/// Charge manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Port numbering
    pub layout: PortLayout,
    /// Supplier ranking
    pub supplier_priority: SupplierPriority,
    /// Allow charging from dual-role partners without an override
    pub drp_charging: bool,
    /// Start in safe mode
    ///
    /// While in safe mode every charger is considered dedicated, ceilings are ignored and the
    /// manager never switches to "no port".
    pub safe_mode: bool,
    /// Delay between the request to leave safe mode and the actual exit
    pub leave_safe_mode_delay: Duration,
    /// Input current limit applied while no supplier is selected
    pub default_current_limit_ma: u32,
    /// Time after a charge change during which the host sees an unknown charger type
    pub charge_detect_delay: Duration,
    /// Time to wait for a power role swap requested by an override
    pub power_swap_timeout: Duration,
    /// The board has a battery
    pub battery: bool,
    /// Current limit of Type-C debug accessory sources when there's no charge ramp
    pub dts_current_limit_ma: u32,
    /// Voltage limit requested from PD partners when no external limit is set
    pub max_voltage_mv: u32,
    /// Source-out current policy
    pub source_current: SourceCurrentConfig,
}

impl Config {
    /// tSrcRecoverMax + tSrcTurnOn + tSafe0V + a margin for the swap itself
    pub const DEFAULT_POWER_SWAP_TIMEOUT: Duration = Duration::from_millis(1000 + 275 + 650 + 500);
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: PortLayout::default(),
            supplier_priority: SupplierPriority::default(),
            drp_charging: false,
            safe_mode: true,
            leave_safe_mode_delay: Duration::from_millis(500),
            default_current_limit_ma: 512,
            charge_detect_delay: Duration::from_secs(2),
            power_swap_timeout: Self::DEFAULT_POWER_SWAP_TIMEOUT,
            battery: true,
            dts_current_limit_ma: 500,
            max_voltage_mv: 20000,
            source_current: SourceCurrentConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_holes() {
        // Four PD ports designed, two populated, one dedicated port at 4
        let layout = PortLayout::new(4, 2, 1);
        assert_eq!(layout.port_count(), 5);
        assert!(layout.is_valid(PortId(0)));
        assert!(layout.is_valid(PortId(1)));
        assert!(!layout.is_valid(PortId(2)));
        assert!(!layout.is_valid(PortId(3)));
        assert!(layout.is_valid(PortId(4)));
        assert!(!layout.is_valid(PortId(5)));

        assert!(layout.is_pd(PortId(1)));
        assert!(!layout.is_pd(PortId(4)));
        assert_eq!(layout.dedicated_port(), Some(PortId(4)));

        let mut ports = layout.ports();
        assert_eq!(ports.next(), Some(PortId(0)));
        assert_eq!(ports.next(), Some(PortId(1)));
        assert_eq!(ports.next(), Some(PortId(4)));
        assert_eq!(ports.next(), None);
        assert_eq!(layout.pd_ports().count(), 2);
    }

    #[test]
    fn test_layout_clamped() {
        let layout = PortLayout::new(8, 8, 2);
        assert_eq!(layout.port_count(), MAX_CHARGE_PORTS);
        assert_eq!(layout.dedicated_port(), None);
        assert!(!layout.is_valid(PortId(8)));
    }

    #[test]
    fn test_default_power_swap_timeout() {
        assert_eq!(Config::default().power_swap_timeout, Duration::from_millis(2425));
    }
}
