#![allow(dead_code)]
use charge_manager_interface::{ChargePortInfo, DualRoleCapability, PortId, Supplier};
use charge_manager_service::service::Service;
use charge_manager_service::service::context::Context;
use charge_manager_service::{Config, PortLayout};

pub mod mock;

use mock::{MockBoard, MockPdPorts};

pub type ServiceType<'a> = Service<'a, MockBoard, MockPdPorts>;

pub const PD_PORT0: PortId = PortId(0);
pub const PD_PORT1: PortId = PortId(1);
pub const DEDICATED_PORT: PortId = PortId(2);

pub const PD_20V_3A: ChargePortInfo = ChargePortInfo::new(3000, 20000);
pub const PD_15V_3A: ChargePortInfo = ChargePortInfo::new(3000, 15000);
pub const PD_5V_1A5: ChargePortInfo = ChargePortInfo::new(1500, 5000);
pub const BARREL_19V: ChargePortInfo = ChargePortInfo::new(3420, 19000);

/// Only the first call installs the logger
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// Two PD ports and a dedicated port, safe mode already left
pub fn config() -> Config {
    Config {
        layout: PortLayout::new(2, 2, 1),
        safe_mode: false,
        ..Default::default()
    }
}

/// Report every cell nobody has reported yet as empty
pub fn seed(service: &mut ServiceType<'_>) {
    let layout = service.config().layout;
    for port in layout.ports() {
        for supplier in Supplier::ALL {
            if service.table().get(supplier, port).is_none() {
                service.update_charge(supplier, port, None);
            }
        }
    }
    service.refresh_if_pending();
}

/// Service with a seeded table and both PD partners known to be dedicated chargers
///
/// Calls made during setup are discarded.
pub fn seeded_service(context: &Context, config: Config) -> ServiceType<'_> {
    seeded_service_with(context, config, MockBoard::default())
}

pub fn seeded_service_with(context: &Context, config: Config, board: MockBoard) -> ServiceType<'_> {
    init_logging();
    let mut service = Service::new(context, board, MockPdPorts::default(), config);
    let layout = config.layout;
    for port in layout.pd_ports() {
        service.update_dualrole(port, DualRoleCapability::Dedicated);
    }
    seed(&mut service);
    clear_calls(&mut service);
    service
}

pub fn clear_calls(service: &mut ServiceType<'_>) {
    service.board_mut().take_calls();
    service.pd_mut().take_calls();
}

/// Report a charge and run the resulting refresh
pub fn plug(service: &mut ServiceType<'_>, supplier: Supplier, port: PortId, charge: ChargePortInfo) {
    service.update_charge(supplier, port, Some(charge));
    service.refresh_if_pending();
}

/// Remove a charge and run the resulting refresh
pub fn unplug(service: &mut ServiceType<'_>, supplier: Supplier, port: PortId) {
    service.update_charge(supplier, port, None);
    service.refresh_if_pending();
}
