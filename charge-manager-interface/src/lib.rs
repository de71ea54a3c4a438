//! Types shared between the charge manager and the tasks that feed it or consume its decisions
#![no_std]

pub mod board;
pub mod charge;
pub mod host;
pub mod port;
pub mod supplier;

pub use board::{BatteryPresence, Board, PdPorts};
pub use charge::{ActiveCharge, ChargeLimit, ChargeSource, OverrideError, OverrideRequest, Rejected, Unavailable};
pub use port::{CEIL_REQUESTOR_COUNT, CeilRequestor, ChargePortInfo, DualRoleCapability, PortId, PowerRole, TypecRp};
pub use supplier::{InvalidSupplier, SUPPLIER_COUNT, Supplier, SupplierPriority};
