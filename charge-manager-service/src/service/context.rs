//! Context shared between producers, the host and the charge manager task
use charge_manager_interface::{
    ActiveCharge, CeilRequestor, ChargePortInfo, DualRoleCapability, OverrideError, OverrideRequest, PortId, Supplier,
    Unavailable,
};
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::pubsub::{self, PubSubChannel, Subscriber};
use embassy_sync::signal::Signal;

use crate::GlobalRawMutex;
use crate::source_current::SourceCurrentAllocator;

/// Number of requests that can be queued before producers wait
pub const REQUEST_QUEUE_SIZE: usize = 16;
/// Number of events a subscriber can lag behind
pub const EVENT_QUEUE_SIZE: usize = 4;
/// Maximum number of event subscribers
pub const MAX_EVENT_SUBSCRIBERS: usize = 4;

/// Request to the charge manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// New available charge from a supplier, `None` if the supplier is gone
    UpdateCharge {
        /// Supplier
        supplier: Supplier,
        /// Port
        port: PortId,
        /// Available charge
        charge: Option<ChargePortInfo>,
    },
    /// New Type-C current advertisement
    UpdateTypecCharge {
        /// Port
        port: PortId,
        /// Advertised current in mA
        current_ma: u32,
        /// The source is a debug accessory
        dts: bool,
        /// Supply voltage in mV
        voltage_mv: u32,
    },
    /// Partner dual-role capability changed
    UpdateDualRole {
        /// Port
        port: PortId,
        /// New capability
        capability: DualRoleCapability,
    },
    /// Set or clear a requestor's ceiling
    SetCeiling {
        /// Port
        port: PortId,
        /// Requestor
        requestor: CeilRequestor,
        /// Ceiling in mA, `None` to clear
        ceiling_ma: Option<u32>,
    },
    /// Lower the PD ceiling and apply it immediately if the port is charging
    ForceCeiling {
        /// Port
        port: PortId,
        /// Ceiling in mA
        ceiling_ma: u32,
    },
    /// Override port selection
    SetOverride(OverrideRequest),
    /// Host limit on the dedicated charger
    OverrideDedicatedLimit(ChargePortInfo),
    /// Host limit applied to every PD port, `None` fields remove the limit
    SetExternalPowerLimit {
        /// Current ceiling in mA
        current_ma: Option<u32>,
        /// Voltage limit in mV
        voltage_mv: Option<u32>,
    },
    /// The battery can be trusted, leave safe mode
    LeaveSafeMode,
}

/// Response to a request that reports a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Result of [`Request::SetOverride`]
    Override(Result<(), OverrideError>),
    /// Result of [`Request::OverrideDedicatedLimit`]
    DedicatedLimit(Result<(), Unavailable>),
}

/// Broadcast event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The applied port, supplier or current limit changed
    PowerSupplyChanged(ActiveCharge),
    /// Host visible power information changed and should be re-read
    HostPowerChange,
}

/// Event subscriber type
pub type EventSubscriber<'a> =
    Subscriber<'a, GlobalRawMutex, Event, EVENT_QUEUE_SIZE, MAX_EVENT_SUBSCRIBERS, 0>;

/// Charge manager context
pub struct Context {
    /// Queued requests
    requests: Channel<GlobalRawMutex, Request, REQUEST_QUEUE_SIZE>,
    /// Serializes requests that expect a response
    response_lock: Mutex<GlobalRawMutex, ()>,
    /// Override response
    override_response: Signal<GlobalRawMutex, Result<(), OverrideError>>,
    /// Dedicated limit response
    dedicated_limit_response: Signal<GlobalRawMutex, Result<(), Unavailable>>,
    /// Event broadcaster
    events: PubSubChannel<GlobalRawMutex, Event, EVENT_QUEUE_SIZE, MAX_EVENT_SUBSCRIBERS, 0>,
    /// Sourcing ports
    source_current: SourceCurrentAllocator,
    /// Set when the sourcing bitmap changed
    source_current_changed: Signal<GlobalRawMutex, ()>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a new context
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            response_lock: Mutex::new(()),
            override_response: Signal::new(),
            dedicated_limit_response: Signal::new(),
            events: PubSubChannel::new(),
            source_current: SourceCurrentAllocator::new(),
            source_current_changed: Signal::new(),
        }
    }

    /// Queue a request
    pub async fn send(&self, request: Request) {
        self.requests.send(request).await;
    }

    /// Report the available charge of a supplier on a port
    pub async fn update_charge(&self, supplier: Supplier, port: PortId, charge: Option<ChargePortInfo>) {
        self.send(Request::UpdateCharge { supplier, port, charge }).await;
    }

    /// Report a PD contract
    pub async fn update_pd_charge(&self, port: PortId, current_ma: u32, voltage_mv: u32) {
        self.update_charge(Supplier::Pd, port, Some(ChargePortInfo::new(current_ma, voltage_mv)))
            .await;
    }

    /// Report a Type-C current advertisement
    pub async fn update_typec_charge(&self, port: PortId, current_ma: u32, dts: bool, voltage_mv: u32) {
        self.send(Request::UpdateTypecCharge {
            port,
            current_ma,
            dts,
            voltage_mv,
        })
        .await;
    }

    /// Report the partner's dual-role capability
    pub async fn update_dualrole(&self, port: PortId, capability: DualRoleCapability) {
        self.send(Request::UpdateDualRole { port, capability }).await;
    }

    /// Set or clear a ceiling
    pub async fn set_ceiling(&self, port: PortId, requestor: CeilRequestor, ceiling_ma: Option<u32>) {
        self.send(Request::SetCeiling {
            port,
            requestor,
            ceiling_ma,
        })
        .await;
    }

    /// Lower the PD ceiling of a port
    pub async fn force_ceiling(&self, port: PortId, ceiling_ma: u32) {
        self.send(Request::ForceCeiling { port, ceiling_ma }).await;
    }

    /// Limit every PD port, `None` fields remove the limit
    pub async fn set_external_power_limit(&self, current_ma: Option<u32>, voltage_mv: Option<u32>) {
        self.send(Request::SetExternalPowerLimit { current_ma, voltage_mv })
            .await;
    }

    /// Remove the external power limit, e.g. when the host suspends
    pub async fn clear_external_power_limit(&self) {
        self.set_external_power_limit(None, None).await;
    }

    /// Leave safe mode after the configured delay
    pub async fn leave_safe_mode(&self) {
        self.send(Request::LeaveSafeMode).await;
    }

    /// Override port selection
    pub async fn set_override(&self, request: OverrideRequest) -> Result<(), OverrideError> {
        let _guard = self.response_lock.lock().await;
        self.override_response.reset();
        self.send(Request::SetOverride(request)).await;
        self.override_response.wait().await
    }

    /// Limit the dedicated charger, only allowed while it is the active port
    pub async fn override_dedicated_limit(&self, charge: ChargePortInfo) -> Result<(), Unavailable> {
        let _guard = self.response_lock.lock().await;
        self.dedicated_limit_response.reset();
        self.send(Request::OverrideDedicatedLimit(charge)).await;
        self.dedicated_limit_response.wait().await
    }

    /// Mark a port as sourcing power or not
    ///
    /// Safe to call from interrupt context, the new Rp values are applied by the task.
    pub fn source_port(&self, port: PortId, enable: bool) {
        if self.source_current.set_source(port, enable) {
            self.source_current_changed.signal(());
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> Result<EventSubscriber<'_>, pubsub::Error> {
        self.events.subscriber()
    }

    pub(crate) async fn receive(&self) -> Request {
        self.requests.receive().await
    }

    pub(crate) fn try_receive(&self) -> Option<Request> {
        self.requests.try_receive().ok()
    }

    pub(crate) fn respond(&self, response: Response) {
        match response {
            Response::Override(result) => self.override_response.signal(result),
            Response::DedicatedLimit(result) => self.dedicated_limit_response.signal(result),
        }
    }

    pub(crate) fn publish(&self, event: Event) {
        self.events.immediate_publisher().publish_immediate(event);
    }

    pub(crate) fn source_current_bitmap(&self) -> u32 {
        self.source_current.bitmap()
    }

    pub(crate) async fn wait_source_current_change(&self) {
        self.source_current_changed.wait().await;
    }

    pub(crate) fn take_source_current_change(&self) -> bool {
        self.source_current_changed.try_take().is_some()
    }
}
