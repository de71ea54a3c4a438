// Panicking is how tests communicate failure, so we need to allow it here.
#![allow(clippy::unwrap_used)]
#![allow(clippy::unreachable)]

mod common;

#[cfg(test)]
mod test {
    use charge_manager_interface::{OverrideError, OverrideRequest, PortId, Supplier, TypecRp};
    use charge_manager_service::GlobalRawMutex;
    use charge_manager_service::service::context::{Context, Event, EventSubscriber};
    use charge_manager_service::service::task::task;
    use embassy_sync::mutex::Mutex;
    use embassy_time::{Duration, with_timeout};

    use crate::common::mock::FnCall;
    use crate::common::{PD_20V_3A, PD_PORT0, PD_PORT1, config, seeded_service};

    const EVENT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Wait for the next power supply change, skipping host notifications
    async fn power_supply_changed(subscriber: &mut EventSubscriber<'_>) -> Option<PortId> {
        loop {
            let event = with_timeout(EVENT_TIMEOUT, subscriber.next_message_pure())
                .await
                .unwrap();
            if let Event::PowerSupplyChanged(active) = event {
                return active.port();
            }
        }
    }

    #[tokio::test]
    async fn test_requests() {
        let context = Context::new();
        let service = Mutex::<GlobalRawMutex, _>::new(seeded_service(&context, config()));
        let mut subscriber = context.subscribe().unwrap();

        // Run the task in the local scope so it can borrow from the stack, it never returns
        tokio::select! {
            _ = task(&context, &service) => unreachable!("charge manager task finished unexpectedly"),
            _ = async {
                context.update_pd_charge(PD_PORT0, PD_20V_3A.current_ma, PD_20V_3A.voltage_mv).await;
                assert_eq!(power_supply_changed(&mut subscriber).await, Some(PD_PORT0));
                assert_eq!(service.lock().await.active_supplier(), Some(Supplier::Pd));

                assert_eq!(
                    context.set_override(OverrideRequest::Port(PortId(6))).await,
                    Err(OverrideError::InvalidPort)
                );

                assert_eq!(context.set_override(OverrideRequest::DontCharge).await, Ok(()));
                assert_eq!(power_supply_changed(&mut subscriber).await, None);
                assert_eq!(service.lock().await.override_request(), OverrideRequest::DontCharge);

                assert_eq!(context.set_override(OverrideRequest::Off).await, Ok(()));
                assert_eq!(power_supply_changed(&mut subscriber).await, Some(PD_PORT0));
            } => {}
        }
    }

    #[tokio::test]
    async fn test_source_current() {
        let context = Context::new();
        let service = Mutex::<GlobalRawMutex, _>::new(seeded_service(&context, config()));

        tokio::select! {
            _ = task(&context, &service) => unreachable!("charge manager task finished unexpectedly"),
            _ = async {
                context.source_port(PD_PORT1, true);
                loop {
                    let calls = service.lock().await.pd_mut().take_calls();
                    if !calls.is_empty() {
                        assert_eq!(
                            calls,
                            vec![
                                FnCall::SetSourceCurrentLimit(PD_PORT0, TypecRp::Rp1A5),
                                FnCall::SetSourceCurrentLimit(PD_PORT1, TypecRp::Rp3A0),
                            ]
                        );
                        break;
                    }
                    embassy_time::Timer::after_millis(10).await;
                }
            } => {}
        }
    }

    /// A pending override times out on its own
    #[tokio::test]
    async fn test_power_swap_timeout() {
        let context = Context::new();
        let mut config = config();
        config.power_swap_timeout = Duration::from_millis(100);
        let mut service = seeded_service(&context, config);
        service.pd_mut().set_role(PD_PORT1, charge_manager_interface::PowerRole::Source);
        service.update_dualrole(PD_PORT1, charge_manager_interface::DualRoleCapability::DualRole);
        let service = Mutex::<GlobalRawMutex, _>::new(service);
        let mut subscriber = context.subscribe().unwrap();

        tokio::select! {
            _ = task(&context, &service) => unreachable!("charge manager task finished unexpectedly"),
            _ = async {
                assert_eq!(context.set_override(OverrideRequest::Port(PD_PORT1)).await, Ok(()));
                assert_eq!(service.lock().await.delayed_override_port(), Some(PD_PORT1));

                let event = with_timeout(EVENT_TIMEOUT, subscriber.next_message_pure()).await.unwrap();
                assert_eq!(event, Event::HostPowerChange);
                assert_eq!(service.lock().await.delayed_override_port(), None);
            } => {}
        }
    }
}
