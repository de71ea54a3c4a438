use charge_manager_interface::{Board, PdPorts};
use embassy_futures::select::{Either3, select3};
use embassy_sync::mutex::Mutex;
use embassy_time::{Instant, Timer};

use super::Service;
use super::context::{Context, Request};
use crate::GlobalRawMutex;

fn handle<B: Board, P: PdPorts>(context: &Context, service: &mut Service<'_, B, P>, request: Request) {
    trace!("Charge manager request: {:?}", request);
    if let Some(response) = service.process_request(request) {
        context.respond(response);
    }
}

/// Runs the charge manager task
///
/// Requests that arrive together are handled as a batch so they only cause a single refresh.
pub async fn task<B: Board, P: PdPorts>(context: &Context, service: &Mutex<GlobalRawMutex, Service<'_, B, P>>) -> ! {
    info!("Starting charge manager task");
    loop {
        let deadline = service.lock().await.next_deadline().unwrap_or(Instant::MAX);

        let event = select3(
            context.receive(),
            context.wait_source_current_change(),
            Timer::at(deadline),
        )
        .await;

        let mut service = service.lock().await;
        match event {
            Either3::First(request) => {
                handle(context, &mut service, request);
                while let Some(request) = context.try_receive() {
                    handle(context, &mut service, request);
                }
                if context.take_source_current_change() {
                    service.update_source_current();
                }
            }
            Either3::Second(()) => service.update_source_current(),
            Either3::Third(()) => {}
        }

        service.handle_timeouts(Instant::now());
        service.refresh_if_pending();
    }
}
