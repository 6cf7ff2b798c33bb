//! Channel <-> DumpHandler dispatcher for the worker core.

use embassy_sync::channel::{DynamicReceiver, DynamicSender};

use nandrip_core::dump::{DumpHandler, DumpRequest, DumpResponse};
use nandrip_core::io_driver::NandIoDriver;

use crate::shared::resource::PageBufHandle;

/// Pulls dump requests off the cross-core channel, runs them against the
/// handler, and sends the response back. Strictly one request in flight.
pub struct DumpDispatcher<'ch, Driver: NandIoDriver> {
    handler: DumpHandler<Driver>,
    req_receiver: DynamicReceiver<'ch, DumpRequest<PageBufHandle>>,
    resp_sender: DynamicSender<'ch, DumpResponse<PageBufHandle>>,
}

impl<'ch, Driver: NandIoDriver> DumpDispatcher<'ch, Driver> {
    pub fn new(
        handler: DumpHandler<Driver>,
        req_receiver: DynamicReceiver<'ch, DumpRequest<PageBufHandle>>,
        resp_sender: DynamicSender<'ch, DumpResponse<PageBufHandle>>,
    ) -> Self {
        Self {
            handler,
            req_receiver,
            resp_sender,
        }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            let req = self.req_receiver.receive().await;
            defmt::trace!("Dispatch request: {}", req.name());
            let resp = self.handler.handle(req).await;
            defmt::trace!(
                "Dispatch response: {} (page counter {})",
                resp.name(),
                self.handler.page_counter()
            );
            self.resp_sender.send(resp).await;
        }
    }
}
