//! Worker core: owns the NAND bus and serves dump requests.

use nandrip_core::dump::DumpHandler;

use crate::dispatch::DumpDispatcher;
use crate::nand::fw_driver::NandIoFwDriver;
use crate::nand::pins::NandIoPins;
use crate::shared::resource::{CHANNEL_DUMP_REQUEST, CHANNEL_DUMP_RESPONSE};

#[embassy_executor::task]
pub async fn main_task(pins: NandIoPins<'static>) -> ! {
    defmt::info!("NAND worker up");

    let fw_driver = NandIoFwDriver::new(pins);
    let handler = DumpHandler::new(fw_driver);

    let mut dispatcher = DumpDispatcher::new(
        handler,
        CHANNEL_DUMP_REQUEST.dyn_receiver(),
        CHANNEL_DUMP_RESPONSE.dyn_sender(),
    );
    dispatcher.run().await
}
