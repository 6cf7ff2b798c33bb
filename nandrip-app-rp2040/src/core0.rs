//! Control core: USB device and the serial console.

use embassy_futures::join::join;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_time::Timer;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config};

use nandrip_core::dump::{DumpRequest, DumpResponse};
use nandrip_core::id::FlashGeometry;

use crate::console::Console;
use crate::shared::constant::*;
use crate::shared::resource::{PageBufHandle, CHANNEL_DUMP_REQUEST, CHANNEL_DUMP_RESPONSE};

/// Identify the chip through the worker core before the USB device comes
/// up. A box with an unsupported or missing chip is useless, so a failed
/// setup halts with a diagnostic instead of presenting a console.
async fn setup_dump_channel() -> FlashGeometry {
    CHANNEL_DUMP_REQUEST.send(DumpRequest::Setup).await;
    match CHANNEL_DUMP_RESPONSE.receive().await {
        DumpResponse::Setup(Ok(geometry)) => {
            defmt::info!(
                "NAND geometry: page {} + spare {}, total {} bytes",
                geometry.page_size,
                geometry.spare_size,
                geometry.total_size
            );
            geometry
        }
        DumpResponse::Setup(Err(err)) => {
            defmt::panic!("NAND setup failed: {}", err)
        }
        _ => defmt::panic!("Unexpected setup response"),
    }
}

fn create_usb_config<'a>() -> Config<'a> {
    let mut config = Config::new(USB_VID, USB_PID);
    config.manufacturer = Some(USB_MANUFACTURER);
    config.product = Some(USB_PRODUCT);
    config.serial_number = Some(USB_SERIAL_NUMBER);
    config.max_power = USB_MAX_POWER;
    config.max_packet_size_0 = USB_MAX_PACKET_SIZE;

    // Required for windows compatibility.
    config.device_class = 0xEF;
    config.device_sub_class = 0x02;
    config.device_protocol = 0x01;
    config.composite_with_iads = true;
    config
}

#[embassy_executor::task]
pub async fn main_task(driver: Driver<'static, USB>, page_buf: PageBufHandle) {
    let geometry = setup_dump_channel().await;

    let config = create_usb_config();

    let mut config_descriptor = [0; 256];
    let mut bos_descriptor = [0; 256];
    let mut msos_descriptor = [0; 256];
    let mut control_buf = [0; 64];
    let mut state = State::new();

    let mut builder = Builder::new(
        driver,
        config,
        &mut config_descriptor,
        &mut bos_descriptor,
        &mut msos_descriptor,
        &mut control_buf,
    );
    let class = CdcAcmClass::new(&mut builder, &mut state, USB_MAX_PACKET_SIZE as u16);
    let (tx, rx) = class.split();

    let mut usb = builder.build();
    let usb_fut = usb.run();

    let mut console = Console::new(
        tx,
        rx,
        CHANNEL_DUMP_REQUEST.dyn_sender(),
        CHANNEL_DUMP_RESPONSE.dyn_receiver(),
        page_buf,
        geometry,
    );
    let console_fut = console.run();

    join(usb_fut, console_fut).await;
}

/// Activity blink, roughly four times a second.
#[embassy_executor::task]
pub async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.toggle();
        Timer::after_millis(250).await;
    }
}
