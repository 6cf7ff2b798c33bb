#![no_std]
#![no_main]

mod console;
mod core0;
mod core1;
mod dispatch;
mod nand;
mod shared;

use embassy_executor::Executor;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Flex, Input, Level, Output, Pull};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, InterruptHandler};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::nand::pins::NandIoPins;
use crate::shared::constant::CORE1_TASK_STACK_SIZE;
use crate::shared::resource::PAGE_BUFFER;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

static CORE1_STACK: StaticCell<Stack<CORE1_TASK_STACK_SIZE>> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: embassy_executor::Spawner) {
    let p = embassy_rp::init(Default::default());

    // NAND bus wiring: IO0-7 on GPIO0-7, control lines on GPIO16-22.
    let nand_pins = NandIoPins::new(
        Flex::new(p.PIN_0),
        Flex::new(p.PIN_1),
        Flex::new(p.PIN_2),
        Flex::new(p.PIN_3),
        Flex::new(p.PIN_4),
        Flex::new(p.PIN_5),
        Flex::new(p.PIN_6),
        Flex::new(p.PIN_7),
        Output::new(p.PIN_22, Level::Low),  // CLE
        Output::new(p.PIN_21, Level::Low),  // ALE
        Output::new(p.PIN_20, Level::High), // /CE
        Output::new(p.PIN_19, Level::High), // /RE
        Output::new(p.PIN_18, Level::High), // /WE
        Output::new(p.PIN_17, Level::High), // /WP
        Input::new(p.PIN_16, Pull::Up),     // RY//BY
    );

    spawn_core1(
        p.CORE1,
        CORE1_STACK.init(Stack::new()),
        move || {
            let executor1 = EXECUTOR1.init(Executor::new());
            executor1.run(|spawner| defmt::unwrap!(spawner.spawn(core1::main_task(nand_pins))));
        },
    );

    let usb_driver = Driver::new(p.USB, Irqs);
    let page_buf = PAGE_BUFFER.init([0; shared::constant::PAGE_BUFFER_SIZE]);
    let led = Output::new(p.PIN_25, Level::Low);

    defmt::unwrap!(spawner.spawn(core0::heartbeat_task(led)));
    defmt::unwrap!(spawner.spawn(core0::main_task(usb_driver, page_buf)));
}
