//! [`NandIoDriver`] implementation on top of the GPIO bus primitives.

use embassy_time::Timer;

use nandrip_core::address::page_address_cycles;
use nandrip_core::id::{IdBytes, ID_READ_BYTES};
use nandrip_core::io_driver::{CommandId, NandIoDriver, NandIoError};

use crate::shared::constant::{DELAY_US_FOR_READ_CONFIRM, DELAY_US_FOR_RESET};

use super::pins::NandIoPins;

pub struct NandIoFwDriver<'d> {
    pins: NandIoPins<'d>,
}

impl<'d> NandIoFwDriver<'d> {
    pub fn new(pins: NandIoPins<'d>) -> Self {
        Self { pins }
    }
}

impl<'d> NandIoDriver for NandIoFwDriver<'d> {
    async fn setup(&mut self) {
        self.pins.setup();
    }

    async fn reset(&mut self) {
        self.pins.latch_command(CommandId::Reset as u8);
        self.pins.deassert_ce();
        Timer::after_micros(DELAY_US_FOR_RESET).await;
        defmt::trace!("Reset");
    }

    async fn read_id(&mut self) -> Result<IdBytes, NandIoError> {
        let mut raw = [0u8; ID_READ_BYTES];

        self.pins.latch_command(CommandId::IdRead as u8);
        self.pins.latch_address(0x00);
        let result = self.pins.read_cycle(&mut raw, ID_READ_BYTES);
        self.pins.deassert_ce();

        result?;
        let id = IdBytes::new(raw);
        defmt::trace!("Read ID: {}", id);
        Ok(id)
    }

    async fn read_page(
        &mut self,
        page: u32,
        buf: &mut [u8],
        read_bytes: usize,
    ) -> Result<(), NandIoError> {
        // fresh command state for every page; a busy chip only accepts
        // status and reset commands, so the reset recovery must elapse
        // before the read setup is latched
        self.reset().await;

        self.pins.latch_command(CommandId::ReadFirst as u8);
        self.pins.latch_full_address(&page_address_cycles(page));
        self.pins.latch_command(CommandId::ReadSecond as u8);
        Timer::after_micros(DELAY_US_FOR_READ_CONFIRM).await;

        let result = self.pins.read_cycle(buf, read_bytes);
        self.pins.deassert_ce();

        result?;
        defmt::trace!("Read page: 0x{:05X} ({} bytes)", page, read_bytes);
        Ok(())
    }
}
