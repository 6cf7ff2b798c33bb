//! NAND bus pins and the timing-critical bus primitives.
//!
//! The 8 data lines sit on contiguous GPIOs and are always driven or
//! sampled as one group. Sub-microsecond holds are busy-waited in whole
//! bus cycles (`cortex_m::asm::delay`); anything at microsecond scale and
//! above lives in the driver layer on the embassy timer.

use cortex_m::asm::delay;
use embassy_rp::gpio::{Drive, Flex, Input, Level, Output};

use nandrip_core::io_driver::NandIoError;

use crate::shared::constant::*;

/// NAND I/O pins.
///
/// | Signal | GPIO | Role                           |
/// | ------ | ---- | ------------------------------ |
/// | IO0-7  | 0-7  | data/command/address bus       |
/// | RY/BY  | 16   | ready/busy (input, pull-up)    |
/// | /WP    | 17   | write protect                  |
/// | /WE    | 18   | write enable                   |
/// | /RE    | 19   | read enable                    |
/// | /CE    | 20   | chip enable                    |
/// | ALE    | 21   | address latch enable           |
/// | CLE    | 22   | command latch enable           |
pub struct NandIoPins<'d> {
    io0: Flex<'d>,
    io1: Flex<'d>,
    io2: Flex<'d>,
    io3: Flex<'d>,
    io4: Flex<'d>,
    io5: Flex<'d>,
    io6: Flex<'d>,
    io7: Flex<'d>,
    cle: Output<'d>,
    ale: Output<'d>,
    ceb: Output<'d>,
    reb: Output<'d>,
    web: Output<'d>,
    wpb: Output<'d>,
    rbb: Input<'d>,
}

impl<'d> NandIoPins<'d> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        io0: Flex<'d>,
        io1: Flex<'d>,
        io2: Flex<'d>,
        io3: Flex<'d>,
        io4: Flex<'d>,
        io5: Flex<'d>,
        io6: Flex<'d>,
        io7: Flex<'d>,
        cle: Output<'d>,
        ale: Output<'d>,
        ceb: Output<'d>,
        reb: Output<'d>,
        web: Output<'d>,
        wpb: Output<'d>,
        rbb: Input<'d>,
    ) -> Self {
        Self {
            io0,
            io1,
            io2,
            io3,
            io4,
            io5,
            io6,
            io7,
            cle,
            ale,
            ceb,
            reb,
            web,
            wpb,
            rbb,
        }
    }

    /// Drive every pin to its idle state and apply the pad drive strength.
    pub fn setup(&mut self) {
        self.set_data_dir(true);
        self.set_data(0x00);

        self.cle.set_low();
        self.ale.set_low();
        self.ceb.set_high(); // standby
        self.reb.set_high();
        self.web.set_high();
        self.wpb.set_high(); // writes are never issued, but keep /WP released

        self.set_drive_strength(NAND_PAD_DRIVE);

        defmt::trace!("Init all pins");
    }

    /// Pad drive strength for the data lines and the driven control lines.
    pub fn set_drive_strength(&mut self, drive: Drive) {
        self.io0.set_drive_strength(drive);
        self.io1.set_drive_strength(drive);
        self.io2.set_drive_strength(drive);
        self.io3.set_drive_strength(drive);
        self.io4.set_drive_strength(drive);
        self.io5.set_drive_strength(drive);
        self.io6.set_drive_strength(drive);
        self.io7.set_drive_strength(drive);
        self.cle.set_drive_strength(drive);
        self.ale.set_drive_strength(drive);
        self.ceb.set_drive_strength(drive);
        self.reb.set_drive_strength(drive);
        self.web.set_drive_strength(drive);
        self.wpb.set_drive_strength(drive);
    }

    /// Set the data line direction. true: output, false: input
    fn set_data_dir(&mut self, is_output: bool) {
        if is_output {
            self.io0.set_as_output();
            self.io1.set_as_output();
            self.io2.set_as_output();
            self.io3.set_as_output();
            self.io4.set_as_output();
            self.io5.set_as_output();
            self.io6.set_as_output();
            self.io7.set_as_output();
        } else {
            self.io0.set_as_input();
            self.io1.set_as_input();
            self.io2.set_as_input();
            self.io3.set_as_input();
            self.io4.set_as_input();
            self.io5.set_as_input();
            self.io6.set_as_input();
            self.io7.set_as_input();
        }
    }

    /// Drive one byte onto the data lines.
    fn set_data(&mut self, data: u8) {
        self.io0.set_level(Level::from(data & 0x01 != 0));
        self.io1.set_level(Level::from(data & 0x02 != 0));
        self.io2.set_level(Level::from(data & 0x04 != 0));
        self.io3.set_level(Level::from(data & 0x08 != 0));
        self.io4.set_level(Level::from(data & 0x10 != 0));
        self.io5.set_level(Level::from(data & 0x20 != 0));
        self.io6.set_level(Level::from(data & 0x40 != 0));
        self.io7.set_level(Level::from(data & 0x80 != 0));
    }

    /// Sample the data lines.
    fn get_data(&mut self) -> u8 {
        let mut data: u8 = 0;
        data |= if self.io0.is_high() { 0x01 } else { 0x00 };
        data |= if self.io1.is_high() { 0x02 } else { 0x00 };
        data |= if self.io2.is_high() { 0x04 } else { 0x00 };
        data |= if self.io3.is_high() { 0x08 } else { 0x00 };
        data |= if self.io4.is_high() { 0x10 } else { 0x00 };
        data |= if self.io5.is_high() { 0x20 } else { 0x00 };
        data |= if self.io6.is_high() { 0x40 } else { 0x00 };
        data |= if self.io7.is_high() { 0x80 } else { 0x00 };
        data
    }

    /// Return the chip to standby.
    pub fn deassert_ce(&mut self) {
        self.ceb.set_high();
        defmt::trace!("Deassert /CE");
    }

    /// Latch a command byte.
    ///
    /// CLE=H, ALE=L, /CE=L, one /WE pulse; the byte is committed on the
    /// /WE rising edge.
    pub fn latch_command(&mut self, command: u8) {
        self.reb.set_high();
        self.web.set_high();
        self.ale.set_low();
        self.set_data_dir(true);
        self.set_data(command);
        self.cle.set_high();
        self.ceb.set_low();
        delay(CYCLES_CE_SETUP);

        self.web.set_low();
        delay(CYCLES_WE_PULSE);
        self.web.set_high();
        delay(CYCLES_CMD_HOLD);
        self.cle.set_low();

        defmt::trace!("Command latch: 0x{:02X}", command);
    }

    /// Latch a single address byte (identify reads).
    ///
    /// CLE=L, ALE=H, /CE=L, one /WE pulse.
    pub fn latch_address(&mut self, address: u8) {
        self.ceb.set_low();
        self.reb.set_high();
        self.web.set_high();
        self.cle.set_low();
        self.set_data_dir(true);
        self.ale.set_high();
        delay(CYCLES_ALE_SETUP);

        self.set_data(address);
        delay(CYCLES_ADDR_SETUP);
        self.web.set_low();
        delay(CYCLES_ADDR_WE_PULSE);
        self.web.set_high();
        delay(CYCLES_ADDR_HOLD);
        self.ale.set_low();

        defmt::trace!("Address latch: 0x{:02X}", address);
    }

    /// Latch a full 5-cycle row/column address.
    ///
    /// Same skeleton as `latch_address`, one /WE pulse per cycle, but with
    /// the long settle times: this sequence commits the chip to an
    /// operation and must keep its extra margin relative to the
    /// single-byte variant.
    pub fn latch_full_address(&mut self, cycles: &[u8; nandrip_core::address::ADDRESS_CYCLES]) {
        self.ceb.set_low();
        self.reb.set_high();
        self.web.set_high();
        self.cle.set_low();
        self.set_data_dir(true);
        self.ale.set_high();
        delay(CYCLES_FULL_ADDR_ALE_SETUP);

        for (index, byte) in cycles.iter().enumerate() {
            self.set_data(*byte);
            delay(CYCLES_FULL_ADDR_STEP);
            self.web.set_low();
            delay(CYCLES_FULL_ADDR_STEP);
            self.web.set_high();
            delay(CYCLES_FULL_ADDR_STEP);

            defmt::trace!("Address latch[{}]: 0x{:02X}", index, *byte);
        }
        delay(CYCLES_FULL_ADDR_HOLD);
        self.ale.set_low();
    }

    /// Bounded ready/busy wait.
    ///
    /// The original firmware polled RY//BY forever; a chip that never
    /// reports ready now surfaces as `NotReady` instead of hanging the
    /// worker core.
    fn wait_ready(&mut self) -> Result<(), NandIoError> {
        let mut polls: u32 = 0;
        while self.rbb.is_low() {
            polls += 1;
            if polls >= READY_RETRY_LIMIT {
                defmt::warn!("Ready/busy wait exhausted after {} polls", polls);
                return Err(NandIoError::NotReady);
            }
            delay(CYCLES_READY_POLL);
        }
        defmt::trace!("Ready after {} polls", polls);
        Ok(())
    }

    /// Clock `buf[..read_bytes]` out of the chip.
    ///
    /// Data lines switch to input, latches idle, /CE stays asserted. The
    /// chip's column counter auto-increments on every /RE falling edge, so
    /// the bytes arrive as one contiguous stream from the latched address.
    pub fn read_cycle(&mut self, buf: &mut [u8], read_bytes: usize) -> Result<(), NandIoError> {
        self.set_data_dir(false);
        self.ceb.set_low();
        self.cle.set_low();
        self.ale.set_low();
        self.web.set_high();
        self.reb.set_high();

        // busy asserts within 100 ns of the confirm command
        delay(CYCLES_READ_PRE_READY);
        self.wait_ready()?;
        delay(CYCLES_READY_SETTLE);

        for byte in buf[..read_bytes].iter_mut() {
            self.reb.set_low();
            delay(CYCLES_RE_TO_DATA);
            *byte = self.get_data();
            delay(CYCLES_RE_LOW_HOLD);
            self.reb.set_high();
            delay(CYCLES_RE_HIGH_HOLD);
        }
        defmt::trace!("Read {} bytes", read_bytes);
        Ok(())
    }
}
