use embassy_rp::gpio::Drive;
use embassy_time::Duration;

/* System setup */

/// Core1 task stack size
pub const CORE1_TASK_STACK_SIZE: usize = 8 * 1024;

/// Control core -> worker core request channel size
pub const CHANNEL_DUMP_REQUEST_N: usize = 4;
/// Worker core -> control core response channel size
pub const CHANNEL_DUMP_RESPONSE_N: usize = 4;

/// Bulk page buffer: must hold the largest supported page + spare transfer
/// (4096 + 256); sized with headroom.
pub const PAGE_BUFFER_SIZE: usize = 16384;

/* USB setup */

/// USB device vendor ID
pub const USB_VID: u16 = 0xc0de;
/// USB device product ID
pub const USB_PID: u16 = 0xcafe;
/// USB device manufacturer string
pub const USB_MANUFACTURER: &str = "nandrip";
/// USB device product string
pub const USB_PRODUCT: &str = "nandrip nand dumper";
/// USB device serial number string
pub const USB_SERIAL_NUMBER: &str = "nandrip0001";
/// USB device maximum power consumption in mA
pub const USB_MAX_POWER: u16 = 100;
/// USB device maximum packet size
pub const USB_MAX_PACKET_SIZE: u8 = 64;

/// Wait per raw argument byte of the set-page command
pub const SET_PAGE_ARG_TIMEOUT: Duration = Duration::from_secs(2);

/* NAND pad setup */

/// Pad drive strength for the data and control lines
pub const NAND_PAD_DRIVE: Drive = Drive::_2mA;

/* NAND bus cycle timing */
//
// The datasheet requirements are "at least N ns"; delays are whole bus
// cycles rounded up at the target clock rate. Address latching commits the
// chip to an operation, so the 5-cycle row/column sequence runs with a 10x
// margin and the read path with a 2x margin relative to the command latch.

/// /CE low to /WE rising, >= 20 ns
pub const CYCLES_CE_SETUP: u32 = 5;
/// /WE low pulse width, >= ~12 ns
pub const CYCLES_WE_PULSE: u32 = 3;
/// Hold before CLE deasserts and the data lines change, >= ~12 ns
pub const CYCLES_CMD_HOLD: u32 = 3;

/// ALE setup before the address byte is driven
pub const CYCLES_ALE_SETUP: u32 = 4;
/// Address data setup before the /WE pulse
pub const CYCLES_ADDR_SETUP: u32 = 3;
/// /WE low pulse width for a single address byte
pub const CYCLES_ADDR_WE_PULSE: u32 = 3;
/// Hold before ALE deasserts
pub const CYCLES_ADDR_HOLD: u32 = 3;

/// Extra margin for the row/column address sequence
pub const FULL_ADDR_TIMING_MULTIPLIER: u32 = 10;
/// ALE setup for the 5-cycle sequence
pub const CYCLES_FULL_ADDR_ALE_SETUP: u32 = 5 * FULL_ADDR_TIMING_MULTIPLIER;
/// Per-phase delay (data setup, /WE low, /WE high) for each address cycle
pub const CYCLES_FULL_ADDR_STEP: u32 = 4 * FULL_ADDR_TIMING_MULTIPLIER;
/// Hold before ALE deasserts after the last cycle
pub const CYCLES_FULL_ADDR_HOLD: u32 = 3 * FULL_ADDR_TIMING_MULTIPLIER;

/// Margin for the read path
pub const READ_TIMING_MULTIPLIER: u32 = 2;
/// Settle before sampling ready/busy; busy asserts within 100 ns
pub const CYCLES_READ_PRE_READY: u32 = 20 * READ_TIMING_MULTIPLIER;
/// Ready/busy poll interval
pub const CYCLES_READY_POLL: u32 = 20 * READ_TIMING_MULTIPLIER;
/// Settle after ready asserts before the first /RE pulse
pub const CYCLES_READY_SETTLE: u32 = 5 * READ_TIMING_MULTIPLIER;
/// /RE falling edge to valid data (t_REA), >= 20 ns
pub const CYCLES_RE_TO_DATA: u32 = 5 * READ_TIMING_MULTIPLIER;
/// Hold after sampling before /RE rises
pub const CYCLES_RE_LOW_HOLD: u32 = 3 * READ_TIMING_MULTIPLIER;
/// /RE high hold before the next byte
pub const CYCLES_RE_HIGH_HOLD: u32 = 3 * READ_TIMING_MULTIPLIER;

/// Bounded ready/busy wait: poll attempts before reporting the chip as
/// not ready instead of hanging the worker core.
pub const READY_RETRY_LIMIT: u32 = 250_000;

/// Reset recovery, a little more than the documented maximum (t_RST)
pub const DELAY_US_FOR_RESET: u64 = 600;
/// Settle between read confirm (0x30) and the first data cycle
pub const DELAY_US_FOR_READ_CONFIRM: u64 = 1;
