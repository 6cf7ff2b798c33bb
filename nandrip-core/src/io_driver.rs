use crate::id::IdBytes;

/// NAND command opcodes used by the read-only dump flow.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandId {
    ReadFirst = 0x00,
    ReadSecond = 0x30,
    IdRead = 0x90,
    Reset = 0xff,
}

/// Bus-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NandIoError {
    /// The ready/busy line never asserted within the bounded wait.
    NotReady,
}

/// NAND bus driver seam.
///
/// Implementations own the physical pins and the cycle-accurate latch
/// timing. Operations do not retry; an unready chip surfaces as
/// [`NandIoError::NotReady`] and everything else is assumed to succeed
/// once started.
#[trait_variant::make(Send)]
pub trait NandIoDriver {
    /// Initialize all pins to their idle state.
    async fn setup(&mut self);

    /// Full chip reset (0xFF) followed by the maximum documented reset time.
    async fn reset(&mut self);

    /// Identify (0x90 / address 0x00 / 5 bytes).
    async fn read_id(&mut self) -> Result<IdBytes, NandIoError>;

    /// Read one whole page (data + spare) into `buf[..read_bytes]`.
    ///
    /// The sequence is reset, read setup (0x00), 5 address cycles with
    /// column 0, read confirm (0x30), then `read_bytes` data cycles.
    async fn read_page(
        &mut self,
        page: u32,
        buf: &mut [u8],
        read_bytes: usize,
    ) -> Result<(), NandIoError>;
}
