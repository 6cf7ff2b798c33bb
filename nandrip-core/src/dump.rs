//! Dump command protocol and the worker-side handler.
//!
//! Requests flow from the control core to the worker core, responses flow
//! back, and the bulk page buffer travels inside the messages. With a
//! single buffer in the system a second request cannot even be constructed
//! while one is in flight, so the one-outstanding-request discipline the
//! unsynchronized buffer relies on is enforced by ownership.

use crate::address::PAGE_ADDRESS_LIMIT;
use crate::id::{FlashGeometry, IdBytes, ID_READ_BYTES};
use crate::io_driver::{NandIoDriver, NandIoError};
use core::fmt;

/// Dump-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DumpError {
    /// Maker or page-size code outside the supported family.
    UnsupportedChip,
    /// Only the x8 organization is supported.
    UnsupportedBusWidth,
    /// A page operation was issued before a successful `Setup`.
    NotConfigured,
    /// Page number at or beyond the 17-bit row address range.
    PageOutOfRange,
    /// The chip never reported ready within the bounded wait.
    ChipNotReady,
}

impl From<NandIoError> for DumpError {
    fn from(err: NandIoError) -> Self {
        match err {
            NandIoError::NotReady => DumpError::ChipNotReady,
        }
    }
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DumpError::UnsupportedChip => "unsupported chip",
            DumpError::UnsupportedBusWidth => "unsupported bus width",
            DumpError::NotConfigured => "flash geometry not configured",
            DumpError::PageOutOfRange => "page number out of range",
            DumpError::ChipNotReady => "chip not ready",
        })
    }
}

/// Request from the control core. `B` is the bulk buffer handle.
pub enum DumpRequest<B> {
    /// Reset + identify + geometry decode. Must succeed before page reads.
    Setup,
    /// Read the 5 identification bytes into the buffer.
    ReadId { buf: B },
    /// Read the page at the current page counter into the buffer and
    /// advance the counter on success.
    ReadPage { buf: B },
    /// Set the page counter back to 0.
    ResetPageCounter,
    /// Set the page counter to an explicit 17-bit page number.
    SetPageCounter { page: u32 },
}

impl<B> DumpRequest<B> {
    /// Short label for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DumpRequest::Setup => "Setup",
            DumpRequest::ReadId { .. } => "ReadId",
            DumpRequest::ReadPage { .. } => "ReadPage",
            DumpRequest::ResetPageCounter => "ResetPageCounter",
            DumpRequest::SetPageCounter { .. } => "SetPageCounter",
        }
    }
}

/// Response to exactly one request.
pub enum DumpResponse<B> {
    /// Geometry for the attached chip, or the reason startup must fail.
    Setup(Result<FlashGeometry, DumpError>),
    /// `buf[..len]` holds the payload (5 for ID, page + spare for a page).
    Data { buf: B, len: usize },
    /// The read failed; the buffer contents are unreliable.
    ReadFailed { buf: B, error: DumpError },
    /// Counter operation acknowledged.
    Ack,
    /// The request was not executed.
    Rejected(DumpError),
}

impl<B> DumpResponse<B> {
    /// Short label for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DumpResponse::Setup(_) => "Setup",
            DumpResponse::Data { .. } => "Data",
            DumpResponse::ReadFailed { .. } => "ReadFailed",
            DumpResponse::Ack => "Ack",
            DumpResponse::Rejected(_) => "Rejected",
        }
    }
}

/// Worker-side request handler.
///
/// Owns the driver, the decoded geometry, and the page counter. The page
/// counter is never touched by the control core; it only observes it
/// through responses and the counter commands.
pub struct DumpHandler<D> {
    driver: D,
    geometry: Option<FlashGeometry>,
    page_counter: u32,
}

impl<D: NandIoDriver> DumpHandler<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            geometry: None,
            page_counter: 0,
        }
    }

    /// Current page counter, observable for tests and logging.
    pub fn page_counter(&self) -> u32 {
        self.page_counter
    }

    async fn setup(&mut self) -> Result<FlashGeometry, DumpError> {
        self.driver.setup().await;
        self.driver.reset().await;
        let id = self.driver.read_id().await?;
        if !id.is_eight_bit_bus() {
            return Err(DumpError::UnsupportedBusWidth);
        }
        let geometry = id.geometry().ok_or(DumpError::UnsupportedChip)?;
        self.geometry = Some(geometry);
        Ok(geometry)
    }

    /// Handle one request, producing exactly one response.
    pub async fn handle<B>(&mut self, request: DumpRequest<B>) -> DumpResponse<B>
    where
        B: AsMut<[u8]> + AsRef<[u8]>,
    {
        match request {
            DumpRequest::Setup => DumpResponse::Setup(self.setup().await),
            DumpRequest::ReadId { mut buf } => match self.driver.read_id().await {
                Ok(id) => {
                    buf.as_mut()[..ID_READ_BYTES].copy_from_slice(&id.raw);
                    DumpResponse::Data {
                        buf,
                        len: ID_READ_BYTES,
                    }
                }
                Err(err) => DumpResponse::ReadFailed {
                    buf,
                    error: err.into(),
                },
            },
            DumpRequest::ReadPage { mut buf } => {
                let Some(geometry) = self.geometry else {
                    return DumpResponse::Rejected(DumpError::NotConfigured);
                };
                if self.page_counter >= PAGE_ADDRESS_LIMIT {
                    return DumpResponse::Rejected(DumpError::PageOutOfRange);
                }
                let len = geometry.transfer_size();
                buf.as_mut()[..len].fill(0);
                match self
                    .driver
                    .read_page(self.page_counter, buf.as_mut(), len)
                    .await
                {
                    Ok(()) => {
                        self.page_counter += 1;
                        DumpResponse::Data { buf, len }
                    }
                    Err(err) => DumpResponse::ReadFailed {
                        buf,
                        error: err.into(),
                    },
                }
            }
            DumpRequest::ResetPageCounter => {
                self.page_counter = 0;
                DumpResponse::Ack
            }
            DumpRequest::SetPageCounter { page } => {
                if page >= PAGE_ADDRESS_LIMIT {
                    return DumpResponse::Rejected(DumpError::PageOutOfRange);
                }
                self.page_counter = page;
                DumpResponse::Ack
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SIM_ID: [u8; 5] = [0x98, 0xDC, 0x90, 0x26, 0x76];
    const TRANSFER: usize = 4096 + 256;
    const BUF_SIZE: usize = 16384;

    /// Deterministic simulated chip: page contents are a pure function of
    /// the page number and byte offset.
    struct SimNandChip {
        id: [u8; 5],
        resets: u32,
        fail_reads: bool,
        /// Busy chips accept only reset; reads fail until one completes.
        busy: bool,
    }

    impl SimNandChip {
        fn new() -> Self {
            Self {
                id: SIM_ID,
                resets: 0,
                fail_reads: false,
                busy: false,
            }
        }

        fn with_id(id: [u8; 5]) -> Self {
            Self {
                id,
                ..Self::new()
            }
        }

        fn busy_at_boot() -> Self {
            Self {
                busy: true,
                ..Self::new()
            }
        }

        fn byte_at(page: u32, offset: usize) -> u8 {
            (page as u8) ^ (offset as u8).wrapping_mul(31)
        }
    }

    impl NandIoDriver for SimNandChip {
        async fn setup(&mut self) {}

        async fn reset(&mut self) {
            self.resets += 1;
            self.busy = false;
        }

        async fn read_id(&mut self) -> Result<IdBytes, NandIoError> {
            if self.fail_reads || self.busy {
                return Err(NandIoError::NotReady);
            }
            Ok(IdBytes::new(self.id))
        }

        async fn read_page(
            &mut self,
            page: u32,
            buf: &mut [u8],
            read_bytes: usize,
        ) -> Result<(), NandIoError> {
            if self.fail_reads || self.busy {
                return Err(NandIoError::NotReady);
            }
            for (offset, byte) in buf[..read_bytes].iter_mut().enumerate() {
                *byte = Self::byte_at(page, offset);
            }
            Ok(())
        }
    }

    async fn configured_handler() -> DumpHandler<SimNandChip> {
        let mut handler = DumpHandler::new(SimNandChip::new());
        match handler.handle::<&mut [u8; BUF_SIZE]>(DumpRequest::Setup).await {
            DumpResponse::Setup(Ok(_)) => {}
            _ => panic!("setup failed"),
        }
        handler
    }

    #[tokio::test]
    async fn setup_decodes_geometry_end_to_end() {
        let mut handler = DumpHandler::new(SimNandChip::new());
        let resp = handler.handle::<&mut [u8; BUF_SIZE]>(DumpRequest::Setup).await;
        match resp {
            DumpResponse::Setup(Ok(geometry)) => {
                assert_eq!(
                    geometry,
                    FlashGeometry {
                        page_size: 4096,
                        spare_size: 256,
                        total_size: 64 * 2048 * 4352,
                    }
                );
            }
            _ => panic!("expected successful setup"),
        }
        // the chip was reset before identification
        assert!(handler.driver.resets >= 1);
    }

    #[tokio::test]
    async fn setup_resets_a_busy_chip_before_identifying() {
        // the identify command is only accepted once the reset recovery
        // has completed
        let mut handler = DumpHandler::new(SimNandChip::busy_at_boot());
        let resp = handler.handle::<&mut [u8; BUF_SIZE]>(DumpRequest::Setup).await;
        match resp {
            DumpResponse::Setup(Ok(geometry)) => assert_eq!(geometry.page_size, 4096),
            _ => panic!("expected successful setup"),
        }
        assert_eq!(handler.driver.resets, 1);
    }

    #[rstest]
    // Samsung maker code
    #[case([0xEC, 0xDC, 0x90, 0x26, 0x76], DumpError::UnsupportedChip)]
    // unrecognized page-size code
    #[case([0x98, 0xDC, 0x90, 0x27, 0x76], DumpError::UnsupportedChip)]
    // x16 organization bit set
    #[case([0x98, 0xDC, 0x90, 0x66, 0x76], DumpError::UnsupportedBusWidth)]
    #[tokio::test]
    async fn setup_rejects_unsupported_chips(#[case] id: [u8; 5], #[case] expect: DumpError) {
        let mut handler = DumpHandler::new(SimNandChip::with_id(id));
        let resp = handler.handle::<&mut [u8; BUF_SIZE]>(DumpRequest::Setup).await;
        match resp {
            DumpResponse::Setup(Err(err)) => assert_eq!(err, expect),
            _ => panic!("expected setup failure"),
        }
    }

    #[tokio::test]
    async fn read_id_returns_raw_bytes() {
        let mut handler = configured_handler().await;
        let mut buf = [0u8; BUF_SIZE];
        match handler.handle(DumpRequest::ReadId { buf: &mut buf }).await {
            DumpResponse::Data { buf, len } => {
                assert_eq!(len, 5);
                assert_eq!(&buf[..5], &SIM_ID);
            }
            _ => panic!("expected data"),
        }
    }

    #[tokio::test]
    async fn page_counter_advances_by_one_per_read_in_order() {
        let mut handler = configured_handler().await;
        let mut buf = [0u8; BUF_SIZE];
        for expected_page in 0..4u32 {
            assert_eq!(handler.page_counter(), expected_page);
            match handler.handle(DumpRequest::ReadPage { buf: &mut buf }).await {
                DumpResponse::Data { buf, len } => {
                    assert_eq!(len, TRANSFER);
                    // responses arrive in issue order: payload n matches page n
                    assert_eq!(buf[0], SimNandChip::byte_at(expected_page, 0));
                    assert_eq!(
                        buf[TRANSFER - 1],
                        SimNandChip::byte_at(expected_page, TRANSFER - 1)
                    );
                }
                _ => panic!("expected data"),
            }
        }
        assert_eq!(handler.page_counter(), 4);
    }

    #[tokio::test]
    async fn counter_set_and_reset() {
        let mut handler = configured_handler().await;
        let mut buf = [0u8; BUF_SIZE];

        match handler
            .handle::<&mut [u8; BUF_SIZE]>(DumpRequest::SetPageCounter { page: 0x11234 })
            .await
        {
            DumpResponse::Ack => {}
            _ => panic!("expected ack"),
        }
        assert_eq!(handler.page_counter(), 0x11234);

        match handler.handle(DumpRequest::ReadPage { buf: &mut buf }).await {
            DumpResponse::Data { .. } => {}
            _ => panic!("expected data"),
        }
        assert_eq!(handler.page_counter(), 0x11235);

        match handler
            .handle::<&mut [u8; BUF_SIZE]>(DumpRequest::ResetPageCounter)
            .await
        {
            DumpResponse::Ack => {}
            _ => panic!("expected ack"),
        }
        assert_eq!(handler.page_counter(), 0);
    }

    #[tokio::test]
    async fn counter_rejects_out_of_range_values() {
        let mut handler = configured_handler().await;
        match handler
            .handle::<&mut [u8; BUF_SIZE]>(DumpRequest::SetPageCounter {
                page: PAGE_ADDRESS_LIMIT,
            })
            .await
        {
            DumpResponse::Rejected(DumpError::PageOutOfRange) => {}
            _ => panic!("expected rejection"),
        }
        assert_eq!(handler.page_counter(), 0);
    }

    #[tokio::test]
    async fn read_past_last_page_is_rejected() {
        let mut handler = configured_handler().await;
        let mut buf = [0u8; BUF_SIZE];
        handler
            .handle::<&mut [u8; BUF_SIZE]>(DumpRequest::SetPageCounter {
                page: PAGE_ADDRESS_LIMIT - 1,
            })
            .await;
        match handler.handle(DumpRequest::ReadPage { buf: &mut buf }).await {
            DumpResponse::Data { .. } => {}
            _ => panic!("expected data"),
        }
        // the counter walked off the end of the row address range
        assert_eq!(handler.page_counter(), PAGE_ADDRESS_LIMIT);
        match handler.handle(DumpRequest::ReadPage { buf: &mut buf }).await {
            DumpResponse::Rejected(DumpError::PageOutOfRange) => {}
            _ => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn rereading_a_page_is_idempotent() {
        let mut handler = configured_handler().await;
        let mut first = [0u8; BUF_SIZE];
        let mut second = [0u8; BUF_SIZE];

        handler
            .handle::<&mut [u8; BUF_SIZE]>(DumpRequest::SetPageCounter { page: 42 })
            .await;
        handler.handle(DumpRequest::ReadPage { buf: &mut first }).await;

        handler
            .handle::<&mut [u8; BUF_SIZE]>(DumpRequest::ResetPageCounter)
            .await;
        handler
            .handle::<&mut [u8; BUF_SIZE]>(DumpRequest::SetPageCounter { page: 42 })
            .await;
        handler
            .handle(DumpRequest::ReadPage { buf: &mut second })
            .await;

        assert_eq!(first[..TRANSFER], second[..TRANSFER]);
    }

    #[tokio::test]
    async fn failed_read_reports_error_and_keeps_counter() {
        let mut handler = configured_handler().await;
        handler.driver.fail_reads = true;
        let mut buf = [0u8; BUF_SIZE];
        match handler.handle(DumpRequest::ReadPage { buf: &mut buf }).await {
            DumpResponse::ReadFailed { error, .. } => {
                assert_eq!(error, DumpError::ChipNotReady);
            }
            _ => panic!("expected read failure"),
        }
        assert_eq!(handler.page_counter(), 0);
    }

    #[tokio::test]
    async fn read_page_clears_stale_buffer_contents() {
        let mut handler = configured_handler().await;
        handler.driver.fail_reads = true;
        // a failed read must not leave previous payload bytes in the
        // transfer window
        let mut buf = [0xAAu8; BUF_SIZE];
        match handler.handle(DumpRequest::ReadPage { buf: &mut buf }).await {
            DumpResponse::ReadFailed { buf, .. } => {
                assert!(buf[..TRANSFER].iter().all(|&b| b == 0));
                // bytes beyond the transfer window are untouched
                assert_eq!(buf[TRANSFER], 0xAA);
            }
            _ => panic!("expected read failure"),
        }
    }

    #[tokio::test]
    async fn read_page_before_setup_is_rejected() {
        let mut handler = DumpHandler::new(SimNandChip::new());
        let mut buf = [0u8; BUF_SIZE];
        match handler.handle(DumpRequest::ReadPage { buf: &mut buf }).await {
            DumpResponse::Rejected(DumpError::NotConfigured) => {}
            _ => panic!("expected rejection"),
        }
    }
}
