//! ASCII command console over USB CDC-ACM.
//!
//! One command per received byte; responses are plain text. The page
//! payload for the read command is streamed as exactly `2 * len` hex
//! characters with no framing, because the host reads a fixed count.

use core::fmt::Write as _;

use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::channel::{DynamicReceiver, DynamicSender};
use embassy_time::with_timeout;
use embassy_usb::class::cdc_acm::{Receiver, Sender};
use embassy_usb::driver::EndpointError;

use nandrip_core::dump::{DumpRequest, DumpResponse};
use nandrip_core::host::{
    encode_hex, page_number_from_bytes, HostCommand, HELP_TEXT, PAGE_ARG_BYTES,
};
use nandrip_core::id::{FlashGeometry, IdBytes};

use crate::shared::constant::{NAND_PAD_DRIVE, SET_PAGE_ARG_TIMEOUT, USB_MAX_PACKET_SIZE};
use crate::shared::resource::PageBufHandle;

/// Source bytes per hex output packet (2 hex chars per byte).
const HEX_CHUNK_BYTES: usize = USB_MAX_PACKET_SIZE as usize / 2;

/// The host closed the port or the bus was reset. The console drops its
/// in-progress command and waits for the next connection.
pub struct Disconnected;

impl From<EndpointError> for Disconnected {
    fn from(err: EndpointError) -> Self {
        match err {
            EndpointError::BufferOverflow => defmt::panic!("Buffer overflow"),
            EndpointError::Disabled => Disconnected,
        }
    }
}

pub struct Console<'d, 'ch> {
    tx: Sender<'d, Driver<'static, USB>>,
    rx: Receiver<'d, Driver<'static, USB>>,
    req_sender: DynamicSender<'ch, DumpRequest<PageBufHandle>>,
    resp_receiver: DynamicReceiver<'ch, DumpResponse<PageBufHandle>>,
    /// Bulk buffer while the console owns it. `None` only between sending
    /// a buffered request and receiving its response.
    page_buf: Option<PageBufHandle>,
    geometry: FlashGeometry,
    /// Receive-side packet buffer; commands are single bytes but packets
    /// may carry several.
    rx_buf: [u8; USB_MAX_PACKET_SIZE as usize],
    rx_pos: usize,
    rx_len: usize,
    /// Mirror of the worker's page counter, for logging only.
    current_page: u32,
}

impl<'d, 'ch> Console<'d, 'ch> {
    pub fn new(
        tx: Sender<'d, Driver<'static, USB>>,
        rx: Receiver<'d, Driver<'static, USB>>,
        req_sender: DynamicSender<'ch, DumpRequest<PageBufHandle>>,
        resp_receiver: DynamicReceiver<'ch, DumpResponse<PageBufHandle>>,
        page_buf: PageBufHandle,
        geometry: FlashGeometry,
    ) -> Self {
        Self {
            tx,
            rx,
            req_sender,
            resp_receiver,
            page_buf: Some(page_buf),
            geometry,
            rx_buf: [0; USB_MAX_PACKET_SIZE as usize],
            rx_pos: 0,
            rx_len: 0,
            current_page: 0,
        }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.rx.wait_connection().await;
            defmt::info!("Console connected");
            // stale input from before the connection is meaningless
            self.rx_pos = 0;
            self.rx_len = 0;
            while let Ok(()) = self.handle_one().await {}
            defmt::info!("Console disconnected");
        }
    }

    async fn handle_one(&mut self) -> Result<(), Disconnected> {
        let byte = self.read_byte().await?;
        match HostCommand::try_from(byte) {
            Ok(HostCommand::ReadId) => self.cmd_read_id().await,
            Ok(HostCommand::ReadPage) => self.cmd_read_page().await,
            Ok(HostCommand::ResetPageCounter) => self.cmd_reset_page_counter().await,
            Ok(HostCommand::SetPageCounter) => self.cmd_set_page_counter().await,
            Ok(HostCommand::DriveStrength) => self.cmd_drive_strength().await,
            Ok(HostCommand::FlashInfo) => self.cmd_flash_info().await,
            Err(_) => self.write_all(HELP_TEXT.as_bytes()).await,
        }
    }

    /// Next byte from the host, buffering whole packets.
    async fn read_byte(&mut self) -> Result<u8, Disconnected> {
        while self.rx_pos >= self.rx_len {
            // zero-length packets are legal, keep waiting
            let n = self.rx.read_packet(&mut self.rx_buf).await?;
            self.rx_pos = 0;
            self.rx_len = n;
        }
        let byte = self.rx_buf[self.rx_pos];
        self.rx_pos += 1;
        Ok(byte)
    }

    async fn write_all(&mut self, mut data: &[u8]) -> Result<(), Disconnected> {
        while !data.is_empty() {
            let n = data.len().min(USB_MAX_PACKET_SIZE as usize);
            self.tx.write_packet(&data[..n]).await?;
            data = &data[n..];
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), Disconnected> {
        self.write_all(line.as_bytes()).await
    }

    /// Hand the bulk buffer to the worker inside `request` and wait for
    /// the response carrying it back.
    async fn round_trip(
        &mut self,
        request: DumpRequest<PageBufHandle>,
    ) -> DumpResponse<PageBufHandle> {
        self.req_sender.send(request).await;
        self.resp_receiver.receive().await
    }

    async fn cmd_read_id(&mut self) -> Result<(), Disconnected> {
        let buf = defmt::unwrap!(self.page_buf.take());
        match self.round_trip(DumpRequest::ReadId { buf }).await {
            DumpResponse::Data { buf, len } => {
                let id = IdBytes::from_slice(&buf[..len]);
                self.page_buf = Some(buf);

                let mut line: heapless::String<64> = heapless::String::new();
                let _ = write!(line, "ID:");
                for byte in id.raw {
                    let _ = write!(line, " {:02x}", byte);
                }
                let _ = writeln!(line);
                self.write_line(&line).await?;

                let mut summary: heapless::String<256> = heapless::String::new();
                let _ = writeln!(summary, "{}", id.summary());
                self.write_line(&summary).await
            }
            DumpResponse::ReadFailed { buf, error } => {
                self.page_buf = Some(buf);
                let mut line: heapless::String<64> = heapless::String::new();
                let _ = writeln!(line, "Error reading ID: {}", error);
                self.write_line(&line).await
            }
            resp => self.unexpected(resp).await,
        }
    }

    async fn cmd_read_page(&mut self) -> Result<(), Disconnected> {
        let buf = defmt::unwrap!(self.page_buf.take());
        match self.round_trip(DumpRequest::ReadPage { buf }).await {
            DumpResponse::Data { buf, len } => {
                // the handle goes back before any fallible write; a
                // disconnect mid-stream must not lose the buffer
                self.page_buf = Some(buf);
                self.current_page += 1;

                // exactly len * 2 hex chars, nothing else; the host reads
                // a fixed count
                let payload = defmt::unwrap!(self.page_buf.as_deref());
                let mut hex = [0u8; USB_MAX_PACKET_SIZE as usize];
                for chunk in payload[..len].chunks(HEX_CHUNK_BYTES) {
                    let n = encode_hex(chunk, &mut hex);
                    self.tx.write_packet(&hex[..n]).await?;
                }
                defmt::debug!("Read page done, next page {}", self.current_page);
                Ok(())
            }
            DumpResponse::ReadFailed { buf, error } => {
                self.page_buf = Some(buf);
                let mut line: heapless::String<64> = heapless::String::new();
                let _ = writeln!(line, "Error reading page: {}", error);
                self.write_line(&line).await
            }
            DumpResponse::Rejected(error) => {
                let mut line: heapless::String<64> = heapless::String::new();
                let _ = writeln!(line, "Error reading page: {}", error);
                self.write_line(&line).await
            }
            resp => self.unexpected(resp).await,
        }
    }

    async fn cmd_reset_page_counter(&mut self) -> Result<(), Disconnected> {
        match self.round_trip(DumpRequest::ResetPageCounter).await {
            DumpResponse::Ack => {
                self.current_page = 0;
                Ok(())
            }
            resp => self.unexpected(resp).await,
        }
    }

    async fn cmd_set_page_counter(&mut self) -> Result<(), Disconnected> {
        let mut arg = [0u8; PAGE_ARG_BYTES];
        for byte in arg.iter_mut() {
            match with_timeout(SET_PAGE_ARG_TIMEOUT, self.read_byte()).await {
                Ok(read) => *byte = read?,
                Err(_) => {
                    return self.write_line("Timed out reading page number\n").await;
                }
            }
        }
        let page = page_number_from_bytes(arg);
        match self.round_trip(DumpRequest::SetPageCounter { page }).await {
            DumpResponse::Ack => {
                self.current_page = page;
                Ok(())
            }
            DumpResponse::Rejected(error) => {
                let mut line: heapless::String<64> = heapless::String::new();
                let _ = writeln!(line, "Error setting page: {}", error);
                self.write_line(&line).await
            }
            resp => self.unexpected(resp).await,
        }
    }

    async fn cmd_drive_strength(&mut self) -> Result<(), Disconnected> {
        // the HAL exposes no pad-register getter; report the value the
        // pads were configured with at setup
        let label = match NAND_PAD_DRIVE {
            embassy_rp::gpio::Drive::_2mA => "2mA",
            embassy_rp::gpio::Drive::_4mA => "4mA",
            embassy_rp::gpio::Drive::_8mA => "8mA",
            embassy_rp::gpio::Drive::_12mA => "12mA",
        };
        let mut line: heapless::String<64> = heapless::String::new();
        let _ = writeln!(line, "Drive strength is {}", label);
        self.write_line(&line).await
    }

    async fn cmd_flash_info(&mut self) -> Result<(), Disconnected> {
        let mut line: heapless::String<64> = heapless::String::new();
        let _ = write!(
            line,
            "{},{},{}",
            self.geometry.page_size, self.geometry.spare_size, self.geometry.total_size
        );
        self.write_line(&line).await
    }

    /// Response kinds that cannot answer the request we sent. The channel
    /// pairs one response to one request, so this is a protocol bug.
    async fn unexpected(
        &mut self,
        resp: DumpResponse<PageBufHandle>,
    ) -> Result<(), Disconnected> {
        if let DumpResponse::Data { buf, .. } | DumpResponse::ReadFailed { buf, .. } = resp {
            self.page_buf = Some(buf);
        }
        defmt::error!("Unexpected dump response");
        self.write_line("Internal error\n").await
    }
}
