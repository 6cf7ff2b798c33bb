use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use static_cell::StaticCell;

use nandrip_core::dump::{DumpRequest, DumpResponse};

use crate::shared::constant::{
    CHANNEL_DUMP_REQUEST_N, CHANNEL_DUMP_RESPONSE_N, PAGE_BUFFER_SIZE,
};

/// Bulk page buffer handle. There is exactly one buffer in the system and
/// it travels inside the request/response messages, so only one request
/// can ever be in flight.
pub type PageBufHandle = &'static mut [u8; PAGE_BUFFER_SIZE];

/// Backing storage for the bulk page buffer, initialized once in `main`.
pub static PAGE_BUFFER: StaticCell<[u8; PAGE_BUFFER_SIZE]> = StaticCell::new();

/// Control core -> worker core request channel
pub static CHANNEL_DUMP_REQUEST: Channel<
    CriticalSectionRawMutex,
    DumpRequest<PageBufHandle>,
    CHANNEL_DUMP_REQUEST_N,
> = Channel::new();

/// Worker core -> control core response channel
pub static CHANNEL_DUMP_RESPONSE: Channel<
    CriticalSectionRawMutex,
    DumpResponse<PageBufHandle>,
    CHANNEL_DUMP_RESPONSE_N,
> = Channel::new();
