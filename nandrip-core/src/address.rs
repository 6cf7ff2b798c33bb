//! Row/column address packing.
//!
//! Read/ID operations address the array with 5 address cycles:
//!
//! |              | IO7  | IO6  | IO5  | IO4  | IO3  | IO2  | IO1  | IO0  |
//! | ------------ | ---  | ---  | ---  | ---  | ---  | ---  | ---  | ---  |
//! | First Cycle  | CA7  | CA6  | CA5  | CA4  | CA3  | CA2  | CA1  | CA0  |
//! | Second Cycle | -    | -    | -    | CA12 | CA11 | CA10 | CA9  | CA8  |
//! | Third Cycle  | PA7  | PA6  | PA5  | PA4  | PA3  | PA2  | PA1  | PA0  |
//! | Fourth Cycle | PA15 | PA14 | PA13 | PA12 | PA11 | PA10 | PA9  | PA8  |
//! | Fifth Cycle  | -    | -    | -    | -    | -    | -    | -    | PA16 |
//!
//! CAx: column address (byte within the page), PAx: page (row) address.

/// Address cycles for a full row+column address.
pub const ADDRESS_CYCLES: usize = 5;

/// The row address is 17 bits wide; page numbers must stay below this.
pub const PAGE_ADDRESS_LIMIT: u32 = 1 << 17;

/// Valid bits of the second column cycle.
pub const COLUMN_HIGH_MASK: u8 = 0x1F;
/// Valid bits of the fifth (row-high) cycle.
pub const PAGE_HIGH_MASK: u8 = 0x01;

/// Pack a page number and column offset into the 5 address cycles.
///
/// Callers must range-check the page number against [`PAGE_ADDRESS_LIMIT`]
/// first; bits beyond the cycle layout are masked off here.
pub fn address_cycles(page: u32, column: u16) -> [u8; ADDRESS_CYCLES] {
    [
        column as u8,
        ((column >> 8) as u8) & COLUMN_HIGH_MASK,
        page as u8,
        (page >> 8) as u8,
        ((page >> 16) as u8) & PAGE_HIGH_MASK,
    ]
}

/// Address cycles for a whole-page read: the column is always 0, the chip
/// auto-increments it on every read-enable falling edge.
pub fn page_address_cycles(page: u32) -> [u8; ADDRESS_CYCLES] {
    address_cycles(page, 0)
}
