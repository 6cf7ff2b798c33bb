use bit_field::BitField;
use core::fmt;

/// ID read bytes
pub const ID_READ_BYTES: usize = 5;

/// Maker code for Toshiba / Kioxia, the only supported chip family.
pub const MAKER_TOSHIBA: u8 = 0x98;

/// Pages per block for the supported family.
pub const PAGES_PER_BLOCK: usize = 64;
/// Blocks per chip for the supported family.
pub const BLOCKS_PER_CHIP: usize = 2048;

// Bit ranges inside the ID bytes, per the vendor ID table.
//
// | Byte | Field                  | Bits |
// | ---- | ---------------------- | ---- |
// | 2    | internal chip count    | 1:0  |
// | 2    | cell level type        | 3:2  |
// | 3    | page size code         | 1:0  |
// | 3    | block size code        | 5:4  |
// | 3    | bus width (0 = x8)     | 6    |
// | 4    | district count         | 3:2  |
const CHIP_COUNT_BITS: core::ops::Range<usize> = 0..2;
const CELL_LEVEL_BITS: core::ops::Range<usize> = 2..4;
const PAGE_SIZE_BITS: core::ops::Range<usize> = 0..2;
const BLOCK_SIZE_BITS: core::ops::Range<usize> = 4..6;
const BUS_WIDTH_BIT: usize = 6;
const DISTRICT_BITS: core::ops::Range<usize> = 2..4;

// Page size codes recognized for the supported maker.
const PAGE_SIZE_CODE_2K: u8 = 0b01;
const PAGE_SIZE_CODE_4K: u8 = 0b10;

/// Raw identification bytes returned by the 0x90 identify command.
///
/// | Byte | Description                  |
/// | ---- | ---------------------------- |
/// | 0    | Maker Code                   |
/// | 1    | Device Code                  |
/// | 2    | Chip Number, Cell Type       |
/// | 3    | Page Size, Block Size, Width |
/// | 4    | District Number              |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdBytes {
    pub raw: [u8; ID_READ_BYTES],
}

/// Flash geometry derived from the ID bytes.
///
/// Only populated for recognized maker/page-size combinations; everything
/// else stays `None` so an unknown chip can never dump with a guessed
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashGeometry {
    /// Page size in bytes
    pub page_size: usize,
    /// Out-of-band (spare) area size in bytes
    pub spare_size: usize,
    /// Total flash size in bytes, spare included
    pub total_size: usize,
}

impl FlashGeometry {
    /// Bytes moved by one whole-page read (page + spare, one transfer).
    pub fn transfer_size(&self) -> usize {
        self.page_size + self.spare_size
    }
}

impl IdBytes {
    pub fn new(raw: [u8; ID_READ_BYTES]) -> Self {
        Self { raw }
    }

    /// Build from the head of a read buffer.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut raw = [0u8; ID_READ_BYTES];
        raw.copy_from_slice(&data[..ID_READ_BYTES]);
        Self { raw }
    }

    pub fn maker(&self) -> u8 {
        self.raw[0]
    }

    pub fn device(&self) -> u8 {
        self.raw[1]
    }

    /// Internal chip count (1, 2, 4 or 8).
    pub fn chip_count(&self) -> u8 {
        1 << self.raw[2].get_bits(CHIP_COUNT_BITS)
    }

    /// Cell levels (2 = SLC).
    pub fn cell_levels(&self) -> u8 {
        2 << self.raw[2].get_bits(CELL_LEVEL_BITS)
    }

    /// Block size in KiB (64 KiB << code).
    pub fn block_size_kib(&self) -> u32 {
        64 << self.raw[3].get_bits(BLOCK_SIZE_BITS)
    }

    /// District (plane) count.
    pub fn district_count(&self) -> u8 {
        1 << self.raw[4].get_bits(DISTRICT_BITS)
    }

    /// Only the 8-bit-wide organization is supported.
    pub fn is_eight_bit_bus(&self) -> bool {
        !self.raw[3].get_bit(BUS_WIDTH_BIT)
    }

    /// Decode the flash geometry.
    ///
    /// Pure function: recognizes exactly one maker and two page-size codes,
    /// and returns `None` for anything else rather than defaulting.
    pub fn geometry(&self) -> Option<FlashGeometry> {
        if self.maker() != MAKER_TOSHIBA {
            return None;
        }
        let (page_size, spare_size) = match self.raw[3].get_bits(PAGE_SIZE_BITS) {
            PAGE_SIZE_CODE_2K => (2048, 128),
            PAGE_SIZE_CODE_4K => (4096, 256),
            _ => return None,
        };
        Some(FlashGeometry {
            page_size,
            spare_size,
            total_size: PAGES_PER_BLOCK * BLOCKS_PER_CHIP * (page_size + spare_size),
        })
    }

    /// Presentational decode for the host console. No protocol side effects.
    pub fn summary(&self) -> IdSummary {
        IdSummary { id: *self }
    }
}

/// Human-readable rendering of the ID bytes.
#[derive(Debug, Clone, Copy)]
pub struct IdSummary {
    id: IdBytes,
}

fn maker_name(maker: u8) -> &'static str {
    match maker {
        MAKER_TOSHIBA => "Toshiba/Kioxia",
        _ => "unknown",
    }
}

impl fmt::Display for IdSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.id;
        writeln!(
            f,
            "Maker: {} (0x{:02X})",
            maker_name(id.maker()),
            id.maker()
        )?;
        writeln!(f, "Device code: 0x{:02X}", id.device())?;
        writeln!(
            f,
            "Chips: {}, cell levels: {}",
            id.chip_count(),
            id.cell_levels()
        )?;
        match id.geometry() {
            Some(geometry) => writeln!(
                f,
                "Page size: {} (+{} spare), block size: {}K",
                geometry.page_size,
                geometry.spare_size,
                id.block_size_kib()
            )?,
            None => writeln!(f, "Page size: unrecognized")?,
        }
        writeln!(
            f,
            "Bus width: {}",
            if id.is_eight_bit_bus() { "x8" } else { "x16" }
        )?;
        write!(f, "Districts: {}", id.district_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // The chip the original hardware shipped with.
    const ID_TC58DVM9: [u8; 5] = [0x98, 0xDC, 0x90, 0x26, 0x76];

    #[rstest]
    #[case([0x98, 0xDC, 0x90, 0x26, 0x76], Some((4096, 256)))]
    #[case([0x98, 0xF1, 0x80, 0x15, 0x72], Some((2048, 128)))]
    // wrong maker, valid page-size code
    #[case([0xEC, 0xDC, 0x90, 0x26, 0x76], None)]
    // page-size code 0b00 and 0b11 are not recognized
    #[case([0x98, 0xDC, 0x90, 0x24, 0x76], None)]
    #[case([0x98, 0xDC, 0x90, 0x27, 0x76], None)]
    fn geometry_decode(#[case] raw: [u8; 5], #[case] expect: Option<(usize, usize)>) {
        let geometry = IdBytes::new(raw).geometry();
        match expect {
            Some((page, spare)) => {
                let geometry = geometry.unwrap();
                assert_eq!(geometry.page_size, page);
                assert_eq!(geometry.spare_size, spare);
                assert_eq!(
                    geometry.total_size,
                    PAGES_PER_BLOCK * BLOCKS_PER_CHIP * (page + spare)
                );
            }
            None => assert!(geometry.is_none()),
        }
    }

    #[test]
    fn geometry_total_size_for_4k_chip() {
        let geometry = IdBytes::new(ID_TC58DVM9).geometry().unwrap();
        assert_eq!(geometry.transfer_size(), 4352);
        assert_eq!(geometry.total_size, 64 * 2048 * 4352);
        assert_eq!(geometry.total_size, 570_425_344);
    }

    #[rstest]
    #[case(0x26, true)]
    #[case(0x15, true)]
    // bit 6 set means x16 organization
    #[case(0x66, false)]
    fn bus_width(#[case] byte3: u8, #[case] eight_bit: bool) {
        let id = IdBytes::new([0x98, 0xDC, 0x90, byte3, 0x76]);
        assert_eq!(id.is_eight_bit_bus(), eight_bit);
    }

    #[test]
    fn summary_fields() {
        let id = IdBytes::new(ID_TC58DVM9);
        assert_eq!(id.chip_count(), 1);
        assert_eq!(id.cell_levels(), 2);
        assert_eq!(id.block_size_kib(), 256);
        assert_eq!(id.district_count(), 2);

        let text = format!("{}", id.summary());
        assert!(text.contains("Toshiba/Kioxia"));
        assert!(text.contains("0xDC"));
        assert!(text.contains("4096"));
        assert!(text.contains("x8"));
    }

    #[test]
    fn from_slice_takes_leading_bytes() {
        let mut buf = [0u8; 16];
        buf[..5].copy_from_slice(&ID_TC58DVM9);
        assert_eq!(IdBytes::from_slice(&buf), IdBytes::new(ID_TC58DVM9));
    }
}
