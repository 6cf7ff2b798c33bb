//! Host serial command grammar.
//!
//! One ASCII digit per command; `SetPageCounter` is followed by exactly
//! 3 raw little-endian argument bytes. Output framing is plain text, so
//! everything the console prints is built from these helpers.

use num_enum::TryFromPrimitive;

/// Raw argument bytes following the set-page command.
pub const PAGE_ARG_BYTES: usize = 3;

/// Help text printed for unrecognized input.
pub const HELP_TEXT: &str = "Commands:\n\
0: id - read and decode the NAND chip identification bytes\n\
1: read - read one page (data + spare) and advance the page counter\n\
2: reset page - reset the page counter to 0\n\
3: set page - set the page counter (3 raw bytes, little-endian, 17 bits)\n\
4: drive strength - show the configured pad drive strength\n\
5: flash info - show page size, spare size and total flash size\n\
else: help - show this text\n";

/// Single-byte host command, keyed by its ASCII digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HostCommand {
    ReadId = b'0',
    ReadPage = b'1',
    ResetPageCounter = b'2',
    SetPageCounter = b'3',
    DriveStrength = b'4',
    FlashInfo = b'5',
}

/// Assemble a 17-bit page number from the 3 argument bytes.
///
/// Byte 0 contributes bits 0-7, byte 1 bits 8-15, and only bit 0 of
/// byte 2 is significant (bit 16 of the row address).
pub fn page_number_from_bytes(bytes: [u8; PAGE_ARG_BYTES]) -> u32 {
    u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2] & 0x01) << 16)
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Render `src` as lowercase hex pairs into `dst`, returning the number of
/// bytes written. `dst` must hold at least `2 * src.len()` bytes.
pub fn encode_hex(src: &[u8], dst: &mut [u8]) -> usize {
    for (byte, pair) in src.iter().zip(dst.chunks_exact_mut(2)) {
        pair[0] = HEX_DIGITS[usize::from(byte >> 4)];
        pair[1] = HEX_DIGITS[usize::from(byte & 0x0F)];
    }
    src.len() * 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case([0x34, 0x12, 0x00], 0x1234)]
    #[case([0x34, 0x12, 0x01], 0x11234)]
    // only bit 0 of the third byte is significant
    #[case([0x34, 0x12, 0xFE], 0x1234)]
    #[case([0xFF, 0xFF, 0x01], (1 << 17) - 1)]
    #[case([0x00, 0x00, 0x00], 0)]
    fn page_number_assembly(#[case] bytes: [u8; 3], #[case] expect: u32) {
        assert_eq!(page_number_from_bytes(bytes), expect);
    }

    #[rstest]
    #[case(b'0', Some(HostCommand::ReadId))]
    #[case(b'1', Some(HostCommand::ReadPage))]
    #[case(b'2', Some(HostCommand::ResetPageCounter))]
    #[case(b'3', Some(HostCommand::SetPageCounter))]
    #[case(b'4', Some(HostCommand::DriveStrength))]
    #[case(b'5', Some(HostCommand::FlashInfo))]
    #[case(b'6', None)]
    #[case(b'\n', None)]
    #[case(b'x', None)]
    fn command_bytes(#[case] byte: u8, #[case] expect: Option<HostCommand>) {
        assert_eq!(HostCommand::try_from(byte).ok(), expect);
    }

    #[test]
    fn hex_encoding() {
        let mut out = [0u8; 16];
        let n = encode_hex(&[0x00, 0x9A, 0xFF], &mut out);
        assert_eq!(n, 6);
        assert_eq!(&out[..6], b"009aff");
    }
}
