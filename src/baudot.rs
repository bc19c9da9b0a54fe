//! ITA2 / US-TTY translation between ASCII and 5-bit line codes.
//!
//! A 5-bit code only addresses 32 positions, so the character set is split
//! into a letters page and a figures page selected by the LTRS (0x1F) and
//! FIGS (0x1B) control codes. The page in force is tracked independently for
//! each direction of the link: the machine at the far end keeps its own
//! notion of the current page, so the encoder's shift state and the
//! decoder's shift state can legitimately differ.
//!
//! Tables are stored as two 32-byte arrays indexed by line code; entry 0
//! means "no mapping" (the all-zeros code is blank/null on the wire and is
//! never produced by translation). The shift positions themselves (0x1B and
//! 0x1F) are zero in both pages.

/// LTRS page select code.
pub const LTRS: u8 = 0x1F;
/// FIGS page select code.
pub const FIGS: u8 = 0x1B;

const TABLE_LEN: usize = 32;

/// Which character page a side of the link is on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shift {
    Ltrs,
    Figs,
}

/// One translation table: a letters page and a figures page.
///
/// Stored in the config area as 64 contiguous bytes (letters then figures),
/// which is also the layout accepted by [`TranslationTable::from_bytes`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TranslationTable {
    pub letters: [u8; TABLE_LEN],
    pub figures: [u8; TABLE_LEN],
}

impl TranslationTable {
    /// The standard US-TTY assignment, used for table slot 0 and as the
    /// power-on default before the config store is read.
    pub const CANONICAL: TranslationTable = TranslationTable {
        letters: [
            0, b'E', 0x0A, b'A', b' ', b'S', b'I', b'U', //
            0x0D, b'D', b'R', b'J', b'N', b'F', b'C', b'K', //
            b'T', b'Z', b'L', b'W', b'H', b'Y', b'P', b'Q', //
            b'O', b'B', b'G', 0, b'M', b'X', b'V', 0,
        ],
        figures: [
            0, b'3', 0x0A, b'-', b' ', b'\'', b'8', b'7', //
            0x0D, 0x05, b'4', 0x07, b',', b'$', b':', b'(', //
            b'5', b'+', b')', b'2', b'#', b'6', b'0', b'1', //
            b'9', b'?', b'&', 0, b'.', b'/', b'=', 0,
        ],
    };

    /// Rebuild a table from its 64-byte stored form.
    pub fn from_bytes(bytes: &[u8; 2 * TABLE_LEN]) -> Self {
        let mut table = TranslationTable {
            letters: [0; TABLE_LEN],
            figures: [0; TABLE_LEN],
        };
        table.letters.copy_from_slice(&bytes[..TABLE_LEN]);
        table.figures.copy_from_slice(&bytes[TABLE_LEN..]);
        table
    }

    /// Flatten to the 64-byte stored form.
    pub fn to_bytes(&self) -> [u8; 2 * TABLE_LEN] {
        let mut bytes = [0; 2 * TABLE_LEN];
        bytes[..TABLE_LEN].copy_from_slice(&self.letters);
        bytes[TABLE_LEN..].copy_from_slice(&self.figures);
        bytes
    }

    /// ASCII value for a line code on the given page, 0 if unmapped.
    pub fn lookup(&self, shift: Shift, code: u8) -> u8 {
        let page = match shift {
            Shift::Ltrs => &self.letters,
            Shift::Figs => &self.figures,
        };
        page[(code & 0x1F) as usize]
    }

    fn find(page: &[u8; TABLE_LEN], ascii: u8) -> Option<u8> {
        if ascii == 0 {
            return None;
        }
        page.iter().position(|&entry| entry == ascii).map(|i| i as u8)
    }
}

/// Result of encoding one ASCII character.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Encoded {
    /// Reachable on the current page; send the code as-is.
    Code(u8),
    /// On the other page; send the shift code first, then the character.
    Shifted { shift: u8, code: u8 },
    /// Not in either page. The character is dropped.
    Unmapped,
}

/// Stateful ASCII/Baudot translator.
///
/// Owns the active table plus the send-side and receive-side shift pages.
/// Shift handling is strictly mechanical here: unshift-on-space and other
/// policies are layered on top by the caller.
pub struct BaudotCodec {
    table: TranslationTable,
    send_shift: Shift,
    recv_shift: Shift,
}

impl BaudotCodec {
    pub const fn new() -> Self {
        Self {
            table: TranslationTable::CANONICAL,
            send_shift: Shift::Ltrs,
            recv_shift: Shift::Ltrs,
        }
    }

    /// Swap in a different translation table. Shift states are kept; the
    /// far-end machine did not change pages just because our table did.
    pub fn set_table(&mut self, table: TranslationTable) {
        self.table = table;
    }

    pub fn table(&self) -> &TranslationTable {
        &self.table
    }

    pub fn send_shift(&self) -> Shift {
        self.send_shift
    }

    pub fn recv_shift(&self) -> Shift {
        self.recv_shift
    }

    /// Force the send-side page, for callers that put a shift code on the
    /// wire themselves.
    pub fn set_send_shift(&mut self, shift: Shift) {
        self.send_shift = shift;
    }

    /// Return the send side to the letters page (unshift-on-space).
    pub fn unshift_send(&mut self) {
        self.send_shift = Shift::Ltrs;
    }

    /// Return the receive side to the letters page (unshift-on-space).
    pub fn unshift_recv(&mut self) {
        self.recv_shift = Shift::Ltrs;
    }

    /// Encode one ASCII character against the current send page.
    ///
    /// Lowercase folds to uppercase first. The current page is searched
    /// before the other one, so characters present on both pages (space,
    /// CR, LF) never cause a shift. A [`Encoded::Shifted`] result has
    /// already updated the send page to the new one.
    pub fn encode(&mut self, ascii: u8) -> Encoded {
        let ascii = ascii.to_ascii_uppercase();
        let (current, other, shift_code, shift) = match self.send_shift {
            Shift::Ltrs => (&self.table.letters, &self.table.figures, FIGS, Shift::Figs),
            Shift::Figs => (&self.table.figures, &self.table.letters, LTRS, Shift::Ltrs),
        };
        if let Some(code) = TranslationTable::find(current, ascii) {
            return Encoded::Code(code);
        }
        if let Some(code) = TranslationTable::find(other, ascii) {
            self.send_shift = shift;
            return Encoded::Shifted { shift: shift_code, code };
        }
        Encoded::Unmapped
    }

    /// Decode one line code against the current receive page.
    ///
    /// Shift codes update the page and yield nothing; unmapped positions
    /// (including blank) yield nothing.
    pub fn decode(&mut self, code: u8) -> Option<u8> {
        match code & 0x1F {
            LTRS => {
                self.recv_shift = Shift::Ltrs;
                None
            }
            FIGS => {
                self.recv_shift = Shift::Figs;
                None
            }
            code => {
                let ascii = self.table.lookup(self.recv_shift, code);
                if ascii == 0 {
                    None
                } else {
                    Some(ascii)
                }
            }
        }
    }
}

impl Default for BaudotCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_on_current_page() {
        let mut codec = BaudotCodec::new();
        assert_eq!(codec.encode(b'A'), Encoded::Code(0x03));
        assert_eq!(codec.encode(b'E'), Encoded::Code(0x01));
        assert_eq!(codec.send_shift(), Shift::Ltrs);
    }

    #[test]
    fn test_encode_shifts_to_figures_and_back() {
        let mut codec = BaudotCodec::new();
        assert_eq!(codec.encode(b'3'), Encoded::Shifted { shift: FIGS, code: 0x01 });
        assert_eq!(codec.send_shift(), Shift::Figs);
        // now on the figures page, digits go straight through
        assert_eq!(codec.encode(b'4'), Encoded::Code(0x0A));
        assert_eq!(codec.encode(b'A'), Encoded::Shifted { shift: LTRS, code: 0x03 });
        assert_eq!(codec.send_shift(), Shift::Ltrs);
    }

    #[test]
    fn test_space_never_shifts() {
        let mut codec = BaudotCodec::new();
        codec.set_send_shift(Shift::Figs);
        assert_eq!(codec.encode(b' '), Encoded::Code(0x04));
        assert_eq!(codec.send_shift(), Shift::Figs);
        assert_eq!(codec.encode(b'\r'), Encoded::Code(0x08));
        assert_eq!(codec.encode(b'\n'), Encoded::Code(0x02));
        assert_eq!(codec.send_shift(), Shift::Figs);
    }

    #[test]
    fn test_lowercase_folds() {
        let mut codec = BaudotCodec::new();
        assert_eq!(codec.encode(b'a'), codec.encode(b'A'));
    }

    #[test]
    fn test_unmapped_character() {
        let mut codec = BaudotCodec::new();
        assert_eq!(codec.encode(b'~'), Encoded::Unmapped);
        assert_eq!(codec.encode(0), Encoded::Unmapped);
        assert_eq!(codec.send_shift(), Shift::Ltrs);
    }

    #[test]
    fn test_decode_follows_shift_codes() {
        let mut codec = BaudotCodec::new();
        assert_eq!(codec.decode(0x03), Some(b'A'));
        assert_eq!(codec.decode(FIGS), None);
        assert_eq!(codec.recv_shift(), Shift::Figs);
        assert_eq!(codec.decode(0x03), Some(b'-'));
        assert_eq!(codec.decode(LTRS), None);
        assert_eq!(codec.decode(0x03), Some(b'A'));
    }

    #[test]
    fn test_decode_blank_is_silent() {
        let mut codec = BaudotCodec::new();
        assert_eq!(codec.decode(0x00), None);
        codec.decode(FIGS);
        assert_eq!(codec.decode(0x00), None);
    }

    #[test]
    fn test_decode_masks_high_bits() {
        let mut codec = BaudotCodec::new();
        assert_eq!(codec.decode(0x83), Some(b'A'));
    }

    #[test]
    fn test_us_tty_figures_page() {
        let table = TranslationTable::CANONICAL;
        assert_eq!(table.lookup(Shift::Figs, 0x09), 0x05); // WRU on D
        assert_eq!(table.lookup(Shift::Figs, 0x0B), 0x07); // bell on J
        assert_eq!(table.lookup(Shift::Figs, 0x0D), b'$');
        assert_eq!(table.lookup(Shift::Figs, 0x14), b'#');
        assert_eq!(table.lookup(Shift::Ltrs, 0x1B), 0);
        assert_eq!(table.lookup(Shift::Ltrs, 0x1F), 0);
    }

    #[test]
    fn test_table_byte_form_round_trip() {
        let bytes = TranslationTable::CANONICAL.to_bytes();
        assert_eq!(bytes[1], b'E');
        assert_eq!(bytes[32 + 1], b'3');
        assert_eq!(TranslationTable::from_bytes(&bytes), TranslationTable::CANONICAL);
    }
}
