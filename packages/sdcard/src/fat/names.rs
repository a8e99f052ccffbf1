use core::fmt;

use super::core::{FatError, SLOT_DELETED, SLOT_E5_ESCAPE};

const BASE_LEN: usize = 8;
const NAME_LEN: usize = 11;
const ILLEGAL: &[u8] = b"\"*+,/:;<=>?[\\]| ";

/// Space-padded, upper-cased 8.3 name as stored in a directory entry.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ShortName(pub(crate) [u8; NAME_LEN]);

impl ShortName {
    pub const BLANK: Self = Self([b' '; NAME_LEN]);
    pub(crate) const DOT: Self = Self(*b".          ");
    pub(crate) const DOT_DOT: Self = Self(*b"..         ");

    pub fn from_raw(raw: [u8; NAME_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    pub fn base(&self) -> &[u8] {
        trim_padding(&self.0[..BASE_LEN])
    }

    pub fn extension(&self) -> &[u8] {
        trim_padding(&self.0[BASE_LEN..])
    }

    /// `NAME.EXT` form, or just `NAME` when the extension is blank.
    pub fn display(&self) -> heapless::String<12> {
        let mut out = heapless::String::new();
        let mut push = |byte: u8| {
            let _ = out.push(if byte.is_ascii() { byte as char } else { '?' });
        };
        for (idx, &byte) in self.base().iter().enumerate() {
            push(if idx == 0 && byte == SLOT_E5_ESCAPE { SLOT_DELETED } else { byte });
        }
        if !self.extension().is_empty() {
            push(b'.');
            for &byte in self.extension() {
                push(byte);
            }
        }
        out
    }
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortName({})", self.display())
    }
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let len = field.iter().rposition(|b| *b != b' ').map_or(0, |idx| idx + 1);
    &field[..len]
}

/// Splits the first segment off `path` and converts it to an 8.3 name.
/// Returns the name and the unparsed remainder, which is either empty or
/// starts with '/'.
pub fn separate_dir_name(path: &[u8]) -> Result<(ShortName, &[u8]), FatError> {
    let path = path.strip_prefix(b"/").unwrap_or(path);
    let end = path.iter().position(|b| *b == b'/').unwrap_or(path.len());
    let (segment, rest) = path.split_at(end);
    if segment.is_empty() || segment == b"." || segment == b".." {
        return Err(FatError::InvalidName);
    }

    let mut name = [b' '; NAME_LEN];
    let mut write = 0usize;
    let mut in_extension = false;
    for &byte in segment {
        if byte == b'.' {
            if in_extension || write == 0 {
                return Err(FatError::InvalidName);
            }
            in_extension = true;
            write = BASE_LEN;
            continue;
        }
        let limit = if in_extension { NAME_LEN } else { BASE_LEN };
        if write >= limit || byte < 0x20 || byte == 0x7F || ILLEGAL.contains(&byte) {
            return Err(FatError::InvalidName);
        }
        name[write] = byte.to_ascii_uppercase();
        write += 1;
    }
    if name[0] == SLOT_DELETED {
        name[0] = SLOT_E5_ESCAPE;
    }
    Ok((ShortName(name), rest))
}

pub(crate) fn is_path_end(rest: &[u8]) -> bool {
    rest.iter().all(|b| *b == b'/')
}
