mod core;
mod crc;
mod helpers;
mod init;
mod io;
#[cfg(test)]
pub(crate) mod sim;
#[cfg(test)]
mod tests;

pub use self::core::{
    AlwaysPresent, CardDetect, CardId, CardInfo, CardVersion, DetectActiveLow, SdCard, SdError,
    SECTOR_SIZE,
};
pub use crc::{crc16, crc7};
pub use helpers::{decode_capacity_bytes, decode_cid};
