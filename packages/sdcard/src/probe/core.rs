use embedded_hal::digital::{self, InputPin};
use embedded_hal::spi;

use crate::clock::Clock;
use crate::config::SdConfig;

pub(super) const SD_CMD0: u8 = 0;
pub(super) const SD_CMD8: u8 = 8;
pub(super) const SD_CMD9: u8 = 9;
pub(super) const SD_CMD10: u8 = 10;
pub(super) const SD_CMD13: u8 = 13;
pub(super) const SD_CMD16: u8 = 16;
pub(super) const SD_CMD17: u8 = 17;
pub(super) const SD_CMD24: u8 = 24;
pub(super) const SD_CMD55: u8 = 55;
pub(super) const SD_ACMD41: u8 = 41;
pub(super) const SD_CMD58: u8 = 58;

pub(super) const R1_IDLE_STATE: u8 = 0x01;
pub(super) const R1_ILLEGAL_COMMAND: u8 = 0x04;
pub(super) const R1_BAD_RESPONSE: u8 = 0x80;

pub(super) const DATA_START_TOKEN: u8 = 0xFE;
pub(super) const DATA_RESPONSE_MASK: u8 = 0x1F;
pub(super) const DATA_RESPONSE_ACCEPTED: u8 = 0x05;
pub(super) const DATA_RESPONSE_CRC_ERR: u8 = 0x0B;
pub(super) const DATA_RESPONSE_WRITE_ERR: u8 = 0x0D;

pub(super) const IF_COND_CHECK_PATTERN: u32 = 0x0000_01AA;
pub(super) const OCR_HCS: u32 = 0x4000_0000;
pub(super) const POWER_UP_IDLE_BYTES: usize = 15;
pub(super) const WRITE_GAP_BYTES: usize = 20;

pub const SECTOR_SIZE: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardVersion {
    /// Physical layer 1.x, rejects the interface-condition command.
    V1,
    V2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardInfo {
    pub version: CardVersion,
    pub high_capacity: bool,
    pub capacity_bytes: u64,
    pub cid: [u8; 16],
    pub csd: [u8; 16],
}

impl CardInfo {
    pub fn card_id(&self) -> CardId {
        super::helpers::decode_cid(&self.cid)
    }

    pub fn sector_count(&self) -> u64 {
        self.capacity_bytes / SECTOR_SIZE as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardId {
    pub manufacturer_id: u8,
    pub oem_id: [u8; 2],
    pub product_name: [u8; 5],
    pub revision_major: u8,
    pub revision_minor: u8,
    pub serial: u32,
    pub manufactured_year: u16,
    pub manufactured_month: u8,
}

impl CardId {
    pub fn product_name_str(&self) -> &str {
        core::str::from_utf8(&self.product_name).unwrap_or("?????")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdError {
    NoCard,
    ResetTimeout,
    InitTimeout,
    BadResponse,
    BadVoltageRange,
    NoSdCard,
    Timeout,
    CrcData,
    WriteData,
    ReadData,
    SetBlocklenFailed,
    NotInitialized,
    Bus(spi::ErrorKind),
    Pin(digital::ErrorKind),
    Unknown,
}

pub trait CardDetect {
    fn card_present(&mut self) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysPresent;

impl CardDetect for AlwaysPresent {
    fn card_present(&mut self) -> bool {
        true
    }
}

/// Socket switch that pulls the line low while a card is inserted.
pub struct DetectActiveLow<P>(pub P);

impl<P: InputPin> CardDetect for DetectActiveLow<P> {
    fn card_present(&mut self) -> bool {
        self.0.is_low().unwrap_or(false)
    }
}

pub struct SdCard<SPI, CS, C, D = AlwaysPresent> {
    pub(super) spi: SPI,
    pub(super) cs: CS,
    pub(super) clock: C,
    pub(super) detect: D,
    pub(super) config: SdConfig,
    pub(super) info: Option<CardInfo>,
}

impl<SPI, CS, C> SdCard<SPI, CS, C, AlwaysPresent>
where
    SPI: spi::SpiBus<u8>,
    CS: digital::OutputPin,
    C: Clock,
{
    pub fn new(spi: SPI, cs: CS, clock: C, config: SdConfig) -> Self {
        Self {
            spi,
            cs,
            clock,
            detect: AlwaysPresent,
            config,
            info: None,
        }
    }
}

impl<SPI, CS, C, D> SdCard<SPI, CS, C, D>
where
    SPI: spi::SpiBus<u8>,
    CS: digital::OutputPin,
    C: Clock,
    D: CardDetect,
{
    pub fn with_card_detect<D2: CardDetect>(self, detect: D2) -> SdCard<SPI, CS, C, D2> {
        SdCard {
            spi: self.spi,
            cs: self.cs,
            clock: self.clock,
            detect,
            config: self.config,
            info: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.info.is_some()
    }

    pub fn card_info(&self) -> Option<&CardInfo> {
        self.info.as_ref()
    }

    pub fn config(&self) -> SdConfig {
        self.config
    }

    pub fn card_present(&mut self) -> bool {
        self.detect.card_present()
    }

    pub fn invalidate(&mut self) {
        self.info = None;
    }

    pub fn deinit(&mut self) {
        self.invalidate();
        if self.cs.set_high().is_err() {
            log::warn!("sdc: deinit cs_release_failed");
        }
    }

    pub fn release(self) -> (SPI, CS, C, D) {
        (self.spi, self.cs, self.clock, self.detect)
    }
}
