use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::clock::Clock;
use crate::probe::{CardDetect, CardInfo, SdCard, SdError, SECTOR_SIZE};

/// Sector store the filesystem mounts. Implemented by the SPI card driver
/// and by in-memory images in tests.
pub trait BlockDevice {
    fn init(&mut self) -> Result<CardInfo, SdError>;
    fn get_sector(&mut self, sector: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<(), SdError>;
    fn put_sector(&mut self, sector: u32, data: &[u8; SECTOR_SIZE]) -> Result<(), SdError>;
    fn deinit(&mut self);
}

impl<SPI, CS, C, D> BlockDevice for SdCard<SPI, CS, C, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    C: Clock,
    D: CardDetect,
{
    fn init(&mut self) -> Result<CardInfo, SdError> {
        SdCard::init(self)
    }

    fn get_sector(&mut self, sector: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<(), SdError> {
        SdCard::get_sector(self, sector, out)
    }

    fn put_sector(&mut self, sector: u32, data: &[u8; SECTOR_SIZE]) -> Result<(), SdError> {
        SdCard::put_sector(self, sector, data)
    }

    fn deinit(&mut self) {
        SdCard::deinit(self)
    }
}

impl<B: BlockDevice + ?Sized> BlockDevice for &mut B {
    fn init(&mut self) -> Result<CardInfo, SdError> {
        (**self).init()
    }

    fn get_sector(&mut self, sector: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<(), SdError> {
        (**self).get_sector(sector, out)
    }

    fn put_sector(&mut self, sector: u32, data: &[u8; SECTOR_SIZE]) -> Result<(), SdError> {
        (**self).put_sector(sector, data)
    }

    fn deinit(&mut self) {
        (**self).deinit()
    }
}
