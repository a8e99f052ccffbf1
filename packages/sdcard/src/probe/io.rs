use embedded_hal::digital::{Error as _, OutputPin};
use embedded_hal::spi::{Error as _, SpiBus};

use super::core::*;
use super::crc::{crc16, crc7};
use crate::clock::{Clock, Deadline};

impl<SPI, CS, C, D> SdCard<SPI, CS, C, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    C: Clock,
    D: CardDetect,
{
    pub fn get_sector(
        &mut self,
        sector: u32,
        out: &mut [u8; SECTOR_SIZE],
    ) -> Result<(), SdError> {
        let arg = self.sector_address(sector)?;
        let result = self.get_data(SD_CMD17, arg, out);
        self.finish(result, "get_sector", sector)
    }

    pub fn put_sector(&mut self, sector: u32, data: &[u8; SECTOR_SIZE]) -> Result<(), SdError> {
        let arg = self.sector_address(sector)?;
        let result = self.put_data(arg, data);
        self.finish(result, "put_sector", sector)
    }

    fn sector_address(&self, sector: u32) -> Result<u32, SdError> {
        let info = self.info.as_ref().ok_or(SdError::NotInitialized)?;
        if info.high_capacity {
            Ok(sector)
        } else {
            sector.checked_mul(SECTOR_SIZE as u32).ok_or(SdError::BadResponse)
        }
    }

    fn finish(
        &mut self,
        result: Result<(), SdError>,
        op: &str,
        sector: u32,
    ) -> Result<(), SdError> {
        let released = self.end_transaction();
        if let Err(err) = result {
            log::warn!("sdc: {}_failed sector={} err={:?}", op, sector, err);
            return Err(err);
        }
        released
    }

    fn put_data(&mut self, arg: u32, data: &[u8; SECTOR_SIZE]) -> Result<(), SdError> {
        let r1 = self.send_command(SD_CMD24, arg)?;
        if r1 != 0x00 {
            return Err(SdError::BadResponse);
        }
        self.send_idle_bytes(WRITE_GAP_BYTES)?;

        let crc = crc16(data);
        self.transfer_byte(DATA_START_TOKEN)?;
        for &byte in data.iter() {
            self.transfer_byte(byte)?;
        }
        self.transfer_byte((crc >> 8) as u8)?;
        self.transfer_byte(crc as u8)?;

        let mut response = 0xFFu8;
        let mut got_response = false;
        for _ in 0..self.config.response_polls {
            response = self.transfer_byte(0xFF)?;
            if (response & 0x11) == 0x01 {
                got_response = true;
                break;
            }
        }
        if !got_response {
            return Err(SdError::Timeout);
        }
        match response & DATA_RESPONSE_MASK {
            DATA_RESPONSE_ACCEPTED => {}
            DATA_RESPONSE_CRC_ERR => return Err(SdError::CrcData),
            DATA_RESPONSE_WRITE_ERR => return Err(SdError::WriteData),
            _ => return Err(SdError::Unknown),
        }

        if !self.wait_while_busy(self.config.write_busy_timeout_ms)? {
            return Err(SdError::Timeout);
        }

        // Programming errors only surface in the status register.
        let r1 = self.send_command(SD_CMD13, 0)?;
        let r2 = self.transfer_byte(0xFF)?;
        if r1 != 0x00 {
            return Err(SdError::BadResponse);
        }
        if r2 != 0x00 {
            return Err(SdError::WriteData);
        }
        Ok(())
    }

    /// Issues `cmd` and reads the data block that follows into `out`.
    pub(super) fn get_data(&mut self, cmd: u8, arg: u32, out: &mut [u8]) -> Result<(), SdError> {
        let r1 = self.send_command(cmd, arg)?;
        if r1 != 0x00 {
            return Err(SdError::BadResponse);
        }

        let mut got_token = false;
        for _ in 0..self.config.data_token_polls {
            let token = self.transfer_byte(0xFF)?;
            if token == DATA_START_TOKEN {
                got_token = true;
                break;
            }
            if (token & 0xF0) == 0x00 {
                log::debug!("sdc: data_error_token cmd={} token={:#04x}", cmd, token);
                return Err(SdError::ReadData);
            }
        }
        if !got_token {
            return Err(SdError::Timeout);
        }

        for slot in out.iter_mut() {
            *slot = self.transfer_byte(0xFF)?;
        }
        let crc_hi = self.transfer_byte(0xFF)?;
        let crc_lo = self.transfer_byte(0xFF)?;
        if self.config.verify_read_crc {
            let received = u16::from_be_bytes([crc_hi, crc_lo]);
            if received != crc16(out) {
                return Err(SdError::CrcData);
            }
        }
        Ok(())
    }

    /// Sends one command frame and returns its R1. A card that never
    /// answers yields 0xFF, which every caller treats as a bad response.
    pub(super) fn send_command(&mut self, cmd: u8, arg: u32) -> Result<u8, SdError> {
        let mut frame = [
            0x40 | cmd,
            (arg >> 24) as u8,
            (arg >> 16) as u8,
            (arg >> 8) as u8,
            arg as u8,
            0,
        ];
        frame[5] = crc7(&frame[..5]);

        self.deselect()?;
        self.transfer_byte(0xFF)?;
        self.select()?;
        if !self.wait_while_busy(self.config.command_busy_timeout_ms)? {
            return Err(SdError::Timeout);
        }

        for byte in frame {
            self.transfer_byte(byte)?;
        }

        let mut r1 = 0xFFu8;
        for _ in 0..self.config.response_polls {
            r1 = self.transfer_byte(0xFF)?;
            if r1 != 0xFF {
                break;
            }
        }
        Ok(r1)
    }

    pub(super) fn send_app_command(&mut self, cmd: u8, arg: u32) -> Result<u8, SdError> {
        let r1 = self.send_command(SD_CMD55, 0)?;
        if (r1 & R1_BAD_RESPONSE) != 0 {
            return Ok(r1);
        }
        self.send_command(cmd, arg)
    }

    pub(super) fn read_response_bytes(&mut self, out: &mut [u8]) -> Result<(), SdError> {
        for slot in out.iter_mut() {
            *slot = self.transfer_byte(0xFF)?;
        }
        Ok(())
    }

    /// Returns false if the data line still reads busy when the deadline passes.
    fn wait_while_busy(&mut self, timeout_ms: u32) -> Result<bool, SdError> {
        let deadline = Deadline::after(self.clock.now_ms(), timeout_ms);
        loop {
            if self.transfer_byte(0xFF)? == 0xFF {
                return Ok(true);
            }
            if deadline.expired(self.clock.now_ms()) {
                return Ok(false);
            }
        }
    }

    pub(super) fn send_idle_bytes(&mut self, count: usize) -> Result<(), SdError> {
        for _ in 0..count {
            self.transfer_byte(0xFF)?;
        }
        Ok(())
    }

    pub(super) fn transfer_byte(&mut self, byte: u8) -> Result<u8, SdError> {
        let mut frame = [byte];
        self.spi
            .transfer_in_place(&mut frame)
            .map_err(|err| SdError::Bus(err.kind()))?;
        Ok(frame[0])
    }

    pub(super) fn select(&mut self) -> Result<(), SdError> {
        self.cs.set_low().map_err(|err| SdError::Pin(err.kind()))
    }

    pub(super) fn deselect(&mut self) -> Result<(), SdError> {
        self.cs.set_high().map_err(|err| SdError::Pin(err.kind()))
    }

    pub(super) fn end_transaction(&mut self) -> Result<(), SdError> {
        self.deselect()?;
        self.transfer_byte(0xFF)?;
        Ok(())
    }
}
