use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use super::core::*;
use super::helpers::decode_capacity_bytes;
use crate::clock::{Clock, Deadline};

impl<SPI, CS, C, D> SdCard<SPI, CS, C, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    C: Clock,
    D: CardDetect,
{
    /// Runs the SPI-mode power-up handshake. The card is left deselected
    /// and, on success, ready for sector I/O.
    pub fn init(&mut self) -> Result<CardInfo, SdError> {
        self.info = None;
        if !self.detect.card_present() {
            log::warn!("sdc: init_failed err=NoCard");
            return Err(SdError::NoCard);
        }

        let result = self.handshake();
        let released = self.end_transaction();
        match result {
            Ok(info) => {
                released?;
                let id = info.card_id();
                log::info!(
                    "sdc: init_ok version={:?} high_capacity={} capacity_mb={}",
                    info.version,
                    info.high_capacity,
                    info.capacity_bytes / (1024 * 1024),
                );
                log::info!(
                    "sdc: card_id mid={:#04x} product={} serial={:#010x} date={}-{:02}",
                    id.manufacturer_id,
                    id.product_name_str(),
                    id.serial,
                    id.manufactured_year,
                    id.manufactured_month,
                );
                self.info = Some(info);
                Ok(info)
            }
            Err(err) => {
                log::warn!("sdc: init_failed err={:?}", err);
                Err(err)
            }
        }
    }

    fn handshake(&mut self) -> Result<CardInfo, SdError> {
        // At least 74 clocks with the card deselected.
        self.deselect()?;
        self.send_idle_bytes(POWER_UP_IDLE_BYTES)?;

        self.go_idle()?;
        let version = self.check_interface_condition()?;
        log::debug!("sdc: if_cond version={:?}", version);
        self.check_voltage_window()?;
        self.leave_idle(version)?;

        let high_capacity = match version {
            CardVersion::V1 => false,
            CardVersion::V2 => self.read_ocr()?[0] & 0x40 != 0,
        };

        let r1 = self.send_command(SD_CMD16, SECTOR_SIZE as u32)?;
        if r1 != 0x00 {
            return Err(SdError::SetBlocklenFailed);
        }

        let mut cid = [0u8; 16];
        self.get_data(SD_CMD10, 0, &mut cid)?;
        let mut csd = [0u8; 16];
        self.get_data(SD_CMD9, 0, &mut csd)?;
        let capacity_bytes = decode_capacity_bytes(&csd).ok_or(SdError::BadResponse)?;

        Ok(CardInfo {
            version,
            high_capacity,
            capacity_bytes,
            cid,
            csd,
        })
    }

    fn go_idle(&mut self) -> Result<(), SdError> {
        for attempt in 0..self.config.reset_attempts {
            match self.send_command(SD_CMD0, 0) {
                Ok(R1_IDLE_STATE) => return Ok(()),
                Ok(_) => {}
                Err(err) => log::debug!("sdc: go_idle attempt={} err={:?}", attempt, err),
            }
        }
        Err(SdError::ResetTimeout)
    }

    fn check_interface_condition(&mut self) -> Result<CardVersion, SdError> {
        let r1 = self.send_command(SD_CMD8, IF_COND_CHECK_PATTERN)?;
        if (r1 & R1_BAD_RESPONSE) != 0 {
            return Err(SdError::BadResponse);
        }
        if (r1 & R1_ILLEGAL_COMMAND) != 0 {
            return Ok(CardVersion::V1);
        }
        let mut r7 = [0u8; 4];
        self.read_response_bytes(&mut r7)?;
        if r7[3] != (IF_COND_CHECK_PATTERN & 0xFF) as u8 {
            return Err(SdError::BadResponse);
        }
        if (r7[2] & 0x0F) != 0x01 {
            return Err(SdError::BadVoltageRange);
        }
        Ok(CardVersion::V2)
    }

    fn check_voltage_window(&mut self) -> Result<(), SdError> {
        let ocr = self.read_ocr()?;
        // 3.2-3.4 V window bits.
        if (ocr[1] & 0x30) != 0x30 {
            return Err(SdError::BadVoltageRange);
        }
        Ok(())
    }

    fn read_ocr(&mut self) -> Result<[u8; 4], SdError> {
        let r1 = self.send_command(SD_CMD58, 0)?;
        if (r1 & R1_BAD_RESPONSE) != 0 {
            return Err(SdError::BadResponse);
        }
        if (r1 & R1_ILLEGAL_COMMAND) != 0 {
            return Err(SdError::NoSdCard);
        }
        let mut ocr = [0u8; 4];
        self.read_response_bytes(&mut ocr)?;
        Ok(ocr)
    }

    fn leave_idle(&mut self, version: CardVersion) -> Result<(), SdError> {
        let arg = match version {
            CardVersion::V1 => 0,
            CardVersion::V2 => OCR_HCS,
        };
        let deadline = Deadline::after(self.clock.now_ms(), self.config.init_timeout_ms);
        loop {
            let r1 = self.send_app_command(SD_ACMD41, arg)?;
            if (r1 & R1_IDLE_STATE) == 0 {
                return if r1 == 0x00 {
                    Ok(())
                } else {
                    Err(SdError::BadResponse)
                };
            }
            if deadline.expired(self.clock.now_ms()) {
                return Err(SdError::InitTimeout);
            }
        }
    }
}
