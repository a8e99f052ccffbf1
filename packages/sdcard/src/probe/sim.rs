//! Byte-level SD card model speaking SPI mode, for driver tests.

use core::convert::Infallible;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, SpiBus};

use super::core::{SdCard, SECTOR_SIZE};
use super::crc::{crc16, crc7};
use crate::clock::Clock;
use crate::config::SdConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SimKind {
    V2Standard,
    V2High,
    V1,
    /// Answers CMD0 but rejects the SD-only commands, like an MMC.
    NotSd,
    Absent,
}

pub(crate) const SIM_CID: [u8; 16] = [
    0x03, b'S', b'D', b'S', b'U', b'0', b'2', b'G', 0x80, 0x12, 0x34, 0x56, 0x78, 0x01, 0x8A, 0x01,
];

/// CSD v1: c_size 3999, c_size_mult 7, read_bl_len 9.
pub(crate) const SIM_CSD_STANDARD: [u8; 16] = [
    0x00, 0x26, 0x00, 0x32, 0x5F, 0x59, 0x03, 0xE7, 0xC0, 0x03, 0x80, 0x00, 0x00, 0x00, 0x00, 0x01,
];
pub(crate) const SIM_STANDARD_CAPACITY: u64 = 4_000 * 512 * 512;

/// CSD v2: c_size 0x3B37.
pub(crate) const SIM_CSD_HIGH: [u8; 16] = [
    0x40, 0x0E, 0x00, 0x32, 0x5B, 0x59, 0x00, 0x00, 0x3B, 0x37, 0x7F, 0x80, 0x0A, 0x40, 0x00, 0x01,
];
pub(crate) const SIM_HIGH_CAPACITY: u64 = 0x3B38 * 512 * 1024;

struct PendingWrite {
    sector: u32,
    started: bool,
    buf: Vec<u8>,
}

pub(crate) struct SimState {
    pub kind: SimKind,
    pub selected: bool,
    pub idle: bool,
    pub app_cmd: bool,
    pub acmd41_busy_polls: u32,
    pub never_ready: bool,
    /// Selected exchanges left during which the card holds MISO low.
    pub held_low: u32,
    pub corrupt_read_crc: bool,
    pub forced_write_response: Option<u8>,
    pub status_r2: u8,
    pub commands: Vec<(u8, u32)>,
    pub sectors: HashMap<u32, [u8; SECTOR_SIZE]>,
    frame: Vec<u8>,
    out: VecDeque<u8>,
    write: Option<PendingWrite>,
}

impl SimState {
    fn new(kind: SimKind) -> Self {
        Self {
            kind,
            selected: false,
            idle: false,
            app_cmd: false,
            acmd41_busy_polls: 3,
            never_ready: false,
            held_low: 0,
            corrupt_read_crc: false,
            forced_write_response: None,
            status_r2: 0,
            commands: Vec::new(),
            sectors: HashMap::new(),
            frame: Vec::new(),
            out: VecDeque::new(),
            write: None,
        }
    }

    pub fn commands_named(&self, cmd: u8) -> Vec<u32> {
        self.commands
            .iter()
            .filter(|(c, _)| *c == cmd)
            .map(|(_, arg)| *arg)
            .collect()
    }

    fn capacity(&self) -> u64 {
        match self.kind {
            SimKind::V2High => SIM_HIGH_CAPACITY,
            _ => SIM_STANDARD_CAPACITY,
        }
    }

    fn exchange(&mut self, mosi: u8) -> u8 {
        if !self.selected || self.kind == SimKind::Absent {
            return 0xFF;
        }
        if self.held_low > 0 {
            self.held_low -= 1;
            return 0x00;
        }
        let miso = self.out.pop_front().unwrap_or(0xFF);

        if let Some(write) = self.write.as_mut() {
            if !write.started {
                write.started = mosi == 0xFE;
                return miso;
            }
            write.buf.push(mosi);
            if write.buf.len() == SECTOR_SIZE + 2 {
                self.finish_write();
            }
            return miso;
        }

        if self.frame.is_empty() {
            if (mosi & 0xC0) == 0x40 {
                self.frame.push(mosi);
            }
        } else {
            self.frame.push(mosi);
            if self.frame.len() == 6 {
                let frame = core::mem::take(&mut self.frame);
                self.handle_command(&frame);
            }
        }
        miso
    }

    fn finish_write(&mut self) {
        let Some(write) = self.write.take() else {
            return;
        };
        let received = u16::from_be_bytes([write.buf[SECTOR_SIZE], write.buf[SECTOR_SIZE + 1]]);
        let token = match self.forced_write_response {
            Some(token) => token,
            None if received != crc16(&write.buf[..SECTOR_SIZE]) => 0x0B,
            None => 0x05,
        };
        if token == 0x05 {
            let mut sector = [0u8; SECTOR_SIZE];
            sector.copy_from_slice(&write.buf[..SECTOR_SIZE]);
            self.sectors.insert(write.sector, sector);
        }
        self.out.push_back(0xE0 | token);
        self.out.extend([0x00, 0x00, 0x00]);
    }

    fn handle_command(&mut self, frame: &[u8]) {
        let cmd = frame[0] & 0x3F;
        let arg = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        self.commands.push((cmd, arg));
        let idle_bit = u8::from(self.idle);
        if crc7(&frame[..5]) != frame[5] {
            self.respond(&[idle_bit | 0x08]);
            return;
        }
        let app = core::mem::replace(&mut self.app_cmd, false);

        match (cmd, app) {
            (0, _) => {
                self.idle = true;
                self.respond(&[0x01]);
            }
            (8, _) => match self.kind {
                SimKind::V2Standard | SimKind::V2High => {
                    self.respond(&[idle_bit, 0x00, 0x00, ((arg >> 8) & 0x0F) as u8, arg as u8])
                }
                _ => self.respond(&[idle_bit | 0x04]),
            },
            (58, _) => {
                if self.kind == SimKind::NotSd {
                    self.respond(&[idle_bit | 0x04]);
                    return;
                }
                let mut ocr0 = 0u8;
                if !self.idle {
                    ocr0 |= 0x80;
                    if self.kind == SimKind::V2High {
                        ocr0 |= 0x40;
                    }
                }
                self.respond(&[idle_bit, ocr0, 0xFF, 0x80, 0x00]);
            }
            (55, _) => {
                self.app_cmd = true;
                self.respond(&[idle_bit]);
            }
            (41, true) => {
                let hcs_missing = self.kind == SimKind::V2High && (arg & 0x4000_0000) == 0;
                if self.never_ready || hcs_missing {
                    self.respond(&[0x01]);
                } else if self.acmd41_busy_polls > 0 {
                    self.acmd41_busy_polls -= 1;
                    self.respond(&[0x01]);
                } else {
                    self.idle = false;
                    self.respond(&[0x00]);
                }
            }
            (16, _) => {
                let r1 = if arg == SECTOR_SIZE as u32 { idle_bit } else { idle_bit | 0x40 };
                self.respond(&[r1]);
            }
            (9, _) => {
                let csd = match self.kind {
                    SimKind::V2High => SIM_CSD_HIGH,
                    _ => SIM_CSD_STANDARD,
                };
                self.respond_block(&csd);
            }
            (10, _) => self.respond_block(&SIM_CID),
            (17, _) => match self.sector_index(arg) {
                Some(sector) => {
                    let data = self.sectors.get(&sector).copied().unwrap_or([0; SECTOR_SIZE]);
                    self.respond_block(&data);
                }
                None => {
                    self.respond(&[0x00]);
                    self.out.extend([0xFF, 0x08]);
                }
            },
            (24, _) => match self.sector_index(arg) {
                Some(sector) => {
                    self.respond(&[0x00]);
                    self.write = Some(PendingWrite {
                        sector,
                        started: false,
                        buf: Vec::new(),
                    });
                }
                None => self.respond(&[0x40]),
            },
            (13, _) => self.respond(&[0x00, self.status_r2]),
            _ => self.respond(&[idle_bit | 0x04]),
        }
    }

    fn sector_index(&self, arg: u32) -> Option<u32> {
        let sector = if self.kind == SimKind::V2High {
            arg
        } else {
            if arg % SECTOR_SIZE as u32 != 0 {
                return None;
            }
            arg / SECTOR_SIZE as u32
        };
        ((sector as u64) < self.capacity() / SECTOR_SIZE as u64).then_some(sector)
    }

    fn respond(&mut self, bytes: &[u8]) {
        self.out.push_back(0xFF);
        self.out.extend(bytes.iter().copied());
    }

    fn respond_block(&mut self, block: &[u8]) {
        self.respond(&[0x00]);
        let mut crc = crc16(block);
        if self.corrupt_read_crc {
            crc ^= 0x0001;
        }
        self.out.extend([0xFF, 0xFF, 0xFE]);
        self.out.extend(block.iter().copied());
        self.out.extend(crc.to_be_bytes());
    }
}

pub(crate) type SimHandle = Rc<RefCell<SimState>>;

pub(crate) struct SimBus(SimHandle);

pub(crate) struct SimCs(SimHandle);

impl SpiErrorType for SimBus {
    type Error = Infallible;
}

impl SpiBus<u8> for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        for word in words.iter_mut() {
            *word = state.exchange(0xFF);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        for &word in words {
            state.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        for idx in 0..read.len().max(write.len()) {
            let miso = state.exchange(write.get(idx).copied().unwrap_or(0xFF));
            if let Some(slot) = read.get_mut(idx) {
                *slot = miso;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        for word in words.iter_mut() {
            *word = state.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl PinErrorType for SimCs {
    type Error = Infallible;
}

impl OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().selected = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.selected = false;
        state.frame.clear();
        state.out.clear();
        state.write = None;
        Ok(())
    }
}

/// Advances by `step_ms` on every read so bounded waits always terminate.
pub(crate) struct StepClock {
    pub now_ms: u32,
    pub step_ms: u32,
}

impl Clock for StepClock {
    fn now_ms(&mut self) -> u32 {
        self.now_ms = self.now_ms.wrapping_add(self.step_ms);
        self.now_ms
    }
}

pub(crate) type SimCard = SdCard<SimBus, SimCs, StepClock>;

pub(crate) fn sim_card(kind: SimKind, config: SdConfig) -> (SimCard, SimHandle) {
    let state = Rc::new(RefCell::new(SimState::new(kind)));
    let card = SdCard::new(
        SimBus(state.clone()),
        SimCs(state.clone()),
        StepClock {
            now_ms: 0,
            step_ms: 1,
        },
        config,
    );
    (card, state)
}
