/// CRC7 (polynomial 0x09) over a command frame, returned with the end bit set.
pub fn crc7(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        let mut data = byte;
        for _ in 0..8 {
            crc <<= 1;
            if ((data & 0x80) ^ (crc & 0x80)) != 0 {
                crc ^= 0x09;
            }
            data <<= 1;
        }
    }
    (crc << 1) | 1
}

/// CRC16-CCITT (polynomial 0x1021, zero seed) used by data block tokens.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in bytes {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if (crc & 0x8000) != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
