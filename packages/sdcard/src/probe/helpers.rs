use super::core::CardId;

/// Bits `msb..=lsb` of a 128-bit card register, which arrives MSB first.
pub(crate) fn register_field(reg: &[u8; 16], msb: u32, lsb: u32) -> u32 {
    let width = msb - lsb + 1;
    let mask = (1u128 << width) - 1;
    ((u128::from_be_bytes(*reg) >> lsb) & mask) as u32
}

/// Capacity in bytes. Version 1 CSDs hold `(C_SIZE + 1) << (C_SIZE_MULT + 2 +
/// READ_BL_LEN)`, version 2 counts 512 KiB units.
pub fn decode_capacity_bytes(csd: &[u8; 16]) -> Option<u64> {
    match register_field(csd, 127, 126) {
        0 => {
            let blocks = u64::from(register_field(csd, 73, 62)) + 1;
            let shift = register_field(csd, 49, 47) + 2 + register_field(csd, 83, 80);
            blocks.checked_mul(1u64.checked_shl(shift)?)
        }
        1 => Some((u64::from(register_field(csd, 69, 48)) + 1) * 512 * 1024),
        _ => None,
    }
}

pub fn decode_cid(cid: &[u8; 16]) -> CardId {
    let mut product_name = [0u8; 5];
    product_name.copy_from_slice(&cid[3..8]);
    CardId {
        manufacturer_id: register_field(cid, 127, 120) as u8,
        oem_id: [cid[1], cid[2]],
        product_name,
        revision_major: register_field(cid, 63, 60) as u8,
        revision_minor: register_field(cid, 59, 56) as u8,
        serial: register_field(cid, 55, 24),
        manufactured_year: 2000 + register_field(cid, 19, 12) as u16,
        manufactured_month: register_field(cid, 11, 8) as u8,
    }
}
