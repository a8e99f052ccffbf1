use super::helpers::register_field;
use super::sim::*;
use super::*;
use crate::config::SdConfig;

fn ready_card(kind: SimKind) -> (SimCard, SimHandle) {
    let (mut card, state) = sim_card(kind, SdConfig::default());
    card.init().unwrap();
    (card, state)
}

#[test]
fn crc7_matches_well_known_command_frames() {
    assert_eq!(crc7(&[0x40, 0x00, 0x00, 0x00, 0x00]), 0x95);
    assert_eq!(crc7(&[0x48, 0x00, 0x00, 0x01, 0xAA]), 0x87);
    assert_eq!(crc7(&[0x77, 0x00, 0x00, 0x00, 0x00]), 0x65);
    assert_eq!(crc7(&[0x69, 0x40, 0x00, 0x00, 0x00]), 0x77);
}

#[test]
fn crc16_matches_ccitt_reference_values() {
    assert_eq!(crc16(b"123456789"), 0x31C3);
    assert_eq!(crc16(&[0xFF; SECTOR_SIZE]), 0x7FA1);
}

#[test]
fn capacity_decodes_both_csd_layouts() {
    assert_eq!(decode_capacity_bytes(&SIM_CSD_STANDARD), Some(SIM_STANDARD_CAPACITY));
    assert_eq!(decode_capacity_bytes(&SIM_CSD_HIGH), Some(SIM_HIGH_CAPACITY));
    let mut reserved = SIM_CSD_STANDARD;
    reserved[0] = 0x80;
    assert_eq!(decode_capacity_bytes(&reserved), None);
}

#[test]
fn register_field_spans_byte_boundaries() {
    let mut reg = [0u8; 16];
    reg[0] = 0b0100_0000;
    reg[14] = 0xAB;
    reg[15] = 0xCD;
    assert_eq!(register_field(&reg, 127, 126), 1);
    assert_eq!(register_field(&reg, 15, 0), 0xABCD);
    assert_eq!(register_field(&reg, 11, 4), 0xBC);
    assert_eq!(register_field(&reg, 0, 0), 1);
    assert_eq!(register_field(&[0xFF; 16], 31, 0), u32::MAX);
}

#[test]
fn cid_decode_extracts_identity_fields() {
    let id = decode_cid(&SIM_CID);
    assert_eq!(id.manufacturer_id, 0x03);
    assert_eq!(&id.oem_id, b"SD");
    assert_eq!(id.product_name_str(), "SU02G");
    assert_eq!((id.revision_major, id.revision_minor), (8, 0));
    assert_eq!(id.serial, 0x1234_5678);
    assert_eq!(id.manufactured_year, 2024);
    assert_eq!(id.manufactured_month, 10);
}

#[test]
fn init_v2_standard_capacity_card() {
    let (mut card, state) = sim_card(SimKind::V2Standard, SdConfig::default());
    let info = card.init().unwrap();
    assert_eq!(info.version, CardVersion::V2);
    assert!(!info.high_capacity);
    assert_eq!(info.capacity_bytes, SIM_STANDARD_CAPACITY);
    assert_eq!(info.cid, SIM_CID);
    assert!(card.is_initialized());

    let state = state.borrow();
    assert_eq!(state.commands_named(8), vec![0x1AA]);
    assert_eq!(state.commands_named(16), vec![512]);
    assert!(state.commands_named(41).iter().all(|arg| *arg == 0x4000_0000));
    assert!(!state.selected);
}

#[test]
fn init_high_capacity_card_uses_block_addressing() {
    let (mut card, state) = ready_card(SimKind::V2High);
    let info = *card.card_info().unwrap();
    assert!(info.high_capacity);
    assert_eq!(info.capacity_bytes, SIM_HIGH_CAPACITY);

    let mut out = [0u8; SECTOR_SIZE];
    card.get_sector(5, &mut out).unwrap();
    assert_eq!(state.borrow().commands_named(17), vec![5]);
}

#[test]
fn init_legacy_card_reports_v1() {
    let (mut card, state) = sim_card(SimKind::V1, SdConfig::default());
    let info = card.init().unwrap();
    assert_eq!(info.version, CardVersion::V1);
    assert!(!info.high_capacity);
    assert!(state.borrow().commands_named(41).iter().all(|arg| *arg == 0));
}

#[test]
fn init_without_card_times_out_on_reset() {
    let config = SdConfig::default().with_reset_attempts(10).with_response_polls(8);
    let (mut card, _) = sim_card(SimKind::Absent, config);
    assert_eq!(card.init(), Err(SdError::ResetTimeout));
    assert!(!card.is_initialized());
}

#[test]
fn init_reports_reset_timeout_when_card_holds_miso_low() {
    let config = SdConfig::default()
        .with_reset_attempts(3)
        .with_command_busy_timeout_ms(10);
    let (mut card, state) = sim_card(SimKind::V2Standard, config);
    state.borrow_mut().held_low = u32::MAX;
    assert_eq!(card.init(), Err(SdError::ResetTimeout));
    assert!(!card.is_initialized());
    assert!(state.borrow().commands_named(0).is_empty());
}

#[test]
fn init_retries_reset_after_busy_line_releases() {
    let config = SdConfig::default()
        .with_reset_attempts(5)
        .with_command_busy_timeout_ms(10);
    let (mut card, state) = sim_card(SimKind::V2Standard, config);
    state.borrow_mut().held_low = 15;
    card.init().unwrap();
    assert!(card.is_initialized());
    assert_eq!(state.borrow().commands_named(0).len(), 1);
}

#[test]
fn init_rejects_non_sd_card() {
    let (mut card, _) = sim_card(SimKind::NotSd, SdConfig::default());
    assert_eq!(card.init(), Err(SdError::NoSdCard));
}

#[test]
fn init_times_out_when_card_never_leaves_idle() {
    let config = SdConfig::default().with_init_timeout_ms(50);
    let (mut card, state) = sim_card(SimKind::V2Standard, config);
    state.borrow_mut().never_ready = true;
    assert_eq!(card.init(), Err(SdError::InitTimeout));
    assert!(card.card_info().is_none());
}

#[test]
fn init_fails_fast_when_socket_is_empty() {
    struct EmptySocket;
    impl CardDetect for EmptySocket {
        fn card_present(&mut self) -> bool {
            false
        }
    }

    let (card, state) = sim_card(SimKind::V2Standard, SdConfig::default());
    let mut card = card.with_card_detect(EmptySocket);
    assert_eq!(card.init(), Err(SdError::NoCard));
    assert!(state.borrow().commands.is_empty());
}

#[test]
fn sector_write_then_read_round_trips_at_byte_address() {
    let (mut card, state) = ready_card(SimKind::V2Standard);
    let mut data = [0u8; SECTOR_SIZE];
    for (idx, byte) in data.iter_mut().enumerate() {
        *byte = (idx * 7) as u8;
    }
    card.put_sector(3, &data).unwrap();

    let mut out = [0u8; SECTOR_SIZE];
    card.get_sector(3, &mut out).unwrap();
    assert_eq!(out, data);

    let state = state.borrow();
    assert_eq!(state.commands_named(24), vec![3 << 9]);
    assert_eq!(state.commands_named(17), vec![3 << 9]);
    assert_eq!(state.commands_named(13).len(), 1);
}

#[test]
fn corrupted_read_crc_is_reported_when_verification_enabled() {
    let (mut card, state) = ready_card(SimKind::V2Standard);
    state.borrow_mut().corrupt_read_crc = true;
    let mut out = [0u8; SECTOR_SIZE];
    assert_eq!(card.get_sector(1, &mut out), Err(SdError::CrcData));
}

#[test]
fn corrupted_read_crc_is_ignored_when_verification_disabled() {
    let config = SdConfig::default().with_verify_read_crc(false);
    let (mut card, state) = sim_card(SimKind::V2Standard, config);
    card.init().unwrap();
    state.borrow_mut().corrupt_read_crc = true;
    let mut out = [0u8; SECTOR_SIZE];
    assert_eq!(card.get_sector(1, &mut out), Ok(()));
}

#[test]
fn write_data_responses_map_to_distinct_errors() {
    let (mut card, state) = ready_card(SimKind::V2Standard);
    let data = [0x5A; SECTOR_SIZE];

    state.borrow_mut().forced_write_response = Some(0x0B);
    assert_eq!(card.put_sector(2, &data), Err(SdError::CrcData));
    state.borrow_mut().forced_write_response = Some(0x0D);
    assert_eq!(card.put_sector(2, &data), Err(SdError::WriteData));
    state.borrow_mut().forced_write_response = Some(0x07);
    assert_eq!(card.put_sector(2, &data), Err(SdError::Unknown));

    state.borrow_mut().forced_write_response = None;
    state.borrow_mut().status_r2 = 0x04;
    assert_eq!(card.put_sector(2, &data), Err(SdError::WriteData));
}

#[test]
fn out_of_range_read_reports_data_error_token() {
    let (mut card, _) = ready_card(SimKind::V2Standard);
    let mut out = [0u8; SECTOR_SIZE];
    let past_end = (SIM_STANDARD_CAPACITY / SECTOR_SIZE as u64) as u32;
    assert_eq!(card.get_sector(past_end, &mut out), Err(SdError::ReadData));
}

#[test]
fn sector_io_requires_initialization() {
    let (mut card, state) = sim_card(SimKind::V2Standard, SdConfig::default());
    let mut out = [0u8; SECTOR_SIZE];
    assert_eq!(card.get_sector(0, &mut out), Err(SdError::NotInitialized));
    assert!(state.borrow().commands.is_empty());

    card.init().unwrap();
    card.deinit();
    assert_eq!(card.put_sector(0, &out), Err(SdError::NotInitialized));
}
