use super::*;

#[test]
fn parses_timeset_with_offset() {
    assert_eq!(
        parse_console_line(b"TIMESET 1715927400 -300\r"),
        Some(ConsoleCommand::TimeSet {
            unix_epoch_utc_seconds: 1_715_927_400,
            tz_offset_minutes: -300,
        })
    );
}

#[test]
fn timeset_offset_defaults_to_utc() {
    assert_eq!(
        parse_console_line(b"  TIMESET 42"),
        Some(ConsoleCommand::TimeSet {
            unix_epoch_utc_seconds: 42,
            tz_offset_minutes: 0,
        })
    );
}

#[test]
fn rejects_malformed_timeset() {
    assert_eq!(parse_console_line(b"TIMESET"), None);
    assert_eq!(parse_console_line(b"TIMESET1715927400"), None);
    assert_eq!(parse_console_line(b"TIMESET 1715927400 900"), None);
    assert_eq!(parse_console_line(b"TIMESET 1715927400 +60 extra"), None);
    assert_eq!(parse_console_line(b"TIMESET 99999999999999999999"), None);
}

#[test]
fn parses_control_words() {
    assert_eq!(parse_console_line(b"START"), Some(ConsoleCommand::Start));
    assert_eq!(parse_console_line(b"LOGSTOP\r\n"), Some(ConsoleCommand::Stop));
    assert_eq!(parse_console_line(b"STATUS"), Some(ConsoleCommand::Status));
    assert_eq!(parse_console_line(b"status"), None);
}

#[test]
fn forwards_sentences_trimmed() {
    assert_eq!(
        parse_console_line(b"$GPGGA,063000.00,4807.038,N*47\r\n"),
        Some(ConsoleCommand::Sentence(b"$GPGGA,063000.00,4807.038,N*47"))
    );
}
