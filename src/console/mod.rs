//! Line protocol spoken on the debug UART: control commands plus raw NMEA
//! sentences forwarded by the receiver.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleCommand<'a> {
    TimeSet {
        unix_epoch_utc_seconds: u64,
        tz_offset_minutes: i32,
    },
    Start,
    Stop,
    Status,
    /// A `$`-prefixed sentence, trimmed, without its line terminator.
    Sentence(&'a [u8]),
}

pub fn parse_console_line(line: &[u8]) -> Option<ConsoleCommand<'_>> {
    let line = trim_ascii_whitespace(line);
    if line.first() == Some(&b'$') {
        return Some(ConsoleCommand::Sentence(line));
    }
    match line {
        b"START" | b"LOGSTART" => Some(ConsoleCommand::Start),
        b"STOP" | b"LOGSTOP" => Some(ConsoleCommand::Stop),
        b"STATUS" => Some(ConsoleCommand::Status),
        _ => parse_timeset(line),
    }
}

fn parse_timeset(line: &[u8]) -> Option<ConsoleCommand<'_>> {
    let mut fields = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|field| !field.is_empty());
    if fields.next()? != b"TIMESET" {
        return None;
    }
    let unix_epoch_utc_seconds = parse_field::<u64>(fields.next()?)?;
    let tz_offset_minutes = match fields.next() {
        Some(field) => parse_field::<i32>(field)?,
        None => 0,
    };
    if fields.next().is_some() || !(-720..=840).contains(&tz_offset_minutes) {
        return None;
    }

    Some(ConsoleCommand::TimeSet {
        unix_epoch_utc_seconds,
        tz_offset_minutes,
    })
}

fn parse_field<T: core::str::FromStr>(field: &[u8]) -> Option<T> {
    core::str::from_utf8(field).ok()?.parse().ok()
}

fn trim_ascii_whitespace(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |last| last + 1);
    &line[start..end]
}

#[cfg(test)]
mod tests;
