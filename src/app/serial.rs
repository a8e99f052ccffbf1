use core::fmt::Write;

use embassy_time::{with_timeout, Duration};
use navlogger::console::{parse_console_line, ConsoleCommand};

use super::{
    clock::apply_time_sync,
    config::{CONSOLE_LINE_MAX, CONSOLE_POLL_MS, STORAGE_COMMANDS, STORAGE_STATUS},
    types::{LogLine, SerialUart, StorageCommand, StorageStatus},
};

#[embassy_executor::task]
pub(crate) async fn console_task(mut uart: SerialUart) {
    let mut line_buf = [0u8; CONSOLE_LINE_MAX];
    let mut line_len = 0usize;
    let mut rx = [0u8; 1];

    loop {
        while let Ok(status) = STORAGE_STATUS.try_receive() {
            write_status(&mut uart, &status).await;
        }

        let Ok(Ok(1)) =
            with_timeout(Duration::from_millis(CONSOLE_POLL_MS), uart.read_async(&mut rx)).await
        else {
            continue;
        };
        let byte = rx[0];
        if byte == b'\r' || byte == b'\n' {
            if line_len > 0 {
                handle_line(&mut uart, &line_buf[..line_len]).await;
            }
            line_len = 0;
        } else if line_len < line_buf.len() {
            line_buf[line_len] = byte;
            line_len += 1;
        } else {
            // Overlong lines are dropped whole.
            line_len = 0;
        }
    }
}

async fn handle_line(uart: &mut SerialUart, line: &[u8]) {
    let Some(command) = parse_console_line(line) else {
        let _ = uart_write_all(uart, b"CMD ERR\r\n").await;
        return;
    };
    match command {
        ConsoleCommand::TimeSet {
            unix_epoch_utc_seconds,
            tz_offset_minutes,
        } => {
            apply_time_sync(unix_epoch_utc_seconds, tz_offset_minutes);
            let _ = uart_write_all(uart, b"TIMESET OK\r\n").await;
        }
        ConsoleCommand::Start => {
            reply_queued(uart, StorageCommand::Start, b"START OK\r\n", b"START BUSY\r\n").await
        }
        ConsoleCommand::Stop => {
            reply_queued(uart, StorageCommand::Stop, b"STOP OK\r\n", b"STOP BUSY\r\n").await
        }
        ConsoleCommand::Status => {
            if STORAGE_COMMANDS.try_send(StorageCommand::Status).is_err() {
                let _ = uart_write_all(uart, b"STATUS BUSY\r\n").await;
            }
        }
        ConsoleCommand::Sentence(sentence) => {
            let mut record = LogLine::new();
            if record.extend_from_slice(sentence).is_err()
                || record.extend_from_slice(b"\r\n").is_err()
            {
                return;
            }
            // Sentences arrive continuously; a full queue just drops one.
            let _ = STORAGE_COMMANDS.try_send(StorageCommand::Record(record));
        }
    }
}

async fn reply_queued(uart: &mut SerialUart, command: StorageCommand, ok: &[u8], busy: &[u8]) {
    let response = if STORAGE_COMMANDS.try_send(command).is_ok() {
        ok
    } else {
        busy
    };
    let _ = uart_write_all(uart, response).await;
}

async fn write_status(uart: &mut SerialUart, status: &StorageStatus) {
    let mut line = heapless::String::<160>::new();
    let _ = write!(
        &mut line,
        "STATUS phase={} mounted={} written={} skipped={} files={} failures={} path={}\r\n",
        status.phase.label(),
        status.mounted as u8,
        status.stats.lines_written,
        status.stats.lines_skipped,
        status.stats.files_opened,
        status.stats.consecutive_failures,
        if status.path.is_empty() { "-" } else { status.path.as_str() },
    );
    let _ = uart_write_all(uart, line.as_bytes()).await;
}

async fn uart_write_all(uart: &mut SerialUart, mut bytes: &[u8]) -> bool {
    while !bytes.is_empty() {
        match uart.write_async(bytes).await {
            Ok(0) => return false,
            Ok(written) => bytes = &bytes[written..],
            Err(_) => return false,
        }
    }
    true
}
