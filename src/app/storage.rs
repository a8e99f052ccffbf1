use embassy_time::{Duration, Instant, Ticker};
use navlogger::recorder::TrackRecorder;

use super::{
    config::{RECORDER_CONFIG, STORAGE_COMMANDS, STORAGE_STATUS, STORAGE_TICK_MS},
    types::{Storage, StorageCommand, StorageStatus},
};

#[embassy_executor::task]
pub(crate) async fn storage_task(mut session: Storage) {
    let mut recorder = TrackRecorder::<Storage>::new(RECORDER_CONFIG);
    match session.mount() {
        Ok(part) => log::info!(
            "storage: mounted start={} clusters={}",
            part.start_sector,
            part.max_cluster()
        ),
        // The recorder keeps retrying with backoff from here on.
        Err(err) => log::warn!("storage: boot_mount_failed err={:?}", err),
    }
    recorder.start(&mut session, now_ms());

    let mut ticker = Ticker::every(Duration::from_millis(STORAGE_TICK_MS));
    loop {
        ticker.next().await;
        while let Ok(command) = STORAGE_COMMANDS.try_receive() {
            let now = now_ms();
            match command {
                StorageCommand::Start => recorder.start(&mut session, now),
                StorageCommand::Stop => recorder.stop(&mut session, now),
                StorageCommand::Record(line) => {
                    recorder.record(&mut session, now, &line);
                }
                StorageCommand::Status => {
                    let _ = STORAGE_STATUS.try_send(status_of(&recorder, &session));
                }
            }
        }
        recorder.tick(&mut session, now_ms());
    }
}

fn status_of(recorder: &TrackRecorder<Storage>, session: &Storage) -> StorageStatus {
    let mut path = heapless::String::new();
    if let Some(current) = recorder.current_path() {
        let _ = path.push_str(current);
    }
    StorageStatus {
        phase: recorder.phase(),
        mounted: session.is_valid(),
        stats: recorder.stats(),
        path,
    }
}

fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
