mod clock;
pub(crate) mod config;
mod serial;
mod storage;
pub(crate) mod types;

use esp_hal::{
    gpio::{Level, Output, OutputConfig},
    spi::{
        master::{Config as SpiConfig, Spi},
        Mode as SpiMode,
    },
    time::Rate,
    timer::timg::TimerGroup,
    uart::{Config as UartConfig, Uart},
};
use sdcard::{EmbassyClock, SdCard, StorageSession};

use self::{
    clock::GpsWallClock,
    config::{FAT_CONFIG, SD_CONFIG, SD_SPI_KHZ, UART_BAUD},
};

pub(crate) fn run() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);
    esp_println::logger::init_logger_from_env();

    let uart_cfg = UartConfig::default().with_baudrate(UART_BAUD);
    let Ok(uart) = Uart::new(peripherals.UART0, uart_cfg) else {
        halt_forever();
    };
    let uart = uart
        .with_rx(peripherals.GPIO3)
        .with_tx(peripherals.GPIO1)
        .into_async();

    let sd_spi_cfg = SpiConfig::default()
        .with_frequency(Rate::from_khz(SD_SPI_KHZ))
        .with_mode(SpiMode::_0);
    let Ok(sd_spi) = Spi::new(peripherals.SPI2, sd_spi_cfg) else {
        halt_forever();
    };
    let sd_spi = sd_spi
        .with_sck(peripherals.GPIO14)
        .with_mosi(peripherals.GPIO13)
        .with_miso(peripherals.GPIO12);
    let sd_cs = Output::new(peripherals.GPIO15, Level::High, OutputConfig::default());
    let card = SdCard::new(sd_spi, sd_cs, EmbassyClock, SD_CONFIG);
    let session = StorageSession::new(card, GpsWallClock, FAT_CONFIG);

    log::info!("navlogger: boot");

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(storage::storage_task(session));
        spawner.must_spawn(serial::console_task(uart));
    });
}

unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}

fn halt_forever() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
