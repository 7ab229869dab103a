//! fan-locked-rotor - Firmware entry point
//!
//! 1. Bring up the log UART, channel pins and the jiffies timer
//! 2. Start the jiffies clock
//! 3. Run the dispatch loop forever
//!
//! A bring-up error is logged through ESP-IDF and the chip restarts.
//!
//! Host builds only compile the library and its tests; the firmware
//! binary exists on the ESP-IDF target.

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

#[cfg(target_os = "espidf")]
mod firmware {
    use core::convert::Infallible;

    use esp_idf_svc::hal::gpio::IOPin;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys as esp_idf_sys;
    use esp_idf_sys::EspError;

    use fan_locked_rotor::{
        hal::{GroupTimer, OpenDrainChannel},
        logging::LogStream,
        rt_info,
        uart_logger::{UartLogSink, UartLoggerConfig},
        Channel, Dispatcher, FaultState, OverflowAccumulator, TickSource, CONFIG, NUM_CHANNELS,
    };

    // Static allocations
    static LOG_STREAM: LogStream = LogStream::new();
    static FAULT_STATE: FaultState = FaultState::new();
    static OVERFLOW: OverflowAccumulator = OverflowAccumulator::new();

    #[no_mangle]
    fn main() {
        // Initialize ESP-IDF
        esp_idf_sys::link_patches();

        match run() {
            Ok(never) => match never {},
            Err(err) => {
                // SAFETY: Tag and format are NUL-terminated and the format
                // matches the args; esp_err_to_name returns a static C string.
                unsafe {
                    esp_idf_sys::esp_log_write(
                        esp_idf_sys::esp_log_level_t_ESP_LOG_ERROR,
                        c"lrc".as_ptr(),
                        c"bring-up failed: %s (0x%x)\n".as_ptr(),
                        esp_idf_sys::esp_err_to_name(err.code()),
                        err.code(),
                    );
                }

                // Outputs float (locked rotor) until the board comes back up.
                // SAFETY: esp_restart has no preconditions and does not return.
                unsafe { esp_idf_sys::esp_restart() }
            }
        }
    }

    fn run() -> Result<Infallible, EspError> {
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        let mut log_sink = UartLogSink::new(
            peripherals.uart1,
            pins.gpio17,
            &UartLoggerConfig::default(),
        )?;

        // Channel pin map: TACH in, alarm out
        let channels: [Channel<OpenDrainChannel>; NUM_CHANNELS] = [
            Channel::new(
                OpenDrainChannel::new(pins.gpio4.downgrade(), pins.gpio5.downgrade())?,
                CONFIG,
            ),
            Channel::new(
                OpenDrainChannel::new(pins.gpio6.downgrade(), pins.gpio7.downgrade())?,
                CONFIG,
            ),
        ];

        let mut jiffies = TickSource::new(GroupTimer::new(&OVERFLOW)?, &OVERFLOW);
        jiffies.init();

        rt_info!(LOG_STREAM, jiffies.now(), "{}", env!("VERSION_STRING"));
        rt_info!(
            LOG_STREAM,
            jiffies.now(),
            "window {} threshold {} spin-up {}",
            CONFIG.sample_jiffies,
            CONFIG.toggle_threshold,
            CONFIG.spin_up_jiffies()
        );

        let dispatcher = Dispatcher::new(channels, &LOG_STREAM, &FAULT_STATE);
        dispatcher.run(&jiffies, || log_sink.poll(&LOG_STREAM))
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {}
