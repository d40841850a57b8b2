use std::sync::{Arc, Mutex};

use anyhow::{ensure, Result};
use clap::Parser;
use sensor_core::{
    observer_handle, ScreenDisplay, TemperatureLog, TemperatureSensor, ThresholdAlarm,
};
use shared::{domain::Celsius, protocol::Reaction};

#[derive(Parser, Debug)]
struct Args {
    /// Readings to feed through the sensor, in order (e.g. --readings 25,35,40).
    #[arg(long, value_delimiter = ',', required = true)]
    readings: Vec<f64>,
    /// Alarm threshold in °C; readings strictly above it raise the alarm.
    #[arg(long, default_value_t = 30.0)]
    threshold: f64,
    /// Detach the alarm observer after this many readings.
    #[arg(long)]
    detach_alarm_after: Option<usize>,
    /// Print the recorded history at the end.
    #[arg(long)]
    show_history: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    ensure!(
        args.threshold.is_finite(),
        "threshold must be a finite number"
    );

    let logger = Arc::new(Mutex::new(TemperatureLog::new()));
    let alarm = observer_handle(ThresholdAlarm::new(Celsius(args.threshold)));

    let mut sensor = TemperatureSensor::new();
    sensor.attach(observer_handle(ScreenDisplay));
    sensor.attach(logger.clone());
    sensor.attach(alarm.clone());

    let mut alarm_attached = true;
    for (index, raw) in args.readings.iter().enumerate() {
        if alarm_attached && args.detach_alarm_after == Some(index) {
            sensor.detach(&alarm)?;
            alarm_attached = false;
            println!("[sensor] alarm observer detached");
        }

        let value = Celsius(*raw);
        let report = sensor.set_value(value)?;
        println!("[sensor] temperature updated to {value}");
        for reaction in &report.reactions {
            match reaction {
                Reaction::Display { rendered } => println!("[display] {rendered}"),
                Reaction::Logged { recorded_at, value } => {
                    println!("[logger] {recorded_at} - {value}")
                }
                Reaction::AlarmRaised { value, threshold } => {
                    println!("[alarm] {value} is above the {threshold} threshold!")
                }
            }
        }
        for failure in &report.failures {
            eprintln!("[{}] reaction failed: {}", failure.observer, failure.message);
        }
    }

    if args.show_history {
        let history = logger
            .lock()
            .map_err(|_| anyhow::anyhow!("logger state is poisoned"))?
            .export();
        println!("recorded history ({} entries):", history.len());
        for entry in history {
            println!("  {}  {}", entry.recorded_at, entry.value);
        }
    }

    Ok(())
}
