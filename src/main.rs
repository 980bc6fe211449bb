use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{info, warn};
use std::thread;
use std::time::Duration;

use tracker_gnss::cli::build_cli;
use tracker_gnss::diag::{ConsoleSink, Diagnostics, SerialSink};
use tracker_gnss::gnss::{FixPoller, ModuleDetector, NmeaSource, TrackerRecord};
use tracker_gnss::hal::CdevPowerRail;
use tracker_gnss::ubx::GnssBusClient;
use tracker_gnss::TrackerConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();
    let config = TrackerConfig::from_matches(&matches).map_err(|e| anyhow!("{}", e))?;

    let mut diag = Diagnostics::new();
    if config.diagnostics.console {
        diag.attach(Box::new(ConsoleSink));
    }
    if let Some(aux_port) = &config.diagnostics.aux_port {
        match SerialSink::new(aux_port, config.diagnostics.aux_baud) {
            Ok(sink) => diag.attach(Box::new(sink)),
            Err(e) => warn!("Auxiliary diagnostic port unavailable: {}", e),
        }
    }

    let mut rail = CdevPowerRail::new(
        &config.gpio_chip,
        config.rail_enable_line,
        config.module_power_line,
    )?;

    let detector = ModuleDetector::new(&config);
    let mut module = detector.detect(&mut rail, &mut diag)?;
    info!("Detected GNSS module: {}", module.kind);

    if matches.subcommand_matches("detect").is_some() {
        println!("{}", module.kind);
        return Ok(());
    }

    let mut poller =
        FixPoller::new().with_timeout(Duration::from_secs(config.fix_timeout_secs));
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("hex")
        .to_string();
    let single_shot = matches.subcommand_matches("poll").is_some();

    loop {
        let success = poller.poll(
            module.kind,
            module.serial.as_mut().map(|s| s as &mut dyn NmeaSource),
            module.bus.as_mut().map(|b| b as &mut dyn GnssBusClient),
            &mut diag,
        );

        if success {
            print_record(poller.record(), &format);
        }

        if single_shot {
            std::process::exit(if success { 0 } else { 1 });
        }

        thread::sleep(Duration::from_secs(config.poll_interval_secs));
    }
}

fn print_record(record: &TrackerRecord, format: &str) {
    match format {
        "json" => {
            let payload = serde_json::json!({
                "latitude": record.latitude(),
                "longitude": record.longitude(),
                "altitude": record.altitude(),
                "speed": record.speed(),
                "hdop": record.hdop(),
                "satellites": record.satellites(),
                "timestamp": Utc::now().timestamp(),
            });
            println!("{}", payload);
        }
        "text" => {
            println!(
                "{} lat={:.5} lon={:.5} alt={}m speed={}m/s hdop={} sats={}",
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
                record.latitude() as f64 / 100_000.0,
                record.longitude() as f64 / 100_000.0,
                record.altitude(),
                record.speed(),
                record.hdop(),
                record.satellites(),
            );
        }
        _ => println!("{}", hex::encode(record.as_bytes())),
    }
}
