use clap::{Arg, Command};

pub fn build_cli() -> Command {
    Command::new("tracker-gnss")
        .version(crate::VERSION)
        .about("GNSS module detection and fix polling for tracker nodes")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Serial port of the NMEA receiver"),
        )
        .arg(
            Arg::new("baud")
                .short('b')
                .long("baud")
                .value_name("BAUD")
                .help("Baud rate of the NMEA receiver"),
        )
        .arg(
            Arg::new("bus")
                .long("bus")
                .value_name("DEVICE")
                .help("Bus device of the GNSS receiver"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .help("Seconds between poll attempts"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Record output format: hex, json or text"),
        )
        .subcommand(Command::new("detect").about("Detect the attached GNSS module and exit"))
        .subcommand(Command::new("poll").about("Run a single poll attempt and exit"))
}
