use anyhow::{Context, Result};
use clap::{App as Cli, AppSettings, Arg, ArgMatches, SubCommand};
use hash_history::app::App;
use hash_history::config::Config;
use std::path::Path;

fn main() -> Result<()> {
    let matches = Cli::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("DIR")
                .help("Sets a custom configuration directory")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("replay")
                .about("Replays a navigation script against a simulated browser")
                .arg(
                    Arg::with_name("SCRIPT")
                        .help("Path to the YAML navigation script")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("fcl")
                        .long("fcl")
                        .help("Every state carries its own session token"),
                )
                .arg(
                    Arg::with_name("deny-guard")
                        .long("deny-guard")
                        .help("Declines every request to leave a guarded area"),
                ),
        )
        .subcommand(
            SubCommand::with_name("init-config")
                .about("Writes the configuration file with its current values"),
        )
        .get_matches();

    match matches.subcommand() {
        ("replay", Some(sub)) => replay(&matches, sub),
        ("init-config", Some(sub)) => init_config(&matches, sub),
        _ => Ok(()),
    }
}

fn load_config(matches: &ArgMatches, sub: &ArgMatches) -> Result<Config> {
    let mut config = Config::new();
    config
        .load(sub.value_of("config").or_else(|| matches.value_of("config")))
        .context("Failed to load configuration")?;
    Ok(config)
}

fn replay(matches: &ArgMatches, sub: &ArgMatches) -> Result<()> {
    let mut config = load_config(matches, sub)?;
    if sub.is_present("fcl") {
        config.fcl_enabled = true;
    }
    if sub.is_present("deny-guard") {
        config.confirm_guard_crossing = false;
    }
    let script_path = Path::new(sub.value_of("SCRIPT").unwrap_or_default());

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?
        .block_on(App::start(config, script_path))
}

fn init_config(matches: &ArgMatches, sub: &ArgMatches) -> Result<()> {
    let config = load_config(matches, sub)?;
    config.save().context("Failed to save configuration")?;
    if let Some(path) = config.file_path() {
        println!("{}", path.display());
    }
    Ok(())
}
