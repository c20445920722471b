use foundation_sync::config::{CoordinationConfig, Pacing};

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// `--config`, shared by every subcommand that needs a configuration.
pub fn config_arg() -> clap::Arg {
    clap::Arg::new("config")
        .long("config")
        .help("TOML file overriding the defaults")
        .action(clap::ArgAction::Set)
        .value_parser(clap::value_parser!(std::path::PathBuf))
}

pub fn register(command: clap::Command) -> clap::Command {
    command.subcommand(
        clap::Command::new("config")
            .about("prints the effective configuration as TOML")
            .arg(config_arg())
            .arg(
                clap::Arg::new("no_pacing")
                    .long("no-pacing")
                    .help("zero every delay")
                    .action(clap::ArgAction::SetTrue),
            ),
    )
}

/// Defaults, overlaid with the `--config` file and the pacing switch. Size
/// overrides belong to the subcommand that accepts them.
pub fn load(args: &clap::ArgMatches) -> std::result::Result<CoordinationConfig, BoxedError> {
    let mut config = match args.get_one::<std::path::PathBuf>("config") {
        Some(path) => CoordinationConfig::from_path(path.clone())?,
        None => CoordinationConfig::default(),
    };
    if args.get_flag("no_pacing") {
        config.pacing = Pacing::none();
    }
    Ok(config)
}

pub fn run(args: &clap::ArgMatches) -> std::result::Result<(), BoxedError> {
    let config = load(args)?;
    config.validate()?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
