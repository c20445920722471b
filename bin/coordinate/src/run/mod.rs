use foundation_sync::{Driver, Selection};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn register(command: clap::Command) -> clap::Command {
    command.subcommand(
        clap::Command::new("run")
            .about("runs the selected patterns one after another")
            .arg(config::config_arg())
            .arg(
                clap::Arg::new("pattern")
                    .long("pattern")
                    .action(clap::ArgAction::Set)
                    .value_parser([
                        "all",
                        "producer-consumer",
                        "readers-writers",
                        "dining-philosophers",
                    ])
                    .default_value("all"),
            )
            .arg(
                clap::Arg::new("capacity")
                    .long("capacity")
                    .help("bounded channel capacity")
                    .action(clap::ArgAction::Set)
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                clap::Arg::new("ring_size")
                    .long("ring-size")
                    .help("number of philosophers and forks")
                    .action(clap::ArgAction::Set)
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                clap::Arg::new("no_pacing")
                    .long("no-pacing")
                    .help("run without the demo delays")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                clap::Arg::new("verbose")
                    .long("verbose")
                    .short('v')
                    .action(clap::ArgAction::SetTrue)
                    .conflicts_with("quiet"),
            )
            .arg(
                clap::Arg::new("quiet")
                    .long("quiet")
                    .short('q')
                    .action(clap::ArgAction::SetTrue),
            ),
    )
}

pub fn run(args: &clap::ArgMatches) -> std::result::Result<(), BoxedError> {
    let level = if args.get_flag("verbose") {
        Level::DEBUG
    } else if args.get_flag("quiet") {
        Level::WARN
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = config::load(args)?;
    if let Some(capacity) = args.get_one::<usize>("capacity") {
        settings.channel.capacity = *capacity;
    }
    if let Some(ring_size) = args.get_one::<usize>("ring_size") {
        settings.ring.ring_size = *ring_size;
    }

    let selection = match args.get_one::<String>("pattern") {
        Some(pattern) => pattern.parse::<Selection>()?,
        None => Selection::All,
    };

    coord_logs::info!(%selection, "starting coordination run");
    let driver = Driver::new(settings)?;
    let summary = driver.run(selection)?;

    println!("{summary}");
    Ok(())
}
