mod config;
mod run;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn main() -> std::result::Result<(), BoxedError> {
    let commander = config::register(run::register(
        clap::Command::new("coordinate")
            .about("Runs classic thread coordination patterns and reports what happened")
            .arg_required_else_help(true),
    ));

    let matches = commander.get_matches();
    match matches.subcommand() {
        Some(("run", arguments)) => run::run(arguments)?,
        Some(("config", arguments)) => config::run(arguments)?,
        _ => {}
    }

    Ok(())
}
