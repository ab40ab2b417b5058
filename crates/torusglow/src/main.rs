mod cli;
mod config;
mod panel;
mod paths;
mod run;

use anyhow::{Context, Result};
use cli::{Command, ConfigAction, RunArgs};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action, &cli.run),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction, args: &RunArgs) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = run::effective_config(args)?;
            let text = config
                .to_toml_string()
                .context("failed to render configuration")?;
            print!("{text}");
        }
        ConfigAction::Path => {
            let path = config::resolve_config_path(args)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
