// CLI binary entry point for flac-relay

mod cli;

use std::process;

use clap::Parser;

use cli::{commands, Commands, Config};

fn main() {
    let config = Config::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter())).init();

    let result = match &config.command {
        Commands::Serve(args) => commands::command_serve(args),
        Commands::Rewrite { input, output, tags } => commands::command_rewrite(input, output.as_ref(), tags),
        Commands::Inspect { files, format } => commands::command_inspect(files, *format),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        process::exit(1);
    }
}
