use anyhow::Result;
use clap::Parser;
use tokio::runtime::Builder;

use dss_manager::{
    cli::{Cli, Command},
    client, manager,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Manager(args) => manager::serve(args.listen).await,
        Command::User(args) => client::run_user(args).await,
        Command::Disk(args) => client::run_disk(args).await,
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(run(cli.command));
    // A pending stdin read holds a blocking thread that only returns on
    // the next line; do not wait for it after ctrl-c.
    runtime.shutdown_background();
    result
}
