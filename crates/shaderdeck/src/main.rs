mod builder;
mod cli;
mod config;
mod defaults;
mod paths;
mod run;
mod state;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::run(args)
}
