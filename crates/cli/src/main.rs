use clap::Parser;

use stockroom_cli::{Cli, run};

fn main() {
    stockroom_observability::init_pretty();

    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            tracing::error!("{err:#}");
            std::process::exit(1);
        }
    }
}
