use clap::Parser;
use social_client::cli::{run_cli, Args};
use social_client::logging::init_logging;

fn main() {
    init_logging();
    let args = Args::parse();
    if let Err(e) = run_cli(args) {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}
