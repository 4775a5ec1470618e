//! Connects a local transaction source to a federation server and mines
//! whatever `training_request`s arrive until the connection closes.
use clap::Parser;
use hui_core::{Config, TextFileSource};
use hui_federated::FederatedClient;

#[derive(Parser)]
#[command(about = "Join a high-utility itemset mining federation as a client")]
struct Args {
    #[arg(long)]
    client_id: String,
    #[arg(long)]
    server_host: String,
    #[arg(long, default_value_t = 9000)]
    server_port: u16,
    #[arg(long)]
    transactions: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = Box::new(TextFileSource::new(&args.transactions));
    let client = FederatedClient::new(args.client_id, source, Config::new());
    client.run((args.server_host.as_str(), args.server_port))
}
