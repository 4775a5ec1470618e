//! Starts a federated coordination server and runs it until `num_rounds`
//! complete or the process is interrupted.
use clap::Parser;
use hui_core::Config;
use hui_federated::FederatedServer;
use std::sync::Arc;

#[derive(Parser)]
#[command(about = "Run a high-utility itemset mining federation server")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 9000)]
    port: u16,
    #[arg(long, default_value_t = 0)]
    min_utility: u64,
    #[arg(long, default_value_t = 1)]
    num_rounds: u32,
    #[arg(long, default_value_t = 1)]
    min_clients: usize,
    #[arg(long, default_value_t = 1.0)]
    client_sampling_rate: f64,
    #[arg(long, default_value_t = 300)]
    round_timeout_seconds: u64,
    #[arg(long)]
    epsilon: Option<f64>,
    #[arg(long, default_value_t = 1.0)]
    sensitivity: f64,
    #[arg(long, default_value = "./hui-output")]
    output_dir: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::new()
        .with_min_utility(args.min_utility)
        .with_num_rounds(args.num_rounds)
        .with_min_clients(args.min_clients)
        .with_client_sampling_rate(args.client_sampling_rate)
        .with_round_timeout_seconds(args.round_timeout_seconds)
        .with_listen_addr(args.host, args.port);
    if let Some(epsilon) = args.epsilon {
        config = config.with_dp(epsilon, args.sensitivity);
    }

    let server = Arc::new(FederatedServer::new(config, args.output_dir));

    let stop_handle = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log::info!("interrupted, stopping after the current round");
        stop_handle.stop();
    })?;

    server.run()
}
