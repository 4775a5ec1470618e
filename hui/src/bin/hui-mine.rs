//! Runs the mining + verification pipeline against a local transaction file
//! and prints the resulting high-utility itemsets, one per line.
use clap::Parser;
use hui_core::{Config, TextFileSource};
use hui_mining::{build_tree, mine, verify, ItemStatistics};

#[derive(Parser)]
#[command(about = "Mine high-utility itemsets from a local transaction file")]
struct Args {
    #[arg(long)]
    transactions: String,
    #[arg(long)]
    min_utility: u64,
    #[arg(long)]
    max_items_per_transaction: Option<usize>,
    #[arg(long)]
    timeout_seconds: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = TextFileSource::new(&args.transactions);
    let config = Config::new().with_min_utility(args.min_utility);
    let config = match args.max_items_per_transaction {
        Some(n) => config.with_max_items_per_transaction(n),
        None => config,
    };

    let stats = ItemStatistics::compute(&source);
    let tree = build_tree(&source, &stats, args.min_utility, config.max_items_per_transaction());
    let timeout = args.timeout_seconds.map(std::time::Duration::from_secs);
    let (candidates, mining_stats) = mine(&tree, &stats, &config, timeout);
    let result = verify(&candidates, &source, &config);

    log::info!(
        "mined {} candidates ({} early terminations), {} verified huis",
        candidates.len(),
        mining_stats.early_termination,
        result.huis.len()
    );
    for itemset in &result.huis {
        let items: Vec<String> = itemset.items().iter().map(|i| i.to_string()).collect();
        println!("{} : {}", items.join(" "), itemset.utility());
    }
    Ok(())
}
