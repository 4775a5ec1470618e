use crate::record::HuiRecord;
use crate::wire::{is_timeout, read_message, write_message, Message, TrainingStatistics};
use hui_core::{Config, TransactionSource};
use hui_mining::{build_tree, mine, verify, ItemStatistics};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Parallel to the server (§4.J). A main/message thread processes incoming
/// requests serially — a `training_request` arriving while one is already
/// being mined simply waits in the OS socket buffer until this thread loops
/// back to read it, which gives the "only one local mining task at a time"
/// contract without an explicit queue. A heartbeat thread emits `heartbeat`
/// every 30 s on a cloned write half.
pub struct FederatedClient {
    client_id: String,
    source: Box<dyn TransactionSource + Send + Sync>,
    config: Config,
    running: Arc<AtomicBool>,
}

impl FederatedClient {
    pub fn new(client_id: impl Into<String>, source: Box<dyn TransactionSource + Send + Sync>, config: Config) -> Self {
        Self {
            client_id: client_id.into(),
            source,
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Connects, registers, and runs until the connection drops or
    /// `stop()` is called. On socket failure or a deserialisation error the
    /// connection is dropped and an error returned to the operator, who may
    /// call `run` again to reconnect (§4.J).
    pub fn run(&self, server_addr: impl ToSocketAddrs) -> anyhow::Result<()> {
        let mut stream = TcpStream::connect(server_addr)?;
        let data_size = self.local_data_size();

        write_message(
            &mut stream,
            &Message::Register {
                client_id: self.client_id.clone(),
                data_size,
                min_utility: self.config.min_utility(),
            },
        )?;

        let write_half = Arc::new(Mutex::new(stream.try_clone()?));
        let mut read_half = stream;
        read_half.set_read_timeout(Some(Duration::from_secs(30)))?;

        let heartbeat_running = Arc::clone(&self.running);
        let heartbeat_write = Arc::clone(&write_half);
        let client_id = self.client_id.clone();
        let heartbeat = std::thread::spawn(move || heartbeat_loop(heartbeat_running, heartbeat_write, client_id));

        let result = self.message_loop(&mut read_half, &write_half);
        self.stop();
        heartbeat.join().ok();
        result
    }

    fn local_data_size(&self) -> u64 {
        self.source.transactions().count() as u64
    }

    fn message_loop(&self, read_half: &mut TcpStream, write_half: &Arc<Mutex<TcpStream>>) -> anyhow::Result<()> {
        while self.running.load(Ordering::SeqCst) {
            match read_message(read_half) {
                Ok(Some(Message::TrainingRequest {
                    round,
                    min_utility,
                    timeout_seconds,
                })) => {
                    let (huis, statistics, training_time) = self.mine_locally(min_utility, timeout_seconds);
                    let reply = Message::TrainingResults {
                        round,
                        huis,
                        statistics,
                        training_time,
                    };
                    let mut stream = write_half.lock().unwrap();
                    write_message(&mut *stream, &reply)?;
                }
                Ok(Some(Message::RegistrationAck { status, .. })) => {
                    log::info!("registration acknowledged: {status:?}");
                }
                Ok(Some(Message::HeartbeatAck)) => {}
                Ok(Some(other)) => {
                    log::debug!("ignoring unexpected message: {other:?}");
                }
                Ok(None) => {
                    log::info!("server closed the connection");
                    break;
                }
                Err(e) => {
                    if is_timeout(&e) {
                        continue;
                    }
                    log::warn!("dropping connection: {e}");
                    return Err(anyhow::anyhow!("federated client connection failed: {e}"));
                }
            }
        }
        Ok(())
    }

    /// Runs §4.C-§4.F locally against this client's transactions, bounded by
    /// the round's `timeout_seconds` (§4.J cooperative cancellation).
    fn mine_locally(&self, min_utility: u64, timeout_seconds: u64) -> (Vec<HuiRecord>, TrainingStatistics, f64) {
        let started = Instant::now();
        let config = self.config.clone().with_min_utility(min_utility);
        let stats = ItemStatistics::compute(self.source.as_ref());
        let tree = build_tree(self.source.as_ref(), &stats, min_utility, config.max_items_per_transaction());
        let (candidates, mining_stats) = mine(&tree, &stats, &config, Some(Duration::from_secs(timeout_seconds)));
        let result = verify(&candidates, self.source.as_ref(), &config);

        let statistics = TrainingStatistics {
            transactions_processed: self.local_data_size(),
            candidates_considered: candidates.len() as u64,
            early_terminations: mining_stats.early_termination,
        };
        let huis: Vec<HuiRecord> = result.huis.iter().map(HuiRecord::from).collect();
        (huis, statistics, started.elapsed().as_secs_f64())
    }
}

fn heartbeat_loop(running: Arc<AtomicBool>, write_half: Arc<Mutex<TcpStream>>, client_id: String) {
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(HEARTBEAT_INTERVAL);
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let mut stream = write_half.lock().unwrap();
        if let Err(e) = write_message(&mut *stream, &Message::Heartbeat { client_id: client_id.clone() }) {
            log::warn!("heartbeat failed: {e}");
            break;
        }
    }
}
