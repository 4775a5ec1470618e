use crate::aggregator::{aggregate, AggregationReport, ClientContribution, MergePolicy};
use crate::dp::{LaplaceMechanism, PrivacyBudget};
use crate::record::HuiRecord;
use crate::wire::{is_timeout, read_message, write_message, Message, RegistrationStatus, ServerConfigSummary, TrainingStatistics};
use hui_core::Config;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write as _;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const HEARTBEAT_ACTIVE_WINDOW: Duration = Duration::from_secs(60);
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const CLIENT_WAIT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const ROUND_POLL_INTERVAL: Duration = Duration::from_millis(500);

struct ClientHandle {
    address: SocketAddr,
    write_half: Mutex<TcpStream>,
    last_seen: Mutex<Instant>,
    data_size: u64,
    min_utility: u64,
    active: Mutex<bool>,
}

/// Long-lived TCP coordinator for federated rounds (§4.I). Threads: one
/// acceptor, one handler per connected client, and one orchestrator driving
/// the round state machine. All shared mutations go through the advisory
/// locks on `clients` and `pending`.
pub struct FederatedServer {
    config: Config,
    output_dir: PathBuf,
    clients: Mutex<HashMap<String, Arc<ClientHandle>>>,
    pending: Mutex<HashMap<String, (Vec<HuiRecord>, TrainingStatistics, f64)>>,
    round_counts: Mutex<HashMap<String, u64>>,
    cumulative_bytes: Mutex<u64>,
    privacy_budget: Mutex<PrivacyBudget>,
    current_round: AtomicU64,
    running: AtomicBool,
}

#[derive(Debug, Clone, Serialize)]
struct PersistedResults {
    items_and_utilities: Vec<HuiRecord>,
}

#[derive(Debug, Clone, Serialize)]
struct PersistedMetrics {
    rounds_completed: u64,
    clients_contributing: Vec<String>,
    client_round_counts: HashMap<String, u64>,
    total_huis: usize,
    privacy_budget_consumed: f64,
    cumulative_communication_cost_bytes: u64,
    data_heterogeneity: f64,
}

impl FederatedServer {
    pub fn new(config: Config, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            clients: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            round_counts: Mutex::new(HashMap::new()),
            cumulative_bytes: Mutex::new(0),
            privacy_budget: Mutex::new(PrivacyBudget::new()),
            current_round: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }

    /// Marks the server as not-running: the acceptor unblocks, handlers
    /// exit on their next I/O check, no new rounds start (§5 cancellation).
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Binds the listening socket and runs until `num_rounds` rounds
    /// complete or `stop()` is called. A bind failure is the one `Fatal`
    /// case in §7; everything else is recovered locally.
    pub fn run(self: &Arc<Self>) -> anyhow::Result<()> {
        let listener = TcpListener::bind((self.config.listen_host(), self.config.listen_port()))?;
        listener.set_nonblocking(true)?;
        log::info!("federated server listening on {}:{}", self.config.listen_host(), self.config.listen_port());

        std::fs::create_dir_all(&self.output_dir)?;

        let acceptor_server = Arc::clone(self);
        let acceptor = std::thread::spawn(move || acceptor_server.accept_loop(listener));

        self.orchestrate()?;
        self.stop();
        acceptor.join().ok();
        Ok(())
    }

    fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        while self.is_running() {
            match listener.accept() {
                Ok((stream, addr)) => {
                    let server = Arc::clone(&self);
                    std::thread::spawn(move || server.handle_client(stream, addr));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    log::warn!("accept failed: {e}");
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }
    }

    fn handle_client(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_read_timeout(Some(Duration::from_secs(30))) {
            log::warn!("could not set read timeout for {addr}: {e}");
            return;
        }
        let mut read_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(e) => {
                log::warn!("could not clone stream for {addr}: {e}");
                return;
            }
        };

        let mut registered_id: Option<String> = None;

        while self.is_running() {
            match read_message(&mut read_stream) {
                Ok(Some(message)) => {
                    if let Some(id) = self.dispatch(&stream, addr, message) {
                        registered_id = Some(id);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    if is_timeout(&e) {
                        continue;
                    }
                    log::warn!("closing connection to {addr}: {e}");
                    break;
                }
            }
        }

        if let Some(id) = registered_id {
            if let Some(handle) = self.clients.lock().unwrap().get(&id) {
                *handle.active.lock().unwrap() = false;
            }
        }
    }

    /// Returns the registering client's id when `message` was a `Register`,
    /// so the caller can remember it for deactivation on disconnect.
    fn dispatch(&self, stream: &TcpStream, addr: SocketAddr, message: Message) -> Option<String> {
        match message {
            Message::Register {
                client_id,
                data_size,
                min_utility,
            } => {
                let write_half = stream.try_clone().ok()?;
                let handle = Arc::new(ClientHandle {
                    address: addr,
                    write_half: Mutex::new(write_half),
                    last_seen: Mutex::new(Instant::now()),
                    data_size,
                    min_utility,
                    active: Mutex::new(true),
                });
                self.clients.lock().unwrap().insert(client_id.clone(), handle.clone());
                let ack = Message::RegistrationAck {
                    status: RegistrationStatus::Success,
                    server_config: ServerConfigSummary {
                        min_utility: self.config.min_utility(),
                        num_rounds: self.config.num_rounds(),
                        use_dp: self.config.use_dp(),
                    },
                };
                send(&handle.write_half, &ack);
                Some(client_id)
            }
            Message::Heartbeat { client_id } => {
                let clients = self.clients.lock().unwrap();
                if let Some(handle) = clients.get(&client_id) {
                    *handle.last_seen.lock().unwrap() = Instant::now();
                    *handle.active.lock().unwrap() = true;
                    send(&handle.write_half, &Message::HeartbeatAck);
                }
                None
            }
            Message::TrainingResults {
                round,
                huis,
                statistics,
                training_time,
            } => {
                if round != self.current_round.load(Ordering::SeqCst) {
                    log::debug!("dropping stale training results for round {round}");
                    return None;
                }
                if let Some(id) = self.client_id_for_addr(addr) {
                    self.pending.lock().unwrap().insert(id, (huis, statistics, training_time));
                }
                None
            }
            _ => None,
        }
    }

    fn client_id_for_addr(&self, addr: SocketAddr) -> Option<String> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .find(|(_, handle)| handle.address == addr)
            .map(|(id, _)| id.clone())
    }

    fn active_clients(&self) -> Vec<String> {
        let now = Instant::now();
        self.clients
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, handle)| {
                *handle.active.lock().unwrap() && now.duration_since(*handle.last_seen.lock().unwrap()) < HEARTBEAT_ACTIVE_WINDOW
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn orchestrate(&self) -> anyhow::Result<()> {
        while self.is_running() && self.active_clients().len() < self.config.min_clients() {
            std::thread::sleep(CLIENT_WAIT_POLL_INTERVAL);
        }

        for round in 1..=self.config.num_rounds() {
            if !self.is_running() {
                break;
            }
            self.run_round(round as u64);
        }
        Ok(())
    }

    fn run_round(&self, round: u64) {
        self.current_round.store(round, Ordering::SeqCst);

        let active = self.active_clients();
        let sample_count = (self.config.client_sampling_rate() * active.len() as f64).ceil() as usize;
        let sample_count = sample_count.min(active.len()).max(if active.is_empty() { 0 } else { 1 });

        let mut rng = rand::rng();
        let sampled: Vec<String> = active.choose_multiple(&mut rng, sample_count).cloned().collect();

        self.pending.lock().unwrap().clear();

        {
            let clients = self.clients.lock().unwrap();
            let request = Message::TrainingRequest {
                round,
                min_utility: self.config.min_utility(),
                timeout_seconds: self.config.round_timeout_seconds(),
            };
            for id in &sampled {
                if let Some(handle) = clients.get(id) {
                    send(&handle.write_half, &request);
                }
            }
        }

        let deadline = Instant::now() + Duration::from_secs(self.config.round_timeout_seconds());
        loop {
            let responded = self.pending.lock().unwrap().len();
            if responded >= sampled.len() || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(ROUND_POLL_INTERVAL);
        }

        let pending = self.pending.lock().unwrap().clone();
        let data_sizes: Vec<u64> = {
            let clients = self.clients.lock().unwrap();
            sampled.iter().filter_map(|id| clients.get(id).map(|h| h.data_size)).collect()
        };
        let contributions: Vec<ClientContribution> = sampled
            .iter()
            .filter_map(|id| {
                pending.get(id).map(|(huis, _, _)| {
                    let min_utility = self
                        .clients
                        .lock()
                        .unwrap()
                        .get(id)
                        .map(|h| h.min_utility)
                        .unwrap_or(self.config.min_utility());
                    ClientContribution {
                        client_id: id.clone(),
                        huis: huis.clone(),
                        min_utility,
                    }
                })
            })
            .collect();

        if contributions.is_empty() {
            log::warn!("round {round} produced no results from {} sampled clients", sampled.len());
        }

        let prior_bytes = *self.cumulative_bytes.lock().unwrap();
        let mut round_counts = self.round_counts.lock().unwrap();
        let mut report = aggregate(
            &contributions,
            MergePolicy::Sum,
            self.config.min_utility(),
            prior_bytes,
            &mut round_counts,
            &data_sizes,
        );
        drop(round_counts);
        *self.cumulative_bytes.lock().unwrap() = report.cumulative_communication_cost_bytes;

        if self.config.use_dp() {
            self.apply_dp(&mut report, contributions.len());
        }

        self.persist(round, &report);
    }

    fn apply_dp(&self, report: &mut AggregationReport, client_count: usize) {
        let mechanism = LaplaceMechanism::new(self.config.epsilon(), self.config.sensitivity());
        let mut rng = rand::rng();
        let min_utility = self.config.min_utility();
        report.merged.retain_mut(|record| {
            record.utility = mechanism.perturb(record.utility, &mut rng);
            record.utility >= min_utility
        });

        let mut budget = self.privacy_budget.lock().unwrap();
        for _ in 0..client_count {
            budget.spend(self.config.epsilon());
        }
    }

    fn persist(&self, round: u64, report: &AggregationReport) {
        let epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let results_path = self.output_dir.join(format!("federated_results_{epoch}.json"));
        let metrics_path = self.output_dir.join(format!("federated_metrics_{epoch}.json"));

        let results = PersistedResults {
            items_and_utilities: report.merged.clone(),
        };
        if let Err(e) = write_json(&results_path, &results) {
            log::error!("failed to persist round {round} results: {e}");
        }

        let metrics = PersistedMetrics {
            rounds_completed: round,
            clients_contributing: report.contributing_clients.clone(),
            client_round_counts: report.client_round_counts.clone(),
            total_huis: report.merged.len(),
            privacy_budget_consumed: self.privacy_budget.lock().unwrap().consumed(),
            cumulative_communication_cost_bytes: report.cumulative_communication_cost_bytes,
            data_heterogeneity: report.data_heterogeneity,
        };
        if let Err(e) = write_json(&metrics_path, &metrics) {
            log::error!("failed to persist round {round} metrics: {e}");
        }
    }
}

fn write_json<T: Serialize>(path: &std::path::Path, value: &T) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn send(write_half: &Mutex<TcpStream>, message: &Message) {
    let mut stream = write_half.lock().unwrap();
    if let Err(e) = write_message(&mut *stream, message) {
        log::warn!("failed to send {message:?}: {e}");
    }
}

