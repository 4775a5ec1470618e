/// Every tunable recognised across the mining engine and the federated
/// layer (§6 EXTERNAL INTERFACES). Constructed once and threaded through by
/// reference; no process-global state. Every cap defaults to `None`
/// (unbounded) per the non-goal that the reference implementation's
/// hard-coded limits are a performance hack, not a contract.
#[derive(Debug, Clone)]
pub struct Config {
    // Mining / verifier
    min_utility: u64,
    max_recursion_depth: Option<usize>,
    max_items_per_level: Option<usize>,
    max_items_per_projection: Option<usize>,
    max_path_length: Option<usize>,
    max_phuis_retained: Option<usize>,
    approximate_when_candidates_exceed: Option<usize>,
    max_items_per_transaction: Option<usize>,
    ub_relaxation_factor: f64,
    projection_cache_size: Option<usize>,
    bounds_cache_size: Option<usize>,

    // Federated
    num_rounds: u32,
    min_clients: usize,
    client_sampling_rate: f64,
    use_dp: bool,
    epsilon: f64,
    sensitivity: f64,
    round_timeout_seconds: u64,
    listen_host: String,
    listen_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_utility: 0,
            max_recursion_depth: None,
            max_items_per_level: None,
            max_items_per_projection: None,
            max_path_length: None,
            max_phuis_retained: None,
            approximate_when_candidates_exceed: None,
            max_items_per_transaction: None,
            ub_relaxation_factor: 1.2,
            projection_cache_size: None,
            bounds_cache_size: None,

            num_rounds: 1,
            min_clients: 1,
            client_sampling_rate: 1.0,
            use_dp: false,
            epsilon: 1.0,
            sensitivity: 1.0,
            round_timeout_seconds: 300,
            listen_host: "127.0.0.1".to_string(),
            listen_port: 9000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_utility(mut self, min_utility: u64) -> Self {
        self.min_utility = min_utility;
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = Some(depth);
        self
    }

    pub fn with_max_items_per_level(mut self, n: usize) -> Self {
        self.max_items_per_level = Some(n);
        self
    }

    pub fn with_max_items_per_projection(mut self, n: usize) -> Self {
        self.max_items_per_projection = Some(n);
        self
    }

    pub fn with_max_path_length(mut self, n: usize) -> Self {
        self.max_path_length = Some(n);
        self
    }

    pub fn with_max_phuis_retained(mut self, n: usize) -> Self {
        self.max_phuis_retained = Some(n);
        self
    }

    pub fn with_approximate_when_candidates_exceed(mut self, n: usize) -> Self {
        self.approximate_when_candidates_exceed = Some(n);
        self
    }

    pub fn with_max_items_per_transaction(mut self, n: usize) -> Self {
        self.max_items_per_transaction = Some(n);
        self
    }

    pub fn with_ub_relaxation_factor(mut self, factor: f64) -> Self {
        self.ub_relaxation_factor = factor;
        self
    }

    pub fn with_projection_cache_size(mut self, n: usize) -> Self {
        self.projection_cache_size = Some(n);
        self
    }

    pub fn with_bounds_cache_size(mut self, n: usize) -> Self {
        self.bounds_cache_size = Some(n);
        self
    }

    pub fn with_num_rounds(mut self, n: u32) -> Self {
        self.num_rounds = n;
        self
    }

    pub fn with_min_clients(mut self, n: usize) -> Self {
        self.min_clients = n;
        self
    }

    pub fn with_client_sampling_rate(mut self, rate: f64) -> Self {
        self.client_sampling_rate = rate;
        self
    }

    pub fn with_dp(mut self, epsilon: f64, sensitivity: f64) -> Self {
        self.use_dp = true;
        self.epsilon = epsilon;
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_round_timeout_seconds(mut self, secs: u64) -> Self {
        self.round_timeout_seconds = secs;
        self
    }

    pub fn with_listen_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.listen_host = host.into();
        self.listen_port = port;
        self
    }

    pub fn min_utility(&self) -> u64 {
        self.min_utility
    }

    pub fn max_recursion_depth(&self) -> Option<usize> {
        self.max_recursion_depth
    }

    pub fn max_items_per_level(&self) -> Option<usize> {
        self.max_items_per_level
    }

    pub fn max_items_per_projection(&self) -> Option<usize> {
        self.max_items_per_projection
    }

    pub fn max_path_length(&self) -> Option<usize> {
        self.max_path_length
    }

    pub fn max_phuis_retained(&self) -> Option<usize> {
        self.max_phuis_retained
    }

    pub fn approximate_when_candidates_exceed(&self) -> Option<usize> {
        self.approximate_when_candidates_exceed
    }

    pub fn max_items_per_transaction(&self) -> Option<usize> {
        self.max_items_per_transaction
    }

    pub fn ub_relaxation_factor(&self) -> f64 {
        self.ub_relaxation_factor
    }

    pub fn projection_cache_size(&self) -> Option<usize> {
        self.projection_cache_size
    }

    pub fn bounds_cache_size(&self) -> Option<usize> {
        self.bounds_cache_size
    }

    pub fn num_rounds(&self) -> u32 {
        self.num_rounds
    }

    pub fn min_clients(&self) -> usize {
        self.min_clients
    }

    pub fn client_sampling_rate(&self) -> f64 {
        self.client_sampling_rate
    }

    pub fn use_dp(&self) -> bool {
        self.use_dp
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn round_timeout_seconds(&self) -> u64 {
        self.round_timeout_seconds
    }

    pub fn listen_host(&self) -> &str {
        &self.listen_host
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }
}
