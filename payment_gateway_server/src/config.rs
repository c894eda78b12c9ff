use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use payment_gateway_engine::{
    config::{DEFAULT_STUB_RETRIES, DEFAULT_STUB_TIMEOUT},
    PoolConfig,
    StubGatewayConfig,
    SupervisorConfig,
};
use pgw_common::{parse_boolean_flag, parse_duration_ms};

const DEFAULT_STUB_METHODS: &str = "algorand";
const DEFAULT_OUTBOUND_BUFFER: usize = 256;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub supervisor: SupervisorConfig,
    /// When true, the payment methods in `stub_methods` are settled by the test gateway, which approves every
    /// payment. No other gateways are built into this server, so with test mode off every transaction is rejected.
    pub gateway_test_mode: bool,
    pub stub_methods: Vec<String>,
    pub stub: StubGatewayConfig,
    /// Outcomes that may be queued for the outbound transport before workers have to wait.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            gateway_test_mode: false,
            stub_methods: vec![DEFAULT_STUB_METHODS.to_string()],
            stub: StubGatewayConfig::default(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to its value. Invalid values are logged
    /// and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::default();
        let mut supervisor = defaults.supervisor;

        //-------------------------------------------------  Worker  ---------------------------------------------------
        let worker = &mut supervisor.worker;
        worker.payment_processing_time =
            duration_var(&lookup, "PGW_PAYMENT_PROCESSING_TIME_MS", worker.payment_processing_time);
        string_var(&lookup, "PGW_SUCCEEDED_TOPIC", &mut worker.succeeded_transaction_topic);
        string_var(&lookup, "PGW_FAILED_TOPIC", &mut worker.failed_transaction_topic);
        string_var(&lookup, "PGW_MONITOR_TOPIC", &mut worker.monitor_process_topic);

        //-------------------------------------------------  Inbound  --------------------------------------------------
        let topics = &mut supervisor.topics;
        string_var(&lookup, "PGW_PROCESSED_TOPIC", &mut topics.processed_transaction_topic);
        string_var(&lookup, "PGW_CANCELLED_TOPIC", &mut topics.cancelled_transaction_topic);

        //-------------------------------------------------  Pool  -----------------------------------------------------
        let pool = PoolConfig {
            min_workers: number_var(&lookup, "PGW_POOL_MIN_WORKERS", supervisor.pool.min_workers),
            max_workers: number_var(&lookup, "PGW_POOL_MAX_WORKERS", supervisor.pool.max_workers),
            task_capacity: number_var(&lookup, "PGW_POOL_TASK_CAPACITY", supervisor.pool.task_capacity),
            idle_timeout: duration_var(&lookup, "PGW_POOL_IDLE_TIMEOUT_MS", supervisor.pool.idle_timeout),
        };
        supervisor.pool = match pool.validate() {
            Ok(()) => pool,
            Err(e) => {
                warn!("🪛️ {e} Using the default pool configuration instead.");
                PoolConfig::default()
            },
        };

        //-------------------------------------------------  Gateways  -------------------------------------------------
        let gateway_test_mode = parse_boolean_flag(lookup("PGW_GATEWAY_TEST_MODE"), defaults.gateway_test_mode);
        let stub_methods = lookup("PGW_STUB_METHODS")
            .map(|s| s.split(',').map(str::trim).filter(|m| !m.is_empty()).map(String::from).collect::<Vec<_>>())
            .filter(|methods| !methods.is_empty())
            .unwrap_or(defaults.stub_methods);
        let stub = StubGatewayConfig {
            timeout: nonzero_duration_var(&lookup, "PGW_STUB_TIMEOUT_MS", DEFAULT_STUB_TIMEOUT),
            retries: number_var(&lookup, "PGW_STUB_RETRIES", DEFAULT_STUB_RETRIES),
        };
        if !gateway_test_mode {
            warn!(
                "🪛️ PGW_GATEWAY_TEST_MODE is off and no settlement rails are built into this server. Every \
                 transaction will be rejected."
            );
        }
        Self { supervisor, gateway_test_mode, stub_methods, stub, outbound_buffer: defaults.outbound_buffer }
    }
}

fn string_var<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, value: &mut String) {
    match lookup(name) {
        Some(s) if s.trim().is_empty() => warn!("🪛️ {name} is empty. Using the default, {value}, instead."),
        Some(s) => *value = s.trim().to_string(),
        None => {},
    }
}

fn number_var<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    lookup(name)
        .map(|s| {
            s.trim().parse::<T>().unwrap_or_else(|e| {
                warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
                default
            })
        })
        .unwrap_or(default)
}

fn duration_var<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: Duration) -> Duration {
    lookup(name)
        .map(|s| {
            parse_duration_ms(&s).unwrap_or_else(|e| {
                warn!(
                    "🪛️ {s} is not a valid number of milliseconds for {name}. {e} Using the default, {}ms, instead.",
                    default.as_millis()
                );
                default
            })
        })
        .unwrap_or(default)
}

fn nonzero_duration_var<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: Duration) -> Duration {
    let value = duration_var(lookup, name, default);
    if value.is_zero() {
        warn!("🪛️ {name} must be greater than zero. Using the default, {}ms, instead.", default.as_millis());
        return default;
    }
    value
}
