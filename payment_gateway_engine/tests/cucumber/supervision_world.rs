use std::{sync::Arc, time::Duration};

use cucumber::World;
use log::*;
use payment_gateway_engine::{
    config::{PoolConfig, SupervisorConfig, WorkerConfig},
    test_utils::{GatewayScript, RecordingPublisher, ScriptBook},
    GatewayDirectory,
    TaskSupervisor,
    TransactionRouter,
};

#[derive(Debug, World)]
pub struct SupervisionWorld {
    pub scripts: Vec<(String, GatewayScript)>,
    pub poll_period: Duration,
    pub retries: u32,
    pub processing_time: Duration,
    pub max_workers: usize,
    pub system: Option<GatewaySystem>,
}

impl Default for SupervisionWorld {
    fn default() -> Self {
        Self {
            scripts: Vec::new(),
            poll_period: Duration::from_millis(10),
            retries: 10,
            processing_time: Duration::from_secs(5),
            max_workers: 8,
            system: None,
        }
    }
}

#[derive(Debug)]
pub struct GatewaySystem {
    pub supervisor: Arc<TaskSupervisor>,
    pub router: TransactionRouter,
    pub book: ScriptBook,
    pub publisher: Arc<RecordingPublisher>,
}

impl SupervisionWorld {
    /// The running system. It is started on first use, once every gateway has been described.
    pub fn system(&mut self) -> &GatewaySystem {
        if self.system.is_none() {
            self.system = Some(self.start_system());
        }
        self.system.as_ref().expect("system was just started")
    }

    fn start_system(&self) -> GatewaySystem {
        let book = ScriptBook::new();
        let mut directory = GatewayDirectory::new();
        for (method, script) in &self.scripts {
            let script = script.clone().with_timing(self.poll_period, self.retries);
            book.register(&mut directory, method, script);
        }
        let config = SupervisorConfig {
            pool: PoolConfig {
                min_workers: 0,
                max_workers: self.max_workers,
                task_capacity: 64,
                idle_timeout: Duration::from_secs(1),
            },
            worker: WorkerConfig::default().with_processing_time(self.processing_time),
            ..Default::default()
        };
        let publisher = Arc::new(RecordingPublisher::new());
        let supervisor = TaskSupervisor::new(config, directory, publisher.clone()).expect("Invalid test configuration");
        let supervisor = Arc::new(supervisor);
        debug!("🚀️ Supervisor started: {supervisor:?}");
        let router = TransactionRouter::new(Arc::clone(&supervisor));
        GatewaySystem { supervisor, router, book, publisher }
    }
}
