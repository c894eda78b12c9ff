use std::{sync::Arc, time::Duration};

use log::*;
use payment_gateway_engine::{GatewayDirectory, OutboundChannel, TaskSupervisor, TransactionRouter};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};

use crate::{config::ServerConfig, errors::ServerError, transport};

const DRAIN_POLL_PERIOD: Duration = Duration::from_millis(100);

/// Runs the payment gateway on stdin and stdout until stdin is closed or the process is interrupted.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();
    run_with_io(config, input, output, shutdown_signal()).await
}

/// Runs the payment gateway over the given transport.
///
/// When `input` is exhausted, every payment in progress is allowed to finish before the supervisor shuts down. When
/// `interrupt` completes first, the payments in progress are stopped instead.
pub async fn run_with_io<R, W, S>(config: ServerConfig, input: R, output: W, interrupt: S) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: std::future::Future<Output = ()>,
{
    let directory = build_directory(&config);
    let outbound = OutboundChannel::new(config.outbound_buffer);
    let publisher = Arc::new(outbound.subscribe());
    let supervisor = Arc::new(TaskSupervisor::new(config.supervisor.clone(), directory, publisher)?);
    let writer = tokio::spawn(outbound.run(transport::line_writer(output)));
    let router = TransactionRouter::new(Arc::clone(&supervisor));

    tokio::select! {
        result = transport::read_messages(input, &router) => {
            let count = result?;
            info!("🚀️ Input closed after {count} messages. Waiting for payments in progress to finish.");
            supervisor.wait_until_idle(DRAIN_POLL_PERIOD).await;
        },
        _ = interrupt => {
            info!("🚀️ Interrupted. Stopping {} payments in progress.", supervisor.active_transactions().await.len());
        },
    }
    supervisor.shutdown().await;
    // The outbound writer stops once the last publisher, held by the supervisor, is gone
    drop(router);
    drop(supervisor);
    writer.await.map_err(|e| ServerError::Unspecified(format!("The outbound writer did not shut down cleanly. {e}")))?;
    info!("🚀️ Payment gateway has shut down");
    Ok(())
}

pub fn build_directory(config: &ServerConfig) -> GatewayDirectory {
    let mut directory = GatewayDirectory::new();
    if config.gateway_test_mode {
        for method in &config.stub_methods {
            info!("🚀️ Payments by '{method}' will be settled by the test gateway");
            directory.register_stub(method, config.stub);
        }
    }
    directory
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("🚀️ Could not listen for the interrupt signal. {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use payment_gateway_engine::StubGatewayConfig;
    use serde_json::Value;
    use tokio::io::{duplex, AsyncReadExt, BufReader};

    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            gateway_test_mode: true,
            stub_methods: vec!["algorand".into()],
            stub: StubGatewayConfig { timeout: Duration::from_millis(5), retries: 3 },
            ..Default::default()
        }
    }

    fn processed_line(id: &str, method: &str) -> String {
        format!(
            r#"{{"topic":"transaction.processed","payload":{{"transaction":{{"transaction_id":"{id}","value":"1","currency":"ALGO","payment_method":"{method}"}},"sender":{{"user_id":"a","wallet_id":"wa"}},"receiver":{{"user_id":"b","wallet_id":"wb"}}}}}}"#
        )
    }

    #[test]
    fn stub_methods_are_registered_in_test_mode_only() {
        let config = test_config();
        assert!(build_directory(&config).supports("algorand"));
        let config = ServerConfig { gateway_test_mode: false, ..test_config() };
        assert!(!build_directory(&config).supports("algorand"));
    }

    #[tokio::test]
    async fn drains_payments_when_input_closes() {
        let input = format!("{}\n{}\n", processed_line("X1", "algorand"), processed_line("X2", "paypal"));
        let (client, mut server) = duplex(4096);
        run_with_io(test_config(), BufReader::new(input.as_bytes()), client, std::future::pending())
            .await
            .unwrap();
        let mut output = String::new();
        server.read_to_string(&mut output).await.unwrap();
        let lines = output.lines().map(|l| serde_json::from_str::<Value>(l).unwrap()).collect::<Vec<_>>();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["topic"], "monitor.process");
        assert_eq!(lines[0]["payload"]["to_topic"], "transaction.succeeded");
        assert_eq!(lines[0]["payload"]["payload"]["transaction_id"], "X1");
    }
}
