// src/core/scanner/port_scanner.rs

use crate::core::dispatcher::ProbeTask;
use crate::core::knowledge_base::PortService;
use crate::core::models::{Category, ProbeResult, Target, TaskId};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// One connect probe per table entry. Budgeting is left to the dispatcher.
pub fn port_tasks(target: &Target, table: &[PortService], connect_timeout: Duration) -> Vec<ProbeTask> {
    table
        .iter()
        .map(|&entry| {
            let host = target.to_string();
            ProbeTask::new(TaskId::new(Category::Ports, entry.port.to_string()), async move {
                probe_port(&host, entry, connect_timeout).await
            })
        })
        .collect()
}

/// Attempts a TCP connect. Refused, unreachable and timed-out ports are all
/// "closed or filtered", which is an expected negative and not a failure.
pub async fn probe_port(host: &str, entry: PortService, connect_timeout: Duration) -> ProbeResult {
    match timeout(connect_timeout, TcpStream::connect((host, entry.port))).await {
        Ok(Ok(_stream)) => {
            debug!(host, port = entry.port, service = entry.service, "Port open.");
            Ok(Some(format!("{} ({})", entry.port, entry.service)))
        }
        Ok(Err(e)) => {
            debug!(host, port = entry.port, error = %e, "Port closed.");
            Ok(None)
        }
        Err(_) => {
            debug!(host, port = entry.port, "Port filtered (connect timed out).");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collector::collect;
    use crate::core::dispatcher::{ConcurrencyBudget, Dispatcher};
    use tokio::net::TcpListener;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn reports_only_the_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = closed_port().await;

        let table = [PortService { port: open, service: "TEST" }, PortService { port: closed, service: "OTHER" }];
        let target = Target::parse("127.0.0.1").unwrap();
        let tasks = port_tasks(&target, &table, Duration::from_millis(500));
        let report = collect(Category::Ports, Dispatcher::new(ConcurrencyBudget::new(2).unwrap()).spawn(tasks)).await;

        let texts: Vec<&str> = report.findings.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec![format!("{open} (TEST)").as_str()]);
        assert_eq!(report.clear, 1);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn closed_port_is_not_a_failure() {
        let port = closed_port().await;
        let result = probe_port("127.0.0.1", PortService { port, service: "X" }, Duration::from_millis(200)).await;
        assert!(matches!(result, Ok(None)));
    }
}
