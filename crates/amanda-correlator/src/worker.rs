//! Long-lived streaming correlation task

use std::sync::Arc;

use amanda_domain::{CorrelatedFact, Observation};
use amanda_graph::StructuralGraph;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::correlator::{Checkpoint, Correlator};
use crate::error::CorrelatorError;
use crate::metrics::CorrelatorMetrics;

/// How a worker run ended
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    /// Where to resume a later run
    pub checkpoint: Checkpoint,

    /// Final counters
    pub metrics: CorrelatorMetrics,

    /// True if the run was cancelled rather than drained
    pub cancelled: bool,
}

/// A stopped worker: its report and the correlator it drove
///
/// The correlator keeps its floor and dedup state, so it can be handed to
/// the next worker of the same scope.
#[derive(Debug)]
pub struct WorkerExit {
    /// How the run ended
    pub report: WorkerReport,

    /// Correlator state after the run
    pub correlator: Correlator,
}

enum Next {
    Cancelled,
    Graph(bool),
    Observation(Option<Observation>),
}

/// Streaming correlator for one scope
///
/// Reads observations from a channel, follows graph snapshots published for
/// the scope and sends facts downstream. The run suspends while waiting for
/// input and never blocks other scopes.
pub struct CorrelatorWorker {
    correlator: Correlator,
    graphs: watch::Receiver<Option<Arc<StructuralGraph>>>,
}

impl CorrelatorWorker {
    /// Create a worker around a correlator and a graph subscription
    pub fn new(correlator: Correlator, graphs: watch::Receiver<Option<Arc<StructuralGraph>>>) -> Self {
        Self { correlator, graphs }
    }

    /// Spawn the worker on the current runtime
    ///
    /// Returns the task handle and the receiving end of the fact channel.
    pub fn spawn(
        self,
        input: mpsc::Receiver<Observation>,
        cancel: CancellationToken,
    ) -> (JoinHandle<Result<WorkerExit, CorrelatorError>>, mpsc::Receiver<CorrelatedFact>) {
        let (tx, rx) = mpsc::channel(self.correlator.config().channel_capacity.max(1));
        let handle = tokio::spawn(self.run(input, tx, cancel));
        (handle, rx)
    }

    /// Run until the input closes or the token is cancelled
    ///
    /// On cancellation buffered observations are dropped, not flushed.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<Observation>,
        output: mpsc::Sender<CorrelatedFact>,
        cancel: CancellationToken,
    ) -> Result<WorkerExit, CorrelatorError> {
        let scope = self.correlator.scope().clone();
        info!(scope = %scope, "Starting correlator worker");

        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            ready = self.graphs.wait_for(Option::is_some) => Some(ready.map(|graph| graph.clone())),
        };
        let mut graph = match first {
            None => return Ok(self.finish(true)),
            Some(Ok(Some(graph))) => graph,
            Some(_) => {
                return Err(CorrelatorError::Worker(format!(
                    "graph registry closed before scope {} was built",
                    scope
                )))
            }
        };

        let mut graphs_open = true;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Next::Cancelled,
                changed = self.graphs.changed(), if graphs_open => Next::Graph(changed.is_ok()),
                observation = input.recv() => Next::Observation(observation),
            };

            match next {
                Next::Cancelled => {
                    let dropped = self.correlator.discard();
                    info!(scope = %scope, dropped, "Correlator worker cancelled");
                    return Ok(self.finish(true));
                }
                Next::Graph(true) => {
                    let latest = self.graphs.borrow_and_update().clone();
                    if let Some(latest) = latest {
                        debug!(scope = %scope, version = latest.version(), "Correlating against new graph snapshot");
                        graph = latest;
                    }
                }
                Next::Graph(false) => {
                    graphs_open = false;
                }
                Next::Observation(Some(observation)) => {
                    let facts = self.correlator.push(&graph, observation);
                    emit(&output, facts).await?;
                }
                Next::Observation(None) => {
                    let facts = self.correlator.flush(&graph);
                    emit(&output, facts).await?;
                    return Ok(self.finish(false));
                }
            }
        }
    }

    fn finish(self, cancelled: bool) -> WorkerExit {
        let metrics = self.correlator.metrics().clone();
        info!(scope = %self.correlator.scope(), "Correlator worker stopped\n{}", metrics.summary());
        WorkerExit {
            report: WorkerReport {
                checkpoint: self.correlator.checkpoint(),
                metrics,
                cancelled,
            },
            correlator: self.correlator,
        }
    }
}

async fn emit(output: &mpsc::Sender<CorrelatedFact>, facts: Vec<CorrelatedFact>) -> Result<(), CorrelatorError> {
    for fact in facts {
        output.send(fact).await.map_err(|_| CorrelatorError::ChannelClosed)?;
    }
    Ok(())
}
