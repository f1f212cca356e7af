use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, error, info, warn};

use crate::analysis::processor::Processor;
use crate::dispatch::{DispatchError, ProcessRequest, ProcessingDispatcher};

const POP_TIMEOUT_SECS: u64 = 5;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Pushes jobs onto a Redis list named after the processing target
/// (`PROCESS_FUNCTION`). Jobs survive an API restart until a worker pops them.
#[derive(Clone)]
pub struct RedisQueueDispatcher {
    connection: MultiplexedConnection,
    queue: String,
}

impl RedisQueueDispatcher {
    pub async fn connect(client: &redis::Client, queue: &str) -> Result<Self, DispatchError> {
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Processing jobs queued on Redis list '{queue}'");
        Ok(Self {
            connection,
            queue: queue.to_string(),
        })
    }
}

#[async_trait]
impl ProcessingDispatcher for RedisQueueDispatcher {
    async fn dispatch(&self, analysis_id: &str) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(&ProcessRequest {
            analysis_id: analysis_id.to_string(),
        })?;
        let mut connection = self.connection.clone();
        connection.lpush::<_, _, ()>(&self.queue, payload).await?;
        debug!(analysis_id, queue = %self.queue, "Queued processing job");
        Ok(())
    }
}

/// Consumes the queue forever, running each job on its own task.
/// Connection errors are logged and the loop reconnects; a job that was popped
/// is processed once and never requeued.
pub async fn run_queue_worker(client: redis::Client, queue: String, processor: Arc<Processor>) {
    info!("Queue worker listening on '{queue}'");
    loop {
        let mut connection = match client.get_multiplexed_async_connection().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Queue worker cannot reach Redis ({e}); retrying connection");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        loop {
            let popped: redis::RedisResult<Option<(String, String)>> = redis::cmd("BRPOP")
                .arg(&queue)
                .arg(POP_TIMEOUT_SECS)
                .query_async(&mut connection)
                .await;

            match popped {
                Ok(Some((_, payload))) => spawn_job(&payload, &processor),
                Ok(None) => continue,
                Err(e) => {
                    warn!("Queue worker lost its connection ({e})");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    break;
                }
            }
        }
    }
}

fn spawn_job(payload: &str, processor: &Arc<Processor>) {
    match parse_payload(payload) {
        Some(request) => {
            let processor = Arc::clone(processor);
            tokio::spawn(async move {
                processor.process(&request.analysis_id).await;
            });
        }
        None => error!("Dropping malformed queue payload: {payload}"),
    }
}

fn parse_payload(payload: &str) -> Option<ProcessRequest> {
    serde_json::from_str::<ProcessRequest>(payload)
        .ok()
        .filter(|request| !request.analysis_id.trim().is_empty())
}
