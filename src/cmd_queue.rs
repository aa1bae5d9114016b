//! Queue subcommand handlers for durq.

use serde_json::Value;
use tracing::{debug, info};

use durq_queue::{JobId, Queue, QueueConfig, QueueEvent};

use crate::cli::Commands;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the queue, run one subcommand and close it again.
pub(crate) async fn handle_queue_command(command: Commands, config: &QueueConfig) -> CmdResult {
    let queue: Queue<Value> = Queue::new(config)?;
    queue.open().await?;
    debug!(location = %config.location, "Queue ready");

    let result = match command {
        Commands::Add { payload } => queue_add(&queue, &payload).await,
        Commands::Len => queue_len(&queue),
        Commands::Has { id } => queue_has(&queue, JobId::new(id)).await,
        Commands::Find { payload, first } => queue_find(&queue, &payload, first).await,
        Commands::Delete { id } => queue_delete(&queue, JobId::new(id)).await,
        Commands::Drain { limit } => queue_drain(&queue, limit).await,
        Commands::Verify => queue_verify(&queue).await,
    };

    queue.close().await?;
    result
}

fn parse_payload(raw: &str) -> Result<Value, Box<dyn std::error::Error>> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON payload: {}", e).into())
}

/// Append a job and print its ID.
async fn queue_add(queue: &Queue<Value>, raw: &str) -> CmdResult {
    let payload = parse_payload(raw)?;
    let id = queue.add(payload).await?;
    println!("{}", id);
    Ok(())
}

fn queue_len(queue: &Queue<Value>) -> CmdResult {
    println!("{}", queue.len().unwrap_or(0));
    Ok(())
}

async fn queue_has(queue: &Queue<Value>, id: JobId) -> CmdResult {
    println!("{}", queue.has(id).await?);
    Ok(())
}

/// Print matching job IDs, oldest first.
async fn queue_find(queue: &Queue<Value>, raw: &str, first: bool) -> CmdResult {
    let pattern = parse_payload(raw)?;
    let ids: Vec<JobId> = if first {
        queue.first_job_id(&pattern).await?.into_iter().collect()
    } else {
        queue.job_ids(&pattern).await?
    };

    if ids.is_empty() {
        println!("No matching jobs.");
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

async fn queue_delete(queue: &Queue<Value>, id: JobId) -> CmdResult {
    queue.delete(id).await?;
    println!("Deleted job {}", id);
    Ok(())
}

/// Deliver jobs in order, acknowledging each after it is printed.
async fn queue_drain(queue: &Queue<Value>, limit: Option<usize>) -> CmdResult {
    if queue.is_empty()? || limit == Some(0) {
        info!("Nothing to drain");
        return Ok(());
    }

    let mut events = queue.subscribe();
    queue.start()?;

    let mut handled = 0usize;
    while let Some(event) = events.recv().await {
        match event {
            QueueEvent::Next(job) => {
                println!("{}\t{}", job.id, job.payload);
                queue.done().await?;
                handled += 1;
                if limit.is_some_and(|limit| handled >= limit) {
                    queue.stop();
                    break;
                }
            }
            QueueEvent::Empty => break,
            QueueEvent::Fault(message) => {
                return Err(format!("Queue halted: {}", message).into());
            }
            _ => {}
        }
    }

    info!(handled, remaining = queue.len().unwrap_or(0), "Drain finished");
    Ok(())
}

async fn queue_verify(queue: &Queue<Value>) -> CmdResult {
    let count = queue.verify_count().await?;
    println!("OK: {} jobs", count);
    Ok(())
}
