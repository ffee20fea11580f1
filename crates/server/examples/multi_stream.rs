use std::time::Duration;

use harbor_engine_process::ProcessEngineFactory;
use harbor_jetstream_nats::NatsConnector;
use harbor_server::{
    AckPolicy, ConsumerSpec, DeliverPolicy, ServerConfig, ServerManager, ServerManagerOptions,
    StreamSpec,
};
use tracing_subscriber::EnvFilter;

fn worker(durable: &str) -> ConsumerSpec {
    ConsumerSpec::new(durable)
        .with_ack_policy(AckPolicy::Explicit)
        .with_deliver_policy(DeliverPolicy::New)
        .with_max_ack_pending(10)
        .with_ack_wait(Duration::from_secs(30))
}

fn retrying(durable: &str) -> ConsumerSpec {
    ConsumerSpec::new(durable)
        .with_ack_policy(AckPolicy::Explicit)
        .with_max_deliver(5)
        .with_ack_wait(Duration::from_secs(30))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .init();

    let config = ServerConfig::builder()
        .with_debug(true)
        .with_trace(true)
        .with_store_dir(".nats/jetstream/")
        .with_ready_timeout(Duration::from_secs(5))
        .build();

    let streams = vec![
        StreamSpec::new("TASK_QUEUE")
            .with_subjects(["tasks.*"])
            .with_consumer(worker("worker1"))
            .with_consumer(worker("worker2")),
        StreamSpec::new("STREAM2")
            .with_subjects(["stream2.*"])
            .with_consumer(retrying("consumer3"))
            .with_consumer(retrying("consumer4")),
    ];

    let manager = ServerManager::new(ServerManagerOptions {
        config,
        connector: NatsConnector::default(),
        engine_factory: ProcessEngineFactory::default(),
        streams,
    });

    if let Err(e) = manager.start().await {
        manager.stop().await;
        return Err(e.into());
    }

    println!("Server is running. Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;

    manager.stop().await;

    Ok(())
}
