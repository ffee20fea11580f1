use std::path::PathBuf;
use std::time::Duration;

use assert_matches::assert_matches;
use harbor_bootable::Bootable;
use harbor_engine_mock::{MockEngineFactory, MockEvent};
use harbor_jetstream_memory::{MemoryConnector, Operation};
use harbor_server::{
    ConsumerSpec, Error, ProvisioningStage, ServerConfig, ServerManager, ServerManagerOptions,
    ServerState, StreamSpec,
};

fn config() -> ServerConfig {
    ServerConfig::builder()
        .with_ready_timeout(Duration::from_millis(200))
        .build()
}

fn manager(
    config: ServerConfig,
    engine_factory: &MockEngineFactory,
    connector: &MemoryConnector,
    streams: Vec<StreamSpec>,
) -> ServerManager<MockEngineFactory, MemoryConnector> {
    ServerManager::new(ServerManagerOptions {
        config,
        connector: connector.clone(),
        engine_factory: engine_factory.clone(),
        streams,
    })
}

fn orders() -> StreamSpec {
    StreamSpec::new("ORDERS")
        .with_subjects(["orders.*"])
        .with_consumer(ConsumerSpec::new("billing"))
}

#[tokio::test]
async fn test_start_stop_start_uses_fresh_engine() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, Vec::new());

    manager.start().await.unwrap();
    assert_eq!(manager.state().await, ServerState::Ready);

    manager.stop().await;
    assert_eq!(manager.state().await, ServerState::Stopped);

    manager.start().await.unwrap();
    assert_eq!(manager.state().await, ServerState::Ready);
    manager.stop().await;

    assert_eq!(factory.created(), 2);
    assert_eq!(factory.shutdowns(), 2);
    assert!(connector.operations().await.is_empty());
}

#[tokio::test]
async fn test_passes_native_config_and_logger_flags() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let config = ServerConfig::builder()
        .with_port(4333)
        .with_store_dir("/tmp/harbor-js")
        .with_trace(true)
        .with_ready_timeout(Duration::from_millis(200))
        .build();
    let manager = manager(config, &factory, &connector, Vec::new());

    manager.start().await.unwrap();

    let events = factory.events();
    assert_matches!(
        &events[0],
        MockEvent::Created(native)
            if native.port == 4333
                && native.host == "localhost"
                && native.no_sigs
                && native.store_dir == Some(PathBuf::from("/tmp/harbor-js"))
    );
    assert_eq!(
        &events[1..],
        &[
            MockEvent::Started,
            MockEvent::LoggerSet {
                trace: true,
                debug: false
            },
        ]
    );
    assert!(factory.logger().is_some());

    manager.stop().await;
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, Vec::new());

    manager.start().await.unwrap();

    assert_matches!(manager.start().await, Err(Error::AlreadyStarted));
    assert_eq!(factory.created(), 1);

    manager.stop().await;
}

#[tokio::test]
async fn test_never_ready_engine_times_out() {
    let factory = MockEngineFactory::new().never_ready();
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, vec![orders()]);

    let result = manager.start().await;

    assert_matches!(result, Err(Error::ReadinessTimeout(timeout)) if timeout == Duration::from_millis(200));
    assert_eq!(manager.state().await, ServerState::Stopped);
    assert_eq!(factory.events().last(), Some(&MockEvent::Dropped));
    assert!(connector.operations().await.is_empty());

    // Nothing is held, so stopping is a no-op.
    manager.stop().await;
    assert_eq!(factory.shutdowns(), 0);
}

#[tokio::test]
async fn test_slow_engine_within_timeout_is_ready() {
    let factory = MockEngineFactory::new().with_ready_delay(Duration::from_millis(20));
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, Vec::new());

    manager.start().await.unwrap();

    assert_eq!(manager.state().await, ServerState::Ready);
    manager.stop().await;
}

#[tokio::test]
async fn test_construction_failure_is_start_error() {
    let factory = MockEngineFactory::new().with_create_failure("bad store dir");
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, Vec::new());

    let error = manager.start().await.unwrap_err();

    assert_matches!(error, Error::Start(_));
    assert!(error.to_string().contains("bad store dir"));
    assert!(error.to_string().starts_with("error starting server"));
    assert_eq!(manager.state().await, ServerState::Stopped);
}

#[tokio::test]
async fn test_launch_failure_is_start_error() {
    let factory = MockEngineFactory::new().with_start_failure("address in use");
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, Vec::new());

    assert_matches!(manager.start().await, Err(Error::Start(_)));
    assert_eq!(manager.state().await, ServerState::Stopped);
}

#[tokio::test]
async fn test_provisions_configured_streams() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, vec![orders()]);

    manager.start().await.unwrap();

    assert_eq!(connector.streams().await, vec!["ORDERS".to_string()]);
    assert_eq!(
        connector.consumers("ORDERS").await,
        vec!["billing".to_string()]
    );
    assert_eq!(
        connector.operations().await.first(),
        Some(&Operation::Connect(harbor_server::Endpoint::new(
            "localhost",
            4222
        )))
    );

    manager.stop().await;
}

#[tokio::test]
async fn test_provisioning_failure_leaves_engine_running() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    connector.fail_consumer("ORDERS", "billing").await;
    let manager = manager(config(), &factory, &connector, vec![orders()]);

    let result = manager.start().await;

    assert_matches!(
        result,
        Err(Error::Provisioning { stage: ProvisioningStage::Consumer { .. }, .. })
    );
    assert_eq!(manager.state().await, ServerState::Starting);
    assert_eq!(factory.shutdowns(), 0);

    manager.stop().await;

    assert_eq!(factory.shutdowns(), 1);
    assert_eq!(manager.state().await, ServerState::Stopped);
}

#[tokio::test]
async fn test_connection_failure_aborts_start() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    connector.fail_connect().await;
    let manager = manager(config(), &factory, &connector, vec![orders()]);

    assert_matches!(manager.start().await, Err(Error::Connection(_)));
    assert!(connector.streams().await.is_empty());

    manager.stop().await;
}

#[tokio::test]
async fn test_streams_ignored_without_jetstream() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let config = ServerConfig::builder()
        .with_jetstream(false)
        .with_ready_timeout(Duration::from_millis(200))
        .build();
    let manager = manager(config, &factory, &connector, vec![orders()]);

    manager.start().await.unwrap();

    assert!(connector.operations().await.is_empty());
    manager.stop().await;
}

#[tokio::test]
async fn test_invalid_config_never_creates_engine() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let manager = manager(
        config(),
        &factory,
        &connector,
        vec![StreamSpec::new("NO_SUBJECTS")],
    );

    assert_matches!(manager.start().await, Err(Error::Config(_)));
    assert_eq!(factory.created(), 0);
    assert_eq!(manager.state().await, ServerState::Stopped);
}

#[tokio::test]
async fn test_random_port_with_streams_is_rejected() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let config = ServerConfig::builder()
        .with_port(0)
        .with_ready_timeout(Duration::from_millis(200))
        .build();

    let with_streams = manager(config.clone(), &factory, &connector, vec![orders()]);
    assert_matches!(with_streams.start().await, Err(Error::Config(_)));
    assert_eq!(factory.created(), 0);

    let without_streams = manager(config, &factory, &connector, Vec::new());
    without_streams.start().await.unwrap();
    assert_eq!(without_streams.state().await, ServerState::Ready);
    without_streams.stop().await;
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, Vec::new());

    manager.stop().await;
    manager.stop().await;

    assert!(factory.events().is_empty());
    assert_eq!(manager.state().await, ServerState::Stopped);
}

#[tokio::test]
async fn test_drives_through_bootable() {
    let factory = MockEngineFactory::new();
    let connector = MemoryConnector::new();
    let manager = manager(config(), &factory, &connector, Vec::new());

    assert_eq!(manager.bootable_name(), "nats-server");

    Bootable::start(&manager).await.unwrap();
    assert_eq!(manager.state().await, ServerState::Ready);

    Bootable::shutdown(&manager).await;
    assert_eq!(manager.state().await, ServerState::Stopped);
}
