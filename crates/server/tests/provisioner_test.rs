use assert_matches::assert_matches;
use harbor_jetstream_memory::{MemoryConnector, Operation};
use harbor_server::{
    ConsumerSpec, DeliverPolicy, Endpoint, Error, ProvisioningStage, Provisioner, StorageType,
    StreamSpec,
};

fn endpoint() -> Endpoint {
    Endpoint::new("localhost", 4222)
}

fn stream(name: &str) -> StreamSpec {
    StreamSpec::new(name).with_subjects([format!("{}.*", name.to_lowercase())])
}

fn create_stream(name: &str) -> Operation {
    Operation::CreateStream(name.to_string())
}

fn create_consumer(stream: &str, durable: &str) -> Operation {
    Operation::CreateConsumer {
        stream: stream.to_string(),
        durable: durable.to_string(),
    }
}

#[tokio::test]
async fn test_empty_list_does_not_connect() {
    let connector = MemoryConnector::new();
    let provisioner = Provisioner::new(connector.clone());

    provisioner.apply(&endpoint(), &[]).await.unwrap();

    assert!(connector.operations().await.is_empty());
}

#[tokio::test]
async fn test_creates_in_list_order() {
    let connector = MemoryConnector::new();
    let provisioner = Provisioner::new(connector.clone());

    let streams = vec![
        stream("A")
            .with_storage(StorageType::Memory)
            .with_consumer(ConsumerSpec::new("a1"))
            .with_consumer(ConsumerSpec::new("a2").with_deliver_policy(DeliverPolicy::New)),
        stream("B").with_consumer(ConsumerSpec::new("b1").with_max_ack_pending(10)),
    ];

    provisioner.apply(&endpoint(), &streams).await.unwrap();

    assert_eq!(
        connector.operations().await,
        vec![
            Operation::Connect(endpoint()),
            create_stream("A"),
            create_consumer("A", "a1"),
            create_consumer("A", "a2"),
            create_stream("B"),
            create_consumer("B", "b1"),
            Operation::Close,
        ]
    );

    let a = connector.stream("A").await.unwrap();
    assert_eq!(a.subjects, vec!["a.*".to_string()]);
    assert_eq!(a.storage, StorageType::Memory);
    assert_eq!(a.replicas, 1);

    let a2 = connector.consumer("A", "a2").await.unwrap();
    assert_eq!(a2.deliver_policy, DeliverPolicy::New);
    assert_eq!(a2.max_deliver, 5);

    let b1 = connector.consumer("B", "b1").await.unwrap();
    assert_eq!(b1.max_ack_pending, 10);
}

#[tokio::test]
async fn test_connection_failure_creates_nothing() {
    let connector = MemoryConnector::new();
    connector.fail_connect().await;
    let provisioner = Provisioner::new(connector.clone());

    let result = provisioner.apply(&endpoint(), &[stream("A")]).await;

    assert_matches!(result, Err(Error::Connection(_)));
    assert_eq!(
        connector.operations().await,
        vec![Operation::Connect(endpoint())]
    );
    assert!(connector.streams().await.is_empty());
}

#[tokio::test]
async fn test_stream_failure_stops_before_its_consumers() {
    let connector = MemoryConnector::new();
    connector.fail_stream("B").await;
    let provisioner = Provisioner::new(connector.clone());

    let streams = vec![
        stream("A").with_consumer(ConsumerSpec::new("a1")),
        stream("B").with_consumer(ConsumerSpec::new("b1")),
        stream("C"),
    ];

    let result = provisioner.apply(&endpoint(), &streams).await;

    assert_matches!(
        result,
        Err(Error::Provisioning { ref stream, stage: ProvisioningStage::Stream, .. }) if stream == "B"
    );
    assert_eq!(connector.streams().await, vec!["A".to_string()]);
    assert_eq!(connector.consumers("A").await, vec!["a1".to_string()]);
    assert_eq!(
        connector.operations().await,
        vec![
            Operation::Connect(endpoint()),
            create_stream("A"),
            create_consumer("A", "a1"),
            create_stream("B"),
            Operation::Close,
        ]
    );
}

#[tokio::test]
async fn test_consumer_failure_keeps_earlier_consumers() {
    let connector = MemoryConnector::new();
    connector.fail_consumer("A", "c2").await;
    let provisioner = Provisioner::new(connector.clone());

    let streams = vec![
        stream("A")
            .with_consumer(ConsumerSpec::new("c1"))
            .with_consumer(ConsumerSpec::new("c2"))
            .with_consumer(ConsumerSpec::new("c3")),
        stream("B"),
    ];

    let result = provisioner.apply(&endpoint(), &streams).await;

    let error = result.unwrap_err();
    assert_matches!(
        &error,
        Error::Provisioning { stream, stage: ProvisioningStage::Consumer { durable }, .. }
            if stream == "A" && durable == "c2"
    );
    assert!(error.to_string().starts_with("error creating consumer c2 for stream A"));

    assert_eq!(connector.streams().await, vec!["A".to_string()]);
    assert_eq!(connector.consumers("A").await, vec!["c1".to_string()]);
    assert_eq!(connector.operations().await.last(), Some(&Operation::Close));
}

#[tokio::test]
async fn test_reapplying_surfaces_broker_rejection() {
    let connector = MemoryConnector::new();
    let provisioner = Provisioner::new(connector.clone());
    let streams = vec![stream("A")];

    provisioner.apply(&endpoint(), &streams).await.unwrap();
    let result = provisioner.apply(&endpoint(), &streams).await;

    let error = result.unwrap_err();
    assert!(error.to_string().starts_with("error creating stream A"));
}
