use std::time::Duration;

/// Where a stream keeps its messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageType {
    /// On disk in the broker's storage directory.
    #[default]
    File,

    /// In broker memory only.
    Memory,
}

/// How a consumer expects messages to be acknowledged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AckPolicy {
    /// Every message must be acknowledged individually.
    #[default]
    Explicit,

    /// No acknowledgment is expected.
    None,

    /// Acknowledging a message acknowledges all before it.
    All,
}

/// Where in the stream a new consumer starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliverPolicy {
    /// From the first message still in the stream.
    #[default]
    All,

    /// Only messages published after the consumer was created.
    New,

    /// From the last message in the stream.
    Last,

    /// From the last message of every subject.
    LastPerSubject,

    /// From the given stream sequence.
    ByStartSequence(u64),
}

/// Native stream configuration sent to the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Stream name.
    pub name: String,

    /// Subject patterns captured by the stream.
    pub subjects: Vec<String>,

    /// Storage backend.
    pub storage: StorageType,

    /// Number of replicas.
    pub replicas: usize,
}

/// Native durable consumer configuration sent to the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Durable name.
    pub durable: String,

    /// Acknowledgment policy.
    pub ack_policy: AckPolicy,

    /// Maximum delivery attempts per message.
    pub max_deliver: i64,

    /// How long the broker waits for an acknowledgment before redelivering.
    pub ack_wait: Duration,

    /// Starting point in the stream.
    pub deliver_policy: DeliverPolicy,

    /// Maximum outstanding unacknowledged messages. `0` leaves the broker default.
    pub max_ack_pending: i64,
}
