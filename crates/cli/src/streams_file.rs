use std::path::Path;
use std::time::Duration;

use harbor_server::{AckPolicy, ConsumerSpec, DeliverPolicy, StorageType, StreamSpec};
use serde::Deserialize;

use crate::Error;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StreamsFile {
    #[serde(default)]
    streams: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StreamEntry {
    name: String,
    subjects: Vec<String>,
    storage: Option<Storage>,
    replicas: Option<usize>,
    #[serde(default)]
    consumers: Vec<ConsumerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConsumerEntry {
    durable: String,
    ack_policy: Option<Ack>,
    ack_wait_secs: Option<u64>,
    deliver_policy: Option<Deliver>,
    max_ack_pending: Option<i64>,
    max_deliver: Option<i64>,
    start_sequence: Option<u64>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Storage {
    File,
    Memory,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Ack {
    Explicit,
    None,
    All,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Deliver {
    All,
    New,
    Last,
    LastPerSubject,
    ByStartSequence,
}

/// Reads stream definitions from a TOML file.
pub async fn load(path: &Path) -> Result<Vec<StreamSpec>, Error> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Io("failed to read streams file", e))?;

    parse(&contents)
}

pub fn parse(contents: &str) -> Result<Vec<StreamSpec>, Error> {
    let file: StreamsFile = toml::from_str(contents)?;

    file.streams.into_iter().map(stream_spec).collect()
}

fn stream_spec(entry: StreamEntry) -> Result<StreamSpec, Error> {
    let mut spec = StreamSpec::new(entry.name).with_subjects(entry.subjects);

    if let Some(storage) = entry.storage {
        spec = spec.with_storage(match storage {
            Storage::File => StorageType::File,
            Storage::Memory => StorageType::Memory,
        });
    }

    if let Some(replicas) = entry.replicas {
        spec = spec.with_replicas(replicas);
    }

    for consumer in entry.consumers {
        let consumer = consumer_spec(&spec.name, consumer)?;
        spec = spec.with_consumer(consumer);
    }

    Ok(spec)
}

fn consumer_spec(stream: &str, entry: ConsumerEntry) -> Result<ConsumerSpec, Error> {
    let mut spec = ConsumerSpec::new(entry.durable);

    if let Some(ack) = entry.ack_policy {
        spec = spec.with_ack_policy(match ack {
            Ack::Explicit => AckPolicy::Explicit,
            Ack::None => AckPolicy::None,
            Ack::All => AckPolicy::All,
        });
    }

    if let Some(secs) = entry.ack_wait_secs {
        spec = spec.with_ack_wait(Duration::from_secs(secs));
    }

    if let Some(deliver) = entry.deliver_policy {
        let policy = match (deliver, entry.start_sequence) {
            (Deliver::ByStartSequence, Some(sequence)) => DeliverPolicy::ByStartSequence(sequence),
            (Deliver::ByStartSequence, None) => {
                return Err(Error::StreamsFile(format!(
                    "consumer {} on stream {} delivers by start sequence but sets no start_sequence",
                    spec.durable, stream
                )));
            }
            (Deliver::All, _) => DeliverPolicy::All,
            (Deliver::New, _) => DeliverPolicy::New,
            (Deliver::Last, _) => DeliverPolicy::Last,
            (Deliver::LastPerSubject, _) => DeliverPolicy::LastPerSubject,
        };
        spec = spec.with_deliver_policy(policy);
    }

    if let Some(max_ack_pending) = entry.max_ack_pending {
        spec = spec.with_max_ack_pending(max_ack_pending);
    }

    if let Some(max_deliver) = entry.max_deliver {
        spec = spec.with_max_deliver(max_deliver);
    }

    Ok(spec)
}
