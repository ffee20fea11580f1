use harbor_jetstream::{Connection, Connector, Endpoint};
use tracing::{debug, info};

use crate::config::StreamSpec;
use crate::error::{Error, ProvisioningStage, Result};

/// Creates streams and their consumers on a running engine.
///
/// Everything happens in list order over one connection owned by the call.
/// The first failure stops the run. Whatever was created before it stays.
#[derive(Clone, Debug)]
pub struct Provisioner<C>
where
    C: Connector,
{
    connector: C,
}

impl<C> Provisioner<C>
where
    C: Connector,
{
    /// Creates a new `Provisioner` using `connector` for its connections.
    pub const fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Creates every stream in `streams`, each followed by its consumers.
    ///
    /// An empty list does not connect at all.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if no connection could be opened, or
    /// `Error::Provisioning` naming the stream (and consumer) that failed.
    pub async fn apply(&self, endpoint: &Endpoint, streams: &[StreamSpec]) -> Result<()> {
        if streams.is_empty() {
            return Ok(());
        }

        let connection = self
            .connector
            .connect(endpoint)
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let result = create_all(&connection, streams).await;

        connection.close().await;

        result
    }
}

async fn create_all<N>(connection: &N, streams: &[StreamSpec]) -> Result<()>
where
    N: Connection,
{
    for stream in streams {
        connection
            .create_stream(&stream.stream_config())
            .await
            .map_err(|e| Error::Provisioning {
                stream: stream.name.clone(),
                stage: ProvisioningStage::Stream,
                source: Box::new(e),
            })?;

        debug!("created stream {}", stream.name);

        for consumer in &stream.consumers {
            connection
                .create_consumer(&stream.name, &consumer.consumer_config())
                .await
                .map_err(|e| Error::Provisioning {
                    stream: stream.name.clone(),
                    stage: ProvisioningStage::Consumer {
                        durable: consumer.durable.clone(),
                    },
                    source: Box::new(e),
                })?;

            debug!("created consumer {} on stream {}", consumer.durable, stream.name);
        }

        info!(
            "provisioned stream {} with {} consumer(s)",
            stream.name,
            stream.consumers.len()
        );
    }

    Ok(())
}
