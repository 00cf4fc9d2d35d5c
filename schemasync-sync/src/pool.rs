//! One live replica per configured server.
//!
//! Opening and closing never stop at the first failure: every endpoint is
//! attempted and all failures come back together as a [`FleetError`], in
//! endpoint order. Callers treat any such error as fatal.

use std::sync::Arc;

use schemasync_core::types::ServerEndpoint;

use crate::error::{EndpointFailure, FleetError, FleetOperation};
use crate::replica::{Connector, Replica};

/// A replica together with the endpoint it was opened for.
#[derive(Debug)]
pub struct ReplicaHandle<R> {
    endpoint: ServerEndpoint,
    replica: Arc<R>,
}

impl<R> ReplicaHandle<R> {
    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    pub fn host(&self) -> &str {
        &self.endpoint.host
    }

    pub fn replica(&self) -> &Arc<R> {
        &self.replica
    }
}

/// Open replicas, in endpoint order.
#[derive(Debug)]
pub struct ReplicaPool<R> {
    replicas: Vec<ReplicaHandle<R>>,
}

impl<R: Replica> ReplicaPool<R> {
    /// Open and ping every endpoint.
    ///
    /// The pool holds only the replicas that opened and answered the ping;
    /// the error, if any, lists every endpoint that did not.
    pub async fn connect<C>(connector: &C, endpoints: &[ServerEndpoint]) -> (Self, Option<FleetError>)
    where
        C: Connector<Replica = R>,
    {
        let mut replicas = Vec::with_capacity(endpoints.len());
        let mut failures = Vec::new();

        for endpoint in endpoints {
            let opened = match connector.open(endpoint).await {
                Ok(replica) => match replica.ping().await {
                    Ok(()) => Ok(replica),
                    Err(err) => {
                        // Opened but unusable: release it before reporting.
                        if let Err(close_err) = replica.close().await {
                            tracing::debug!(host = %endpoint.host, error = %close_err, "failed to close unpingable replica");
                        }
                        Err(err)
                    }
                },
                Err(err) => Err(err),
            };
            match opened {
                Ok(replica) => {
                    tracing::debug!(host = %endpoint.host, port = endpoint.port, "connected");
                    replicas.push(ReplicaHandle {
                        endpoint: endpoint.clone(),
                        replica: Arc::new(replica),
                    });
                }
                Err(error) => {
                    tracing::error!(host = %endpoint.host, port = endpoint.port, error = %error, "failed to connect");
                    failures.push(EndpointFailure {
                        endpoint: endpoint.clone(),
                        error,
                    });
                }
            }
        }

        (
            Self { replicas },
            FleetError::from_failures(FleetOperation::Connect, failures),
        )
    }

    /// Build a pool from already-open replicas.
    pub fn from_replicas(replicas: impl IntoIterator<Item = (ServerEndpoint, R)>) -> Self {
        Self {
            replicas: replicas
                .into_iter()
                .map(|(endpoint, replica)| ReplicaHandle {
                    endpoint,
                    replica: Arc::new(replica),
                })
                .collect(),
        }
    }

    /// Close every replica, attempting all of them.
    pub async fn close(self) -> Result<(), FleetError> {
        let mut failures = Vec::new();
        for handle in self.replicas {
            if let Err(error) = handle.replica.close().await {
                tracing::error!(host = %handle.endpoint.host, error = %error, "failed to close");
                failures.push(EndpointFailure {
                    endpoint: handle.endpoint,
                    error,
                });
            }
        }
        match FleetError::from_failures(FleetOperation::Close, failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<R> ReplicaPool<R> {
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReplicaHandle<R>> {
        self.replicas.iter()
    }
}
