//! Async front for the coordinator.
//!
//! The coordinator lives on one task and drains a command queue, so
//! operations from any number of callers still execute strictly one after
//! another. Callers hold a cheap, cloneable [`CoordinatorHandle`].

use concord_aggregator::Submission;
use concord_core::{Address, AgreementId, Amount, CoordinatorError, RequestId, ServiceAgreement, U256};
use concord_crypto::OracleSignature;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::coordinator::Coordinator;
use crate::events::CoordinatorEvent;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("coordinator service has stopped")]
    Stopped,
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

type Reply<T> = oneshot::Sender<Result<T, CoordinatorError>>;

enum Command {
    InitiateAgreement {
        agreement: ServiceAgreement,
        signatures: Vec<OracleSignature>,
        reply: Reply<AgreementId>,
    },
    TokenTransfer {
        caller: Address,
        sender: Address,
        amount: Amount,
        payload: Vec<u8>,
        reply: Reply<RequestId>,
    },
    Fulfill {
        provider: Address,
        request_id: RequestId,
        value: U256,
        reply: Reply<Submission>,
    },
    Withdraw {
        provider: Address,
        recipient: Address,
        amount: Amount,
        reply: Reply<()>,
    },
    Balance {
        provider: Address,
        reply: oneshot::Sender<Amount>,
    },
    Agreement {
        said: AgreementId,
        reply: oneshot::Sender<Option<ServiceAgreement>>,
    },
    TakeEvents {
        reply: oneshot::Sender<Vec<CoordinatorEvent>>,
    },
}

#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ServiceError::Stopped)?;
        rx.await.map_err(|_| ServiceError::Stopped)
    }

    pub async fn initiate_service_agreement(
        &self,
        agreement: ServiceAgreement,
        signatures: Vec<OracleSignature>,
    ) -> Result<AgreementId, ServiceError> {
        Ok(self
            .call(|reply| Command::InitiateAgreement {
                agreement,
                signatures,
                reply,
            })
            .await??)
    }

    pub async fn on_token_transfer(
        &self,
        caller: Address,
        sender: Address,
        amount: Amount,
        payload: Vec<u8>,
    ) -> Result<RequestId, ServiceError> {
        Ok(self
            .call(|reply| Command::TokenTransfer {
                caller,
                sender,
                amount,
                payload,
                reply,
            })
            .await??)
    }

    pub async fn fulfill_oracle_request(
        &self,
        provider: Address,
        request_id: RequestId,
        value: U256,
    ) -> Result<Submission, ServiceError> {
        Ok(self
            .call(|reply| Command::Fulfill {
                provider,
                request_id,
                value,
                reply,
            })
            .await??)
    }

    pub async fn withdraw(
        &self,
        provider: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), ServiceError> {
        Ok(self
            .call(|reply| Command::Withdraw {
                provider,
                recipient,
                amount,
                reply,
            })
            .await??)
    }

    pub async fn withdrawable_tokens(&self, provider: Address) -> Result<Amount, ServiceError> {
        self.call(|reply| Command::Balance { provider, reply }).await
    }

    pub async fn service_agreement(
        &self,
        said: AgreementId,
    ) -> Result<Option<ServiceAgreement>, ServiceError> {
        self.call(|reply| Command::Agreement { said, reply }).await
    }

    pub async fn take_events(&self) -> Result<Vec<CoordinatorEvent>, ServiceError> {
        self.call(|reply| Command::TakeEvents { reply }).await
    }
}

/// Owns the coordinator and applies queued commands in arrival order.
pub struct CoordinatorService {
    coordinator: Coordinator,
    rx: mpsc::Receiver<Command>,
}

impl CoordinatorService {
    pub fn new(coordinator: Coordinator) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::channel(coordinator.config().queue_depth.max(1));
        (Self { coordinator, rx }, CoordinatorHandle { tx })
    }

    /// Start the service on its own task. The task ends, handing the
    /// coordinator back, once every handle has been dropped.
    pub fn spawn(coordinator: Coordinator) -> (CoordinatorHandle, JoinHandle<Coordinator>) {
        let (service, handle) = Self::new(coordinator);
        (handle, tokio::spawn(service.run()))
    }

    pub async fn run(mut self) -> Coordinator {
        info!("coordinator service started");
        while let Some(command) = self.rx.recv().await {
            self.apply(command);
        }
        info!("coordinator service stopped, all handles dropped");
        self.coordinator
    }

    fn apply(&mut self, command: Command) {
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::InitiateAgreement {
                agreement,
                signatures,
                reply,
            } => {
                let _ = reply.send(
                    self.coordinator
                        .initiate_service_agreement(agreement, &signatures),
                );
            }
            Command::TokenTransfer {
                caller,
                sender,
                amount,
                payload,
                reply,
            } => {
                let _ = reply.send(
                    self.coordinator
                        .on_token_transfer(&caller, &sender, amount, &payload),
                );
            }
            Command::Fulfill {
                provider,
                request_id,
                value,
                reply,
            } => {
                let _ = reply.send(
                    self.coordinator
                        .fulfill_oracle_request(&provider, &request_id, value),
                );
            }
            Command::Withdraw {
                provider,
                recipient,
                amount,
                reply,
            } => {
                let _ = reply.send(self.coordinator.withdraw(&provider, &recipient, amount));
            }
            Command::Balance { provider, reply } => {
                let _ = reply.send(self.coordinator.withdrawable_tokens(&provider));
            }
            Command::Agreement { said, reply } => {
                let _ = reply.send(self.coordinator.service_agreement(&said).cloned());
            }
            Command::TakeEvents { reply } => {
                let events = self.coordinator.take_events();
                debug!(count = events.len(), "events drained");
                let _ = reply.send(events);
            }
        }
    }
}
