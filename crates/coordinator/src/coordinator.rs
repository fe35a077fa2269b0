//! The coordinator facade: the externally callable surface over the store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use concord_aggregator::{submit_response, Finalized, Request, Submission};
use concord_core::{
    fmt_id, request_id, Address, AgreementId, Amount, Clock, CoordinatorError, RequestId, Result,
    ServiceAgreement, Timestamp, U256,
};
use concord_crypto::OracleSignature;
use concord_settlement::PaymentToken;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::consumer::{CallbackError, Consumer};
use crate::events::CoordinatorEvent;
use crate::payload::RequestPayload;
use crate::store::Store;

/// Operations run one at a time to completion through `&mut self`.
///
/// External calls (token transfers, consumer callbacks) only happen after
/// the state they depend on has been committed, so anything they do to the
/// coordinator in return goes through the same guards as any other caller.
pub struct Coordinator {
    config: CoordinatorConfig,
    store: Store,
    token: Box<dyn PaymentToken>,
    clock: Arc<dyn Clock>,
    consumers: HashMap<Address, Box<dyn Consumer>>,
    /// Targets whose callback is currently on the stack.
    in_callback: Vec<Address>,
    events: VecDeque<CoordinatorEvent>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        store: Store,
        token: Box<dyn PaymentToken>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            token,
            clock,
            consumers: HashMap::new(),
            in_callback: Vec::new(),
            events: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Register a service agreement co-signed by all of its oracles.
    pub fn initiate_service_agreement(
        &mut self,
        agreement: ServiceAgreement,
        signatures: &[OracleSignature],
    ) -> Result<AgreementId> {
        let now = self.now();
        let said = self.store.agreements.register(agreement, signatures, now)?;
        self.record(CoordinatorEvent::AgreementInitiated { said });
        Ok(said)
    }

    /// Entry point for the funding source: `sender` paid `amount` and the
    /// transfer carried `payload`.
    pub fn on_token_transfer(
        &mut self,
        caller: &Address,
        sender: &Address,
        amount: Amount,
        payload: &[u8],
    ) -> Result<RequestId> {
        if *caller != self.config.funding_source {
            warn!(caller = fmt_id(caller), "funded request from untrusted caller");
            return Err(CoordinatorError::UntrustedCaller(fmt_id(caller)));
        }
        let payload = RequestPayload::decode(payload)?;
        self.accept_request(sender, amount, payload)
    }

    fn accept_request(
        &mut self,
        requester: &Address,
        paid: Amount,
        payload: RequestPayload,
    ) -> Result<RequestId> {
        let now = self.now();
        let said = payload.agreement_id;
        let agreement = self
            .store
            .agreements
            .lookup(&said)
            .ok_or_else(|| CoordinatorError::UnknownAgreement(fmt_id(&said)))?;

        if !agreement.is_open_at(now) {
            return Err(CoordinatorError::StaleAgreement {
                end_at: agreement.end_at,
                now,
            });
        }
        if payload.callback.target == self.config.funding_source {
            return Err(CoordinatorError::ForbiddenCallbackTarget(fmt_id(
                &payload.callback.target,
            )));
        }
        if paid < agreement.payment {
            return Err(CoordinatorError::InsufficientPayment {
                required: agreement.payment,
                paid,
            });
        }
        if let Some(declared) = payload.declared_payment {
            if declared != paid {
                warn!(
                    requester = fmt_id(requester),
                    declared,
                    paid,
                    "declared payment differs from amount received, using amount received"
                );
            }
        }

        let id = request_id(requester, payload.nonce, &said);
        let request = Request::new(
            id,
            said,
            agreement,
            *requester,
            paid,
            payload.callback,
            payload.data,
            now,
            self.config.request_expiry_secs,
        );
        self.store.requests.open(request)?;

        info!(
            said = fmt_id(&said),
            request = fmt_id(&id),
            requester = fmt_id(requester),
            paid,
            "request accepted"
        );
        self.record(CoordinatorEvent::RequestAccepted {
            said,
            request_id: id,
            requester: *requester,
            paid,
        });
        Ok(id)
    }

    /// An oracle's answer to a request. The answer that completes quorum
    /// finalizes the request and then notifies the consumer.
    pub fn fulfill_oracle_request(
        &mut self,
        provider: &Address,
        request_id: &RequestId,
        value: U256,
    ) -> Result<Submission> {
        let submission = submit_response(
            &mut self.store.requests,
            &mut self.store.ledger,
            request_id,
            provider,
            value,
        )?;
        self.record(CoordinatorEvent::ResponseRecorded {
            request_id: *request_id,
            provider: *provider,
        });

        if let Submission::Finalized(finalized) = &submission {
            self.record(CoordinatorEvent::RequestFulfilled {
                request_id: finalized.request_id,
                aggregate: finalized.aggregate,
            });
            self.notify(finalized);
        }
        Ok(submission)
    }

    /// Deliver a committed result. Failures are logged and recorded, never
    /// propagated.
    fn notify(&mut self, finalized: &Finalized) {
        let target = finalized.callback.target;
        let outcome = if self.in_callback.contains(&target) {
            Err(CallbackError::Busy)
        } else {
            match self.consumers.remove(&target) {
                Some(mut consumer) => {
                    self.in_callback.push(target);
                    let outcome = consumer.on_fulfilled(
                        self,
                        &finalized.request_id,
                        finalized.callback.selector,
                        finalized.aggregate,
                    );
                    self.in_callback.pop();
                    self.consumers.entry(target).or_insert(consumer);
                    outcome
                }
                None => Err(CallbackError::NoConsumer),
            }
        };

        if let Err(e) = outcome {
            warn!(
                request = fmt_id(&finalized.request_id),
                target = fmt_id(&target),
                error = %e,
                "consumer callback failed"
            );
            self.record(CoordinatorEvent::CallbackFailed {
                request_id: finalized.request_id,
                target,
                reason: e.to_string(),
            });
        }
    }

    /// Pay `amount` of `provider`'s withdrawable balance to `recipient`.
    pub fn withdraw(
        &mut self,
        provider: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()> {
        self.store
            .ledger
            .withdraw(provider, recipient, amount, self.token.as_mut())?;
        self.record(CoordinatorEvent::Withdrawn {
            provider: *provider,
            recipient: *recipient,
            amount,
        });
        Ok(())
    }

    pub fn withdrawable_tokens(&self, provider: &Address) -> Amount {
        self.store.ledger.balance_of(provider)
    }

    pub fn service_agreement(&self, said: &AgreementId) -> Option<&ServiceAgreement> {
        self.store.agreements.lookup(said)
    }

    pub fn request(&self, id: &RequestId) -> Option<&Request> {
        self.store.requests.get(id)
    }

    /// Attach the consumer living at `target`.
    pub fn register_consumer(&mut self, target: Address, consumer: Box<dyn Consumer>) {
        self.consumers.insert(target, consumer);
    }

    /// Drain the event log.
    ///
    /// The log holds at most `config.event_log_capacity` events; once full,
    /// the oldest are dropped. Hosts that need every event must drain it at
    /// least that often.
    pub fn take_events(&mut self) -> Vec<CoordinatorEvent> {
        self.events.drain(..).collect()
    }

    fn record(&mut self, event: CoordinatorEvent) {
        let capacity = self.config.event_log_capacity;
        if capacity == 0 {
            return;
        }
        while self.events.len() >= capacity {
            self.events.pop_front();
            debug!(capacity, "event log full, dropped oldest event");
        }
        self.events.push_back(event);
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("funding_source", &fmt_id(&self.config.funding_source))
            .field("agreements", &self.store.agreements.len())
            .field("requests", &self.store.requests.len())
            .field("consumers", &self.consumers.len())
            .field("events", &self.events.len())
            .finish()
    }
}
