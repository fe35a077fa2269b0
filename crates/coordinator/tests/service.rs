use std::sync::{Arc, Mutex};

use concord_coordinator::{
    Callback, Coordinator, CoordinatorConfig, CoordinatorEvent, CoordinatorService,
    InMemoryToken, RequestPayload, ServiceError, Store, Submission,
};
use concord_core::{Address, Amount, CoordinatorError, ManualClock, ServiceAgreement, U256};
use concord_crypto::SigningKeypair;

const NOW: u64 = 1_700_000_000;
const ONE_TOKEN: Amount = 1_000_000_000_000_000_000;
const TOKEN: Address = [0x70; 20];
const HOLDER: Address = [0xc0; 20];
const REQUESTER: Address = [0x0e; 20];

fn coordinator(token: Arc<Mutex<InMemoryToken>>) -> Coordinator {
    let config = CoordinatorConfig {
        funding_source: TOKEN,
        queue_depth: 8,
        ..Default::default()
    };
    Coordinator::new(
        config,
        Store::new(),
        Box::new(token),
        Arc::new(ManualClock::new(NOW)),
    )
}

fn oracles(n: u8) -> Vec<SigningKeypair> {
    (1..=n)
        .map(|i| SigningKeypair::from_secret_bytes(&[i; 32]).unwrap())
        .collect()
}

fn agreement(keys: &[SigningKeypair]) -> ServiceAgreement {
    ServiceAgreement {
        payment: ONE_TOKEN,
        expiration: 300,
        end_at: NOW + 3600,
        oracles: keys.iter().map(|k| k.address()).collect(),
        request_digest: [0x85; 32],
    }
}

#[tokio::test]
async fn test_full_flow_through_handle() {
    let token = Arc::new(Mutex::new(InMemoryToken::new(HOLDER)));
    token.lock().unwrap().mint(HOLDER, ONE_TOKEN);
    let (handle, task) = CoordinatorService::spawn(coordinator(token.clone()));

    let keys = oracles(3);
    let sa = agreement(&keys);
    let sigs = keys
        .iter()
        .map(|k| k.sign_message_hash(&sa.id()).unwrap())
        .collect();
    let said = handle
        .initiate_service_agreement(sa.clone(), sigs)
        .await
        .unwrap();
    assert_eq!(handle.service_agreement(said).await.unwrap(), Some(sa));

    let payload = RequestPayload {
        agreement_id: said,
        nonce: 1,
        callback: Callback {
            target: [0xcc; 20],
            selector: [1, 2, 3, 4],
        },
        declared_payment: Some(ONE_TOKEN),
        data: vec![],
    };
    let id = handle
        .on_token_transfer(TOKEN, REQUESTER, ONE_TOKEN, payload.encode().unwrap())
        .await
        .unwrap();

    let mut last = None;
    for (key, value) in keys.iter().zip([16u64, 17, 18]) {
        last = Some(
            handle
                .fulfill_oracle_request(key.address(), id, U256::from(value))
                .await
                .unwrap(),
        );
    }
    assert!(matches!(last, Some(Submission::Finalized(f)) if f.aggregate == U256::from(17u64)));

    let oracle = keys[0].address();
    assert_eq!(
        handle.withdrawable_tokens(oracle).await.unwrap(),
        333_333_333_333_333_333
    );
    handle
        .withdraw(oracle, oracle, 333_333_333_333_333_333)
        .await
        .unwrap();
    assert_eq!(handle.withdrawable_tokens(oracle).await.unwrap(), 0);
    assert_eq!(
        token.lock().unwrap().balance_of(&oracle),
        333_333_333_333_333_333
    );

    let events = handle.take_events().await.unwrap();
    assert!(matches!(events.first(), Some(CoordinatorEvent::AgreementInitiated { .. })));

    drop(handle);
    let coordinator = task.await.unwrap();
    assert_eq!(coordinator.store().requests.len(), 1);
}

#[tokio::test]
async fn test_rejections_come_back_as_coordinator_errors() {
    let token = Arc::new(Mutex::new(InMemoryToken::new(HOLDER)));
    let (handle, _task) = CoordinatorService::spawn(coordinator(token));

    let err = handle
        .on_token_transfer(REQUESTER, REQUESTER, ONE_TOKEN, vec![])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Coordinator(CoordinatorError::UntrustedCaller(_))
    ));

    let err = handle.withdraw([1; 20], [1; 20], 1).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Coordinator(CoordinatorError::InsufficientBalance { .. })
    ));
}

#[tokio::test]
async fn test_concurrent_responses_finalize_exactly_once() {
    let token = Arc::new(Mutex::new(InMemoryToken::new(HOLDER)));
    let (handle, task) = CoordinatorService::spawn(coordinator(token));

    let keys = oracles(5);
    let sa = agreement(&keys);
    let sigs = keys
        .iter()
        .map(|k| k.sign_message_hash(&sa.id()).unwrap())
        .collect();
    let said = handle.initiate_service_agreement(sa, sigs).await.unwrap();
    let payload = RequestPayload {
        agreement_id: said,
        nonce: 9,
        callback: Callback {
            target: [0xcc; 20],
            selector: [0; 4],
        },
        declared_payment: None,
        data: vec![],
    };
    let id = handle
        .on_token_transfer(TOKEN, REQUESTER, 5 * ONE_TOKEN, payload.encode().unwrap())
        .await
        .unwrap();

    let mut joins = Vec::new();
    for key in &keys {
        let handle = handle.clone();
        let provider = key.address();
        joins.push(tokio::spawn(async move {
            handle
                .fulfill_oracle_request(provider, id, U256::from(10u64))
                .await
        }));
    }

    let mut finalized = 0;
    for join in joins {
        if let Submission::Finalized(_) = join.await.unwrap().unwrap() {
            finalized += 1;
        }
    }
    assert_eq!(finalized, 1);

    drop(handle);
    let coordinator = task.await.unwrap();
    for key in &keys {
        assert_eq!(coordinator.withdrawable_tokens(&key.address()), ONE_TOKEN);
    }
}

#[tokio::test]
async fn test_stopped_service_reports_stopped() {
    let token = Arc::new(Mutex::new(InMemoryToken::new(HOLDER)));
    let (service, handle) = CoordinatorService::new(coordinator(token));
    drop(service);
    assert!(matches!(
        handle.withdrawable_tokens([1; 20]).await,
        Err(ServiceError::Stopped)
    ));
}
