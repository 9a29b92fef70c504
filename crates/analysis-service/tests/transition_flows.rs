//! End-to-end flows through the public service API.

use analysis_service::{
    AccountRecord, AnalysisService, AnalysisServiceApi, CallOutcome, InclusionPath,
    InMemoryStateStore, MerkleRegistry, MintAuthority, ModuleConfig, ModuleSnapshot,
    RejectionKind, RuntimeCall, SiblingPosition, TransitionError,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared_types::{Balance, Identity, TokenId};

const T: TokenId = TokenId(7);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("analysis_service=debug")
        .try_init();
}

fn random_identities(seed: u64, n: usize) -> Vec<Identity> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| Identity(rng.gen())).collect()
}

fn recipient() -> Identity {
    Identity([0xEE; 32])
}

fn minter() -> Identity {
    Identity([0xAA; 32])
}

/// Three allow-listed identities, each funded with `balance` of `T`.
fn setup(balance: Balance) -> (AnalysisService, Vec<Identity>) {
    init_tracing();
    let ids = random_identities(42, 3);
    let config = ModuleConfig::new(
        ids.clone(),
        recipient(),
        MintAuthority::Restricted {
            minters: [minter()].into_iter().collect(),
        },
    );
    let mut svc = AnalysisService::bootstrap(config).unwrap();
    for id in &ids {
        svc.add_balance(minter(), T, *id, balance).unwrap();
    }
    (svc, ids)
}

fn witness(svc: &AnalysisService, id: &Identity) -> (AccountRecord, InclusionPath) {
    (svc.account(id).unwrap(), svc.inclusion_path(id).unwrap())
}

#[test]
fn test_end_to_end_analysis() {
    let (mut svc, ids) = setup(150);
    let before_root = svc.current_root();
    let recipient_before = svc.balance_of(T, &recipient());
    let (record, path) = witness(&svc, &ids[0]);

    let receipt = svc.analysis(record, &path, 42, T).unwrap();

    assert_eq!(svc.balance_of(T, &ids[0]), 50);
    assert_eq!(svc.balance_of(T, &recipient()), recipient_before + 100);
    assert_eq!(svc.account(&ids[0]).unwrap().url, 42);

    let expected_leaf = AccountRecord { identity: ids[0], url: 42 }.hash();
    assert_eq!(svc.registry().leaf(0).unwrap(), expected_leaf);
    assert_ne!(svc.current_root(), before_root);
    assert_eq!(svc.current_root(), path.compute_root(&expected_leaf));
    assert_eq!(receipt.previous_root, before_root);
    assert_eq!(receipt.new_root, svc.current_root());

    // Untouched accounts.
    for id in &ids[1..] {
        assert_eq!(svc.balance_of(T, id), 150);
        assert_eq!(svc.account(id).unwrap().url, 0);
    }
}

#[test]
fn test_repeat_call_with_stale_witness() {
    let (mut svc, ids) = setup(300);
    let (record, path) = witness(&svc, &ids[0]);
    svc.analysis(record, &path, 42, T).unwrap();

    let before = svc.snapshot();
    let err = svc.analysis(record, &path, 42, T).unwrap_err();
    assert_eq!(err, TransitionError::ProofVerificationFailed);
    assert_eq!(svc.snapshot(), before);

    // A fresh witness goes through.
    let (record, path) = witness(&svc, &ids[0]);
    assert_eq!(record.url, 42);
    svc.analysis(record, &path, 43, T).unwrap();
    assert_eq!(svc.balance_of(T, &ids[0]), 100);
}

#[test]
fn test_threshold_boundary() {
    let (mut svc, ids) = setup(100);
    let (record, path) = witness(&svc, &ids[0]);
    let err = svc.analysis(record, &path, 1, T).unwrap_err();
    assert_eq!(
        err,
        TransitionError::InsufficientBalance {
            required: 101,
            available: 100
        }
    );

    let (mut svc, ids) = setup(101);
    let (record, path) = witness(&svc, &ids[0]);
    svc.analysis(record, &path, 1, T).unwrap();
    assert_eq!(svc.balance_of(T, &ids[0]), 1);
}

#[test]
fn test_other_token_balance_does_not_count() {
    let (mut svc, ids) = setup(150);
    let (record, path) = witness(&svc, &ids[1]);
    let err = svc.analysis(record, &path, 1, TokenId(8)).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::InsufficientBalance);
}

#[test]
fn test_rejections_leave_state_untouched() {
    let (mut svc, ids) = setup(150);
    let (record, path) = witness(&svc, &ids[1]);
    let stale_url = record.with_updated_url(5);
    let other_path = svc.inclusion_path(&ids[2]).unwrap();
    let short = InclusionPath::new(path.nodes()[..path.len() - 1].to_vec());

    let failing: Vec<(AccountRecord, InclusionPath, TokenId, RejectionKind)> = vec![
        (stale_url, path.clone(), T, RejectionKind::ProofVerificationFailed),
        (record, other_path, T, RejectionKind::ProofVerificationFailed),
        (record, short, T, RejectionKind::MalformedPath),
        (record, path.clone(), TokenId(99), RejectionKind::InsufficientBalance),
    ];

    for (account, path, token, kind) in failing {
        let before = svc.snapshot();
        let err = svc.analysis(account, &path, 9, token).unwrap_err();
        assert_eq!(err.kind(), kind);
        assert_eq!(svc.snapshot(), before);
    }
    assert_eq!(svc.stats().calls_rejected, 4);
    assert_eq!(svc.stats().transitions_committed, 0);
}

#[test]
fn test_unauthorized_mint_rejected() {
    let (mut svc, ids) = setup(150);
    let before = svc.snapshot();
    let err = svc.add_balance(ids[0], T, ids[0], 1_000).unwrap_err();
    assert_eq!(err, TransitionError::UnauthorizedMinter { caller: ids[0] });
    assert_eq!(svc.snapshot(), before);
}

#[test]
fn test_used_through_api_trait() {
    fn drive(api: &mut dyn AnalysisServiceApi, id: Identity) -> u64 {
        let record = api.account(&id).unwrap();
        let path = api.inclusion_path(&id).unwrap();
        api.analysis(record, &path, 11, T).unwrap().leaf_index
    }

    let (mut svc, ids) = setup(150);
    assert_eq!(drive(&mut svc, ids[2]), 2);
    assert_eq!(svc.account(&ids[2]).unwrap().url, 11);
}

#[test]
fn test_execute_through_api_trait() {
    let (mut svc, ids) = setup(150);
    let api: &mut dyn AnalysisServiceApi = &mut svc;
    let (record, path) = (api.account(&ids[0]).unwrap(), api.inclusion_path(&ids[0]).unwrap());

    let outcome = api.execute(RuntimeCall::Analysis {
        account: record,
        path: path.clone(),
        counter: 5,
        token_id: T,
    });
    assert!(matches!(outcome, CallOutcome::Committed(ref r) if r.account.url == 5));

    let outcome = api.execute(RuntimeCall::AddBalance {
        caller: ids[0],
        token_id: T,
        address: ids[0],
        amount: 1,
    });
    assert!(matches!(
        outcome,
        CallOutcome::Rejected(ref p) if p.kind == RejectionKind::UnauthorizedMinter
    ));
    assert_eq!(svc.stats().calls_rejected, 1);
}

#[test]
fn test_batch_from_json() {
    let (mut svc, ids) = setup(150);
    let (record, path) = witness(&svc, &ids[0]);
    let calls = vec![
        RuntimeCall::Analysis {
            account: record,
            path: path.clone(),
            counter: 42,
            token_id: T,
        },
        RuntimeCall::Analysis {
            account: record,
            path,
            counter: 42,
            token_id: T,
        },
    ];
    let json = serde_json::to_string(&calls).unwrap();
    let decoded: Vec<RuntimeCall> = serde_json::from_str(&json).unwrap();

    let outcomes = svc.execute_batch(decoded);
    assert!(matches!(outcomes[0], CallOutcome::Committed(_)));
    assert!(matches!(
        &outcomes[1],
        CallOutcome::Rejected(p) if p.kind == RejectionKind::ProofVerificationFailed
    ));
}

#[test]
fn test_snapshot_survives_store_round_trip() {
    let (mut svc, ids) = setup(300);
    let (record, path) = witness(&svc, &ids[1]);
    svc.analysis(record, &path, 3, T).unwrap();

    let store = InMemoryStateStore::new();
    svc.persist(&store).unwrap();

    let config = svc.config().clone();
    let mut restored = AnalysisService::bootstrap(config).unwrap();
    assert!(restored.load(&store).unwrap());
    assert_eq!(restored.current_root(), svc.current_root());

    // The restored module keeps accepting fresh witnesses.
    let (record, path) = witness(&restored, &ids[1]);
    restored.analysis(record, &path, 4, T).unwrap();
    assert_eq!(restored.balance_of(T, &ids[1]), 100);
}

#[test]
fn test_snapshot_bytes_reject_truncation() {
    let (svc, _) = setup(150);
    let bytes = svc.snapshot().to_bytes().unwrap();
    let err = ModuleSnapshot::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
    assert_eq!(err.kind(), RejectionKind::Serialization);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_single_bit_tamper_rejected(
        slot in 0usize..3,
        level in 0usize..7,
        byte in 0usize..32,
        bit in 0u8..8,
    ) {
        let (svc, ids) = setup(150);
        let (record, mut path) = witness(&svc, &ids[slot]);
        let registry = svc.registry();
        prop_assert!(registry.verify_path(&path, &record.hash(), &svc.current_root()));

        path.nodes_mut()[level].sibling[byte] ^= 1 << bit;
        prop_assert!(!registry.verify_path(&path, &record.hash(), &svc.current_root()));
    }

    #[test]
    fn prop_orientation_flip_rejected(slot in 0usize..3, level in 0usize..7) {
        let (svc, ids) = setup(150);
        let (record, mut path) = witness(&svc, &ids[slot]);
        let node = &mut path.nodes_mut()[level];
        node.position = match node.position {
            SiblingPosition::Left => SiblingPosition::Right,
            SiblingPosition::Right => SiblingPosition::Left,
        };
        prop_assert!(!svc.registry().verify_path(&path, &record.hash(), &svc.current_root()));
    }

    #[test]
    fn prop_hash_is_pure(bytes in any::<[u8; 32]>(), url in any::<u64>()) {
        let record = AccountRecord { identity: Identity(bytes), url };
        prop_assert_eq!(record.hash(), record.hash());
        prop_assert_eq!(record.with_updated_url(url).hash(), record.hash());
    }

    #[test]
    fn prop_root_matches_leaves_after_every_call(
        calls in proptest::collection::vec((0usize..3, any::<u64>(), 0u64..200, any::<bool>()), 1..24),
    ) {
        let (mut svc, ids) = setup(0);
        for (who, counter, amount, stale) in calls {
            let id = ids[who];
            if amount > 0 {
                svc.add_balance(minter(), T, id, amount).unwrap();
            }
            let (record, path) = witness(&svc, &id);
            let record = if stale { record.with_updated_url(record.url.wrapping_add(1)) } else { record };
            let before = svc.snapshot();

            match svc.analysis(record, &path, counter, T) {
                Ok(receipt) => {
                    prop_assert_eq!(receipt.account.url, counter);
                }
                Err(_) => {
                    prop_assert_eq!(svc.snapshot(), before);
                }
            }

            let rebuilt = MerkleRegistry::from_sparse_leaves(
                svc.registry().depth(),
                ids.iter().map(|id| {
                    let slot = svc.slot_of(id).unwrap();
                    (slot, svc.account(id).unwrap().hash())
                }),
            )
            .unwrap();
            prop_assert_eq!(svc.current_root(), rebuilt.root());
            prop_assert_eq!(svc.current_root(), svc.registry().recompute_root());
        }
    }
}
