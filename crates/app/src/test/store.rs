//! Behaviour every [`CredentialStore`] backend must share.

use jiff::{SignedDuration, Timestamp};
use testresult::TestResult;
use tiergate::{CredentialStatus, NewCredentialRecord, claims::token_hash};

use crate::store::{CredentialStore, StoreError};

/// Current time at the precision both backends persist.
pub(crate) fn now() -> Timestamp {
    Timestamp::from_microsecond(Timestamp::now().as_microsecond())
        .expect("current time should be in range")
}

pub(crate) fn new_record(namespace: &str, username: &str, id: &str) -> NewCredentialRecord {
    let created_at = now();

    NewCredentialRecord {
        id: id.to_string(),
        username: username.to_string(),
        namespace: namespace.to_string(),
        name: format!("{id}-name"),
        description: Some(format!("{id} description")),
        created_at,
        expires_at: created_at + SignedDuration::from_hours(1),
        token_hash: token_hash(id),
    }
}

pub(crate) async fn add_and_get(store: &dyn CredentialStore) -> TestResult {
    let new = new_record("maas-tier-free", "alice", "one");
    let expected = new.to_record();

    let added = store.add(new).await?;
    assert_eq!(added, expected);

    let fetched = store.get("maas-tier-free", "alice", "one").await?;
    assert_eq!(fetched, expected);
    assert_eq!(fetched.revoked_at, None);
    assert_eq!(fetched.status(now()), CredentialStatus::Active);

    Ok(())
}

pub(crate) async fn duplicate_id_is_rejected(store: &dyn CredentialStore) -> TestResult {
    store.add(new_record("maas-tier-free", "alice", "one")).await?;

    let mut duplicate = new_record("maas-tier-free", "alice", "one");
    duplicate.token_hash = token_hash("another token");

    let result = store.add(duplicate).await;

    assert!(matches!(result, Err(StoreError::AlreadyExists)), "got {result:?}");

    Ok(())
}

pub(crate) async fn list_is_empty_not_missing(store: &dyn CredentialStore) -> TestResult {
    assert!(store.list_for_user("maas-tier-free", "nobody").await?.is_empty());

    Ok(())
}

pub(crate) async fn list_is_newest_first(store: &dyn CredentialStore) -> TestResult {
    let base = now();

    for (offset, id) in ["first", "second", "third"].into_iter().enumerate() {
        let mut record = new_record("maas-tier-free", "alice", id);
        record.created_at = base + SignedDuration::from_secs(i64::try_from(offset)?);
        store.add(record).await?;
    }

    let ids: Vec<String> = store
        .list_for_user("maas-tier-free", "alice")
        .await?
        .into_iter()
        .map(|record| record.id)
        .collect();

    assert_eq!(ids, vec!["third", "second", "first"]);

    Ok(())
}

pub(crate) async fn records_are_isolated_by_namespace(store: &dyn CredentialStore) -> TestResult {
    store.add(new_record("maas-tier-free", "alice", "one")).await?;

    assert!(store.list_for_user("maas-tier-premium", "alice").await?.is_empty());

    let result = store.get("maas-tier-premium", "alice", "one").await;
    assert!(matches!(result, Err(StoreError::NotFound)), "got {result:?}");

    let expired = store
        .mark_all_expired_for_user("maas-tier-premium", "alice", now())
        .await?;
    assert_eq!(expired, 0);

    let record = store.get("maas-tier-free", "alice", "one").await?;
    assert_eq!(record.status(now()), CredentialStatus::Active);

    Ok(())
}

pub(crate) async fn get_unknown_is_not_found(store: &dyn CredentialStore) -> TestResult {
    let result = store.get("maas-tier-free", "alice", "missing").await;

    assert!(matches!(result, Err(StoreError::NotFound)), "got {result:?}");

    Ok(())
}

pub(crate) async fn mark_expired_is_idempotent(store: &dyn CredentialStore) -> TestResult {
    store.add(new_record("maas-tier-free", "alice", "one")).await?;

    let revoked_at = now();

    assert!(
        store
            .mark_expired("maas-tier-free", "alice", "one", revoked_at)
            .await?
    );

    let record = store.get("maas-tier-free", "alice", "one").await?;
    assert_eq!(record.expires_at, revoked_at);
    assert_eq!(record.revoked_at, Some(revoked_at));
    assert_eq!(record.status(revoked_at), CredentialStatus::Expired);

    assert!(
        !store
            .mark_expired("maas-tier-free", "alice", "one", now())
            .await?
    );

    let unchanged = store.get("maas-tier-free", "alice", "one").await?;
    assert_eq!(unchanged, record);

    let missing = store
        .mark_expired("maas-tier-free", "alice", "missing", now())
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound)), "got {missing:?}");

    Ok(())
}

pub(crate) async fn mark_all_expired_is_scoped_and_idempotent(
    store: &dyn CredentialStore,
) -> TestResult {
    store.add(new_record("maas-tier-free", "alice", "one")).await?;
    store.add(new_record("maas-tier-free", "alice", "two")).await?;
    store.add(new_record("maas-tier-free", "bob", "three")).await?;

    let revoked_at = now();

    assert_eq!(
        store
            .mark_all_expired_for_user("maas-tier-free", "alice", revoked_at)
            .await?,
        2
    );
    assert_eq!(
        store
            .mark_all_expired_for_user("maas-tier-free", "alice", now())
            .await?,
        0
    );

    for record in store.list_for_user("maas-tier-free", "alice").await? {
        assert_eq!(record.status(revoked_at), CredentialStatus::Expired);
        assert_eq!(record.revoked_at, Some(revoked_at));
    }

    let bob = store.get("maas-tier-free", "bob", "three").await?;
    assert_eq!(bob.status(now()), CredentialStatus::Active);

    Ok(())
}

pub(crate) async fn find_by_token_hash(store: &dyn CredentialStore) -> TestResult {
    store.add(new_record("maas-tier-free", "alice", "one")).await?;

    let found = store.find_by_token_hash(&token_hash("one")).await?;
    assert_eq!(found.map(|record| record.id), Some("one".to_string()));

    assert_eq!(store.find_by_token_hash(&token_hash("unknown")).await?, None);

    Ok(())
}

pub(crate) async fn delete_removes_record(store: &dyn CredentialStore) -> TestResult {
    store.add(new_record("maas-tier-free", "alice", "one")).await?;

    store.delete("maas-tier-free", "alice", "one").await?;

    let result = store.get("maas-tier-free", "alice", "one").await;
    assert!(matches!(result, Err(StoreError::NotFound)), "got {result:?}");

    let again = store.delete("maas-tier-free", "alice", "one").await;
    assert!(matches!(again, Err(StoreError::NotFound)), "got {again:?}");

    Ok(())
}
