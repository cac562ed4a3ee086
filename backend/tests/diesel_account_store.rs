//! Diesel adapters against a live PostgreSQL database.
//!
//! Skipped unless `ACCOUNTS_TEST_DATABASE_URL` is set.

mod support;

use std::sync::Arc;

use accounts_backend::domain::ports::{
    AccountRemoval, InvitationCodeRepository, RoleReplacement, UserPersistenceError,
    UserRepository,
};
use accounts_backend::domain::{
    Account, Invitation, InvitationCode, Role, RoleSet, SecretDigest, UserName,
};
use accounts_backend::outbound::persistence::{
    DieselInvitationCodeRepository, DieselUserRepository,
};
use chrono::{TimeZone, Utc};
use rstest::rstest;
use support::test_database;

fn name(raw: &str) -> UserName {
    UserName::new(raw).expect("valid name")
}

fn account(user: &str, roles: &[Role]) -> Account {
    Account::new(
        name(user),
        SecretDigest::from_stored(format!("$argon2id$v=19$stored-{user}")),
        roles.iter().copied().collect(),
    )
}

#[rstest]
#[tokio::test]
async fn accounts_insert_and_reject_duplicates() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselUserRepository::new(db.pool.clone());
    let stored = account("B", &[Role::Student, Role::Reviewer]);

    repo.insert(&stored).await.expect("first insert");
    let err = repo
        .insert(&account("B", &[Role::Staff]))
        .await
        .expect_err("name taken");
    assert!(matches!(err, UserPersistenceError::Duplicate { .. }));

    let found = repo.find(&name("B")).await.expect("find").expect("row");
    assert_eq!(found.roles(), stored.roles());
    assert_eq!(found.password(), stored.password());
    assert!(found.one_time_password().is_none());
    assert!(repo.find(&name("ghost")).await.expect("find").is_none());
}

#[rstest]
#[tokio::test]
async fn insert_if_empty_admits_only_the_first_account() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselUserRepository::new(db.pool.clone());

    assert!(repo.insert_if_empty(&account("root", &[Role::Admin])).await.expect("bootstrap"));
    assert!(!repo.insert_if_empty(&account("late", &[Role::Admin])).await.expect("refused"));
    assert_eq!(repo.count().await.expect("count"), 1);
}

#[rstest]
#[tokio::test]
async fn listing_is_ordered_by_name() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselUserRepository::new(db.pool.clone());
    for user in ["carol", "alice", "bob"] {
        repo.insert(&account(user, &[Role::Student])).await.expect("insert");
    }

    let names: Vec<String> = repo
        .list()
        .await
        .expect("list")
        .into_iter()
        .map(|summary| summary.user_name.as_ref().to_owned())
        .collect();
    assert_eq!(names, ["alice", "bob", "carol"]);
}

#[rstest]
#[tokio::test]
async fn sole_admin_keeps_admin_until_another_exists() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselUserRepository::new(db.pool.clone());
    repo.insert(&account("A", &[Role::Admin])).await.expect("insert A");
    let student = RoleSet::only(Role::Student);

    let outcome = repo
        .replace_roles_keeping_admin(&name("A"), &student)
        .await
        .expect("change");
    assert_eq!(outcome, RoleReplacement::Rejected);
    let outcome = repo
        .replace_roles_keeping_admin(&name("ghost"), &student)
        .await
        .expect("change");
    assert_eq!(outcome, RoleReplacement::Missing);

    repo.insert(&account("C", &[Role::Admin, Role::Staff]))
        .await
        .expect("insert C");
    let outcome = repo
        .replace_roles_keeping_admin(&name("A"), &student)
        .await
        .expect("change");
    assert_eq!(outcome, RoleReplacement::Applied);
    let roles = repo.find(&name("A")).await.expect("find").expect("row");
    assert_eq!(roles.roles(), &student);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_admin_demotions_leave_one_admin() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = Arc::new(DieselUserRepository::new(db.pool.clone()));
    repo.insert(&account("A", &[Role::Admin])).await.expect("insert A");
    repo.insert(&account("C", &[Role::Admin])).await.expect("insert C");

    let demote = |user: &'static str| {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move {
            repo.replace_roles_keeping_admin(&name(user), &RoleSet::only(Role::Staff))
                .await
        })
    };
    let first = demote("A");
    let second = demote("C");
    let outcomes = [
        first.await.expect("task joins").expect("change"),
        second.await.expect("task joins").expect("change"),
    ];

    let applied = outcomes
        .iter()
        .filter(|outcome| **outcome == RoleReplacement::Applied)
        .count();
    assert_eq!(applied, 1);
    let admins = repo
        .list()
        .await
        .expect("list")
        .into_iter()
        .filter(|summary| summary.roles.is_admin())
        .count();
    assert_eq!(admins, 1);
}

#[rstest]
#[tokio::test]
async fn deletion_spares_admins() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselUserRepository::new(db.pool.clone());
    repo.insert(&account("A", &[Role::Admin])).await.expect("insert A");
    repo.insert(&account("B", &[Role::Student])).await.expect("insert B");

    assert_eq!(
        repo.delete_unless_admin(&name("A")).await.expect("delete"),
        AccountRemoval::Protected
    );
    assert_eq!(
        repo.delete_unless_admin(&name("B")).await.expect("delete"),
        AccountRemoval::Removed
    );
    assert_eq!(
        repo.delete_unless_admin(&name("B")).await.expect("delete"),
        AccountRemoval::Missing
    );
    assert_eq!(repo.count().await.expect("count"), 1);
}

#[rstest]
#[tokio::test]
async fn one_time_password_clears_only_when_unchanged() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselUserRepository::new(db.pool.clone());
    repo.insert(&account("B", &[Role::Student])).await.expect("insert B");
    let first = SecretDigest::from_stored("$argon2id$otp-1");
    let second = SecretDigest::from_stored("$argon2id$otp-2");

    assert!(repo.set_one_time_password(&name("B"), &first).await.expect("set"));
    assert!(repo.set_one_time_password(&name("B"), &second).await.expect("reset"));
    assert!(
        !repo
            .consume_one_time_password(&name("B"), &first)
            .await
            .expect("stale digest")
    );
    assert!(
        repo.consume_one_time_password(&name("B"), &second)
            .await
            .expect("current digest")
    );
    assert!(
        !repo
            .consume_one_time_password(&name("B"), &second)
            .await
            .expect("already consumed")
    );
    assert!(!repo.set_one_time_password(&name("ghost"), &first).await.expect("missing"));
}

#[rstest]
#[tokio::test]
async fn clearing_a_one_time_password_reports_matched_rows() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselUserRepository::new(db.pool.clone());
    repo.insert(&account("B", &[Role::Student])).await.expect("insert B");
    let digest = SecretDigest::from_stored("$argon2id$otp-1");
    assert!(repo.set_one_time_password(&name("B"), &digest).await.expect("set"));

    assert!(repo.clear_one_time_password(&name("B")).await.expect("clear"));
    let stored = repo.find(&name("B")).await.expect("find").expect("row");
    assert!(stored.one_time_password().is_none());
    assert!(
        !repo
            .consume_one_time_password(&name("B"), &digest)
            .await
            .expect("nothing to consume")
    );
    assert!(!repo.clear_one_time_password(&name("ghost")).await.expect("missing"));
}

#[rstest]
#[tokio::test]
async fn invitation_codes_are_marked_used_once() {
    let Some(db) = test_database().await else {
        return;
    };
    let repo = DieselInvitationCodeRepository::new(db.pool.clone());
    let generated_at = Utc
        .with_ymd_and_hms(2025, 3, 24, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    let code = InvitationCode::new("Ab12Cd34").expect("valid code");
    let grants: RoleSet = [Role::Instructor, Role::Reviewer].into_iter().collect();
    repo.insert(&Invitation::new(code.clone(), grants.clone(), generated_at))
        .await
        .expect("insert");

    assert_eq!(
        repo.mark_used(&code).await.expect("mark"),
        Some(generated_at)
    );
    assert_eq!(repo.mark_used(&code).await.expect("mark"), None);

    let stored = repo.find(&code).await.expect("find").expect("row");
    assert!(stored.used);
    assert_eq!(stored.grants, grants);
    let unknown = InvitationCode::new("Zz99Zz99").expect("valid code");
    assert_eq!(repo.mark_used(&unknown).await.expect("mark"), None);
}
