mod common;

use marquee_db::DataError;
use marquee_types::models::User;

use common::{PASSWORD, cheap_cost, insert_user, memory_db, new_user};

#[tokio::test]
async fn insert_assigns_identity_and_drops_plaintext() {
    let db = memory_db();
    let mut user = new_user("Alice", "alice@example.com");
    assert_eq!(user.password.plaintext(), Some(PASSWORD));

    db.insert_user(&mut user).await.unwrap();
    assert!(user.id > 0);
    assert_eq!(user.version, 1);
    assert!(!user.activated);
    assert_eq!(user.password.plaintext(), None);
    assert!(user.password.hash().is_some());
}

#[tokio::test]
async fn lookup_by_email_ignores_case() {
    let db = memory_db();
    let alice = insert_user(&db, "Alice", "alice@example.com").await;

    let found = db.get_user_by_email("ALICE@Example.com").await.unwrap();
    assert_eq!(found, alice);
    assert!(found.password.matches(PASSWORD).unwrap());
    assert!(!found.password.matches("wrong-password").unwrap());

    assert!(matches!(
        db.get_user_by_email("bob@example.com").await,
        Err(DataError::RecordNotFound)
    ));
}

#[tokio::test]
async fn duplicate_email_on_insert() {
    let db = memory_db();
    insert_user(&db, "Alice", "alice@example.com").await;

    let mut again = new_user("Impostor", "Alice@Example.COM");
    let err = db.insert_user(&mut again).await.unwrap_err();
    assert!(matches!(err, DataError::DuplicateEmail));
    assert_eq!(again.id, 0);
    assert_eq!(again.password.plaintext(), Some(PASSWORD));
}

#[tokio::test]
async fn insert_without_hash_is_refused() {
    let db = memory_db();
    let mut user = User::new("Nobody", "nobody@example.com");
    assert!(matches!(
        db.insert_user(&mut user).await,
        Err(DataError::MissingPasswordHash)
    ));
}

#[tokio::test]
async fn update_advances_version() {
    let db = memory_db();
    let mut user = insert_user(&db, "Alice", "alice@example.com").await;

    user.activated = true;
    user.password.set_with_cost("n3w-passphrase", &cheap_cost()).unwrap();
    db.update_user(&mut user).await.unwrap();
    assert_eq!(user.version, 2);
    assert_eq!(user.password.plaintext(), None);

    let stored = db.get_user_by_email("alice@example.com").await.unwrap();
    assert!(stored.activated);
    assert_eq!(stored.version, 2);
    assert!(stored.password.matches("n3w-passphrase").unwrap());
    assert!(!stored.password.matches(PASSWORD).unwrap());
}

#[tokio::test]
async fn update_to_taken_email_is_duplicate() {
    let db = memory_db();
    insert_user(&db, "Alice", "alice@example.com").await;
    let mut bob = insert_user(&db, "Bob", "bob@example.com").await;

    bob.email = "ALICE@example.com".into();
    assert!(matches!(db.update_user(&mut bob).await, Err(DataError::DuplicateEmail)));
    assert_eq!(bob.version, 1);
}

#[tokio::test]
async fn stale_user_conflicts() {
    let db = memory_db();
    let mut first = insert_user(&db, "Alice", "alice@example.com").await;
    let mut second = first.clone();

    first.name = "Alice Liddell".into();
    db.update_user(&mut first).await.unwrap();

    assert!(matches!(db.update_user(&mut second).await, Err(DataError::EditConflict)));
}
