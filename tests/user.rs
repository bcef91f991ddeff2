mod common;

use sales::user::{Error, NewUser, Store, UpdateUser};
use sales::web::Context;

fn new_user(name: &str, email: &str) -> NewUser {
    NewUser { name: name.to_owned(), email: email.to_owned() }
}

#[tokio::test]
async fn create_query_update_delete() {
    let store = Store::new(common::users_pool().await);
    let ctx = Context::background();

    let usr = store.create(&ctx, new_user("Jane Doe", "jane@example.com"), 1_000).await.unwrap();
    assert_eq!(usr.date_created, 1_000);
    assert_eq!(usr.date_updated, 1_000);

    let got = store.query_by_id(&ctx, &usr.user_id).await.unwrap();
    assert_eq!(got, usr);
    let got = store.query_by_email(&ctx, "jane@example.com").await.unwrap();
    assert_eq!(got, usr);

    let upd = UpdateUser { name: Some("Jane Roe".to_owned()), email: None };
    let updated = store.update(&ctx, &usr.user_id, upd, 2_000).await.unwrap();
    assert_eq!(updated.name, "Jane Roe");
    assert_eq!(updated.email, "jane@example.com");
    assert_eq!(updated.date_created, 1_000);
    assert_eq!(updated.date_updated, 2_000);
    assert_eq!(store.query_by_id(&ctx, &usr.user_id).await.unwrap(), updated);

    store.delete(&ctx, &usr.user_id).await.unwrap();
    assert!(matches!(store.query_by_id(&ctx, &usr.user_id).await, Err(Error::NotFound)));

    // Deleting twice is fine.
    store.delete(&ctx, &usr.user_id).await.unwrap();
}

#[tokio::test]
async fn malformed_ids_never_reach_the_database() {
    let store = Store::new(common::users_pool().await);
    let ctx = Context::background();

    assert!(matches!(store.query_by_id(&ctx, "123").await, Err(Error::InvalidId)));
    assert!(matches!(store.delete(&ctx, "123").await, Err(Error::InvalidId)));
    assert!(matches!(store.update(&ctx, "123", UpdateUser::default(), 0).await, Err(Error::InvalidId)));
}

#[tokio::test]
async fn unknown_users_are_not_found() {
    let store = Store::new(common::users_pool().await);
    let ctx = Context::background();
    let id = "5cf37266-3473-4006-984f-9325122678b7";

    assert!(matches!(store.query_by_id(&ctx, id).await, Err(Error::NotFound)));
    assert!(matches!(store.update(&ctx, id, UpdateUser::default(), 0).await, Err(Error::NotFound)));
    assert!(matches!(store.query_by_email(&ctx, "ghost@example.com").await, Err(Error::NotFound)));
}

#[tokio::test]
async fn invalid_input_is_reported_per_field() {
    let store = Store::new(common::users_pool().await);
    let ctx = Context::background();

    match store.create(&ctx, new_user("", "not-an-email"), 0).await {
        Err(Error::Validation(fields)) => {
            let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, ["name", "email"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_emails_are_database_errors() {
    let store = Store::new(common::users_pool().await);
    let ctx = Context::background();

    store.create(&ctx, new_user("A", "same@example.com"), 0).await.unwrap();
    let err = store.create(&ctx, new_user("B", "same@example.com"), 0).await.unwrap_err();
    assert!(matches!(err, Error::Database { .. }), "{err:?}");
    assert!(err.to_string().starts_with("inserting user"), "{err}");
}

#[tokio::test]
async fn pages_are_ordered_and_bounded() {
    let store = Store::new(common::users_pool().await);
    let ctx = Context::background();

    let mut ids = Vec::new();
    for i in 0..5 {
        let usr = store.create(&ctx, new_user(&format!("user {i}"), &format!("u{i}@example.com")), 0).await.unwrap();
        ids.push(usr.user_id);
    }
    ids.sort();

    let first = store.query(&ctx, 1, 2).await.unwrap();
    let second = store.query(&ctx, 2, 2).await.unwrap();
    let third = store.query(&ctx, 3, 2).await.unwrap();
    let beyond = store.query(&ctx, 4, 2).await.unwrap();

    let paged: Vec<_> = first.iter().chain(&second).chain(&third).map(|u| u.user_id.clone()).collect();
    assert_eq!(paged, ids);
    assert_eq!(third.len(), 1);
    assert!(beyond.is_empty());

    assert!(matches!(store.query(&ctx, 0, 2).await, Err(Error::Validation(_))));
}

#[tokio::test]
async fn the_largest_page_numbers_are_rejected_not_wrapped() {
    let store = Store::new(common::users_pool().await);
    let ctx = Context::background();
    store.create(&ctx, new_user("Only", "only@example.com"), 0).await.unwrap();

    match store.query(&ctx, u32::MAX, u32::MAX).await {
        Err(Error::Validation(fields)) => assert_eq!(fields[0].field, "page"),
        other => panic!("unexpected {other:?}"),
    }

    // Far pages that still fit are simply empty.
    assert!(store.query(&ctx, u32::MAX, 1).await.unwrap().is_empty());
}
