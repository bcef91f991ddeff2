mod common;

use std::time::{Duration, Instant};

use sales::database::{self, Error, Params};
use sales::web::Context;

#[derive(Debug, Default, PartialEq, sqlx::FromRow)]
#[sqlx(default)]
struct Product {
    id: i64,
    name: String,
    /// Not a column; left at its default.
    rank: i64,
}

sales::impl_bind!(Product { id, name });

async fn products() -> sqlx::AnyPool {
    let pool = common::memory_pool().await;
    let ctx = Context::background();
    database::exec(&ctx, &pool, "CREATE TABLE products (id BIGINT PRIMARY KEY, name TEXT NOT NULL UNIQUE, price BIGINT)", &())
        .await
        .unwrap();
    for (id, name) in [(3, "cog"), (1, "axle"), (2, "bolt")] {
        let p = Product { id, name: name.to_owned(), rank: 0 };
        database::exec(&ctx, &pool, "INSERT INTO products (id, name, price) VALUES (:id, :name, 100)", &p)
            .await
            .unwrap();
    }
    pool
}

#[tokio::test]
async fn exec_reports_rows_affected() {
    let pool = products().await;
    let ctx = Context::background();

    let n = database::exec(&ctx, &pool, "UPDATE products SET price = :price", &Params::new().with("price", 5))
        .await
        .unwrap();
    assert_eq!(n, 3);
}

#[tokio::test]
async fn query_one_maps_columns_by_name() {
    let pool = products().await;
    let ctx = Context::background();

    let p: Product = database::query_one(&ctx, &pool, "SELECT * FROM products WHERE id = :id", &Params::new().with("id", 2))
        .await
        .unwrap();

    // `price` has no field and is ignored; `rank` has no column and defaults.
    assert_eq!(p, Product { id: 2, name: "bolt".to_owned(), rank: 0 });
}

#[tokio::test]
async fn query_one_with_no_rows_is_not_found() {
    let pool = products().await;
    let ctx = Context::background();

    let err = database::query_one::<Product, _>(&ctx, &pool, "SELECT * FROM products WHERE id = :id", &Params::new().with("id", 99))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound), "{err:?}");
}

#[tokio::test]
async fn query_many_preserves_row_order() {
    let pool = products().await;
    let ctx = Context::background();

    let all: Vec<Product> = database::query_many(&ctx, &pool, "SELECT id, name FROM products ORDER BY name DESC", &())
        .await
        .unwrap();
    let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["cog", "bolt", "axle"]);

    let none: Vec<Product> = database::query_many(&ctx, &pool, "SELECT * FROM products WHERE id > :id", &Params::new().with("id", 10))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn a_failed_write_leaves_nothing_behind() {
    let pool = products().await;
    let ctx = Context::background();

    let dup = Product { id: 7, name: "axle".to_owned(), rank: 0 };
    let err = database::exec(&ctx, &pool, "INSERT INTO products (id, name) VALUES (:id, :name)", &dup)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Exec(_)), "{err:?}");

    let err = database::query_one::<Product, _>(&ctx, &pool, "SELECT * FROM products WHERE id = :id", &dup)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound), "{err:?}");
}

#[tokio::test]
async fn unbound_names_are_rejected_before_the_database_sees_them() {
    let pool = products().await;
    let ctx = Context::background();

    let err = database::exec(&ctx, &pool, "DELETE FROM products WHERE id = :product_id", &Params::new().with("id", 1))
        .await
        .unwrap_err();
    match err {
        Error::InvalidArgument(msg) => assert!(msg.contains("product_id"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }

    let left: Vec<Product> = database::query_many(&ctx, &pool, "SELECT * FROM products", &()).await.unwrap();
    assert_eq!(left.len(), 3);
}

const SLOW: &str = "
    WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 500000000)
    SELECT count(*) AS id FROM c";

#[tokio::test]
async fn cancellation_abandons_a_running_query() {
    let pool = common::memory_pool().await;
    let ctx = Context::background();

    let canceler = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceler.cancel();
    });

    let start = Instant::now();
    let err = database::query_one::<Product, _>(&ctx, &pool, SLOW, &()).await.unwrap_err();
    assert!(matches!(err, Error::Canceled), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(2), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn an_expired_deadline_abandons_a_running_query() {
    let pool = common::memory_pool().await;
    let ctx = Context::background().with_timeout(Duration::from_millis(50));

    let start = Instant::now();
    let err = database::query_one::<Product, _>(&ctx, &pool, SLOW, &()).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(2), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn an_already_canceled_context_runs_nothing() {
    let pool = products().await;
    let ctx = Context::background();
    ctx.cancel();

    let err = database::exec(&ctx, &pool, "DELETE FROM products", &()).await.unwrap_err();
    assert!(matches!(err, Error::Canceled), "{err:?}");

    let left: Vec<Product> = database::query_many(&Context::background(), &pool, "SELECT * FROM products", &())
        .await
        .unwrap();
    assert_eq!(left.len(), 3);
}

#[tokio::test]
async fn status_check_passes_on_a_live_database() {
    let pool = common::memory_pool().await;
    let ctx = Context::background().with_timeout(Duration::from_secs(1));
    database::status_check(&ctx, &pool).await.unwrap();
}
