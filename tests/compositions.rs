mod common;

use common::{setup, setup_with};
use pretty_assertions::assert_eq;
use serde_json::json;
use sqlfns::fetch_records;
use sqlfns::prelude::*;

#[tokio::test]
async fn test_series_runs_in_order() {
    let db = setup().await;
    let insert = db.sql("createOnePerson");

    let results = db
        .session
        .with_transaction(|conn| {
            series(vec![
                Step::new(insert.as_str(), params!["1", "John", "Smith", 18, "555-0001"]),
                Step::new(insert.as_str(), params!["2", "Jane", "Smith", 20, "555-0002"]),
                Step::new("SELECT COUNT(*) AS total FROM person", params![]),
            ])
            .run(conn)
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0][0]["id"], json!("1"));
    assert_eq!(results[1][0]["id"], json!("2"));
    // The count sees both earlier inserts.
    assert_eq!(results[2][0]["total"], json!(2));
    assert_eq!(db.count().await, 2);
}

#[tokio::test]
async fn test_series_failure_rolls_back_everything() {
    let db = setup().await;
    let insert = db.sql("createOnePerson");

    let err = db
        .session
        .run(series(vec![
            Step::new(insert.as_str(), params!["1", "John", "Smith", 18, "555-0001"]),
            Step::new(insert.as_str(), params!["1", "John", "Again", 18, "555-0001"]),
        ]))
        .await
        .unwrap_err();

    assert!(matches!(err, SqlFnError::Execution(_)), "{err:?}");
    assert_eq!(db.count().await, 0);
}

#[tokio::test]
async fn test_parallel_results_in_input_order() {
    let db = setup().await;
    let insert = db.sql("createOnePerson");

    let results = db
        .session
        .run(parallel(vec![
            Step::new(insert.as_str(), params!["a", "Ann", "Ames", 30, "555-0101"]),
            Step::new(insert.as_str(), params!["b", "Bob", "Burr", 40, "555-0102"]),
            Step::new(insert.as_str(), params!["c", "Cy", "Cole", 50, "555-0103"]),
        ]))
        .await
        .unwrap();

    let ids: Vec<_> = results.iter().map(|rows| rows[0]["id"].clone()).collect();
    assert_eq!(ids, vec![json!("a"), json!("b"), json!("c")]);
    assert_eq!(db.count().await, 3);
}

#[tokio::test]
async fn test_parallel_failure_aborts_composition() {
    let db = setup().await;
    let insert = db.sql("createOnePerson");

    let result = db
        .session
        .run(parallel(vec![
            Step::new(insert.as_str(), params!["a", "Ann", "Ames", 30, "555-0101"]),
            Step::new("INSERT INTO no_such_table VALUES ($1)", params![1]),
            Step::new(insert.as_str(), params!["b", "Bob", "Burr", 40, "555-0102"]),
        ]))
        .await;

    assert!(result.is_err());
    assert_eq!(db.count().await, 0);
}

#[tokio::test]
async fn test_waterfall_feeds_prior_rows() {
    let db = setup().await;
    db.create_person("1", "John", "Smith", 18, "555-0001").await;
    let update_age = db.sql("updateOneAgeById");

    let results = db
        .session
        .run(waterfall(vec![
            Step::derived(update_age.as_str(), |prior| {
                assert!(prior.is_none());
                params!["1", 30]
            }),
            Step::derived(update_age.as_str(), |prior| {
                let age = prior
                    .and_then(|rows| rows.first())
                    .and_then(|row| row["age"].as_i64())
                    .unwrap_or_default();
                params!["1", age + 1]
            }),
        ]))
        .await
        .unwrap();

    assert_eq!(results[0][0]["age"], json!(30));
    assert_eq!(results[1][0]["age"], json!(31));

    let stored = db
        .fns
        .call("findOnePersonById", params!["1"])
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(stored["age"], json!(31));
}

#[tokio::test]
async fn test_flat_arguments() {
    let db = setup().await;
    let insert = db.sql("createOnePerson");

    let steps = Step::from_flat(vec![
        insert.clone().into(),
        params!["1", "John", "Smith", 18, "555-0001"].into(),
        "SELECT * FROM person WHERE id = $1".into(),
        StepArg::derived(|prior| {
            let id = prior.and_then(|rows| rows.first()).map(|row| row["id"].clone());
            params![id.and_then(|v| v.as_str().map(str::to_string))]
        }),
    ])
    .unwrap();

    let results = db.session.run(waterfall(steps)).await.unwrap();
    assert_eq!(results[1].len(), 1);
    assert_eq!(results[1][0]["last_name"], json!("Smith"));
}

#[tokio::test]
async fn test_odd_arguments_fail_before_touching_the_database() {
    let db = setup().await;
    db.session.pool().close().await;

    // A composition that reaches the closed pool reports a connection error.
    let err = db
        .session
        .run(series(vec![Step::new("SELECT 1", params![])]))
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFnError::Connection(_)), "{err:?}");

    let args: Vec<StepArg> = vec![
        db.sql("createOnePerson").into(),
        params!["1", "John", "Smith", 18, "555-0001"].into(),
        "SELECT 1".into(),
    ];
    let result = match Step::from_flat(args) {
        Ok(steps) => db.session.run(series(steps)).await,
        Err(e) => Err(e),
    };
    assert!(matches!(result, Err(SqlFnError::Arity(_))), "{result:?}");
}

#[tokio::test]
async fn test_failed_rollback_is_reported() {
    let db = setup_with(PoolSettings {
        max_connections: 1,
        acquire_timeout_secs: 2,
    })
    .await;
    let insert = db.sql("createOnePerson");

    // Ending the transaction behind the driver's back makes its own
    // ROLLBACK fail.
    let err = db
        .session
        .with_transaction(move |conn| {
            Box::pin(async move {
                fetch_records(&mut *conn, &insert, &params!["1", "John", "Smith", 18, "555-0001"])
                    .await?;
                fetch_records(&mut *conn, "ROLLBACK", &[]).await?;
                fetch_records(&mut *conn, "SELECT * FROM no_such_table", &[]).await
            })
        })
        .await
        .unwrap_err();

    assert!(err.is_rollback_failure(), "{err:?}");
    match err {
        SqlFnError::Rollback { original, .. } => {
            assert!(original.starts_with("Execution error:"), "{original}");
            assert!(original.contains("no_such_table"), "{original}");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The broken connection was closed; the pool opens a fresh one.
    assert_eq!(db.count().await, 0);
    db.create_person("2", "Jane", "Doe", 30, "555-0002").await;
    assert_eq!(db.count().await, 1);
}

#[test]
fn test_composition_mode() {
    assert_eq!(waterfall(vec![]).mode(), Mode::Waterfall);
    assert_eq!(parallel(vec![]).mode(), Mode::Parallel);
}

#[tokio::test]
async fn test_with_connection_has_no_transaction() {
    let db = setup().await;
    let insert = db.sql("createOnePerson");

    // The first insert is not undone when the second one fails.
    let err = db
        .session
        .with_connection(|conn| {
            series(vec![
                Step::new(insert.as_str(), params!["1", "John", "Smith", 18, "555-0001"]),
                Step::new(insert.as_str(), params!["1", "John", "Again", 18, "555-0001"]),
            ])
            .run(conn)
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SqlFnError::Execution(_)));
    assert_eq!(db.count().await, 1);
}
