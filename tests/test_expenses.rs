mod common;

use chrono::{TimeZone, Utc};
use common::{assert_signed, MockSplitwise};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use splitwise_client::client::types::{CreateExpenseRequest, ExpensesQuery, UserShare};
use splitwise_client::client::ApiError;
use splitwise_client::encoding::{encode_object_array, EncodeError, ParamMap};

fn expense_json(id: i64, description: &str, deleted_at: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "group_id": 42,
        "friendship_id": null,
        "description": description,
        "payment": false,
        "cost": "25.0",
        "currency_code": "GBP",
        "date": "2015-12-24T13:31:35Z",
        "created_at": "2015-12-24T13:32:41Z",
        "deleted_at": deleted_at,
        "category": { "id": 18, "name": "General" },
        "repayments": [{ "from": 2, "to": 1, "amount": "12.5" }],
        "users": [
            { "user_id": 1, "paid_share": "25.0", "owed_share": "12.5", "net_balance": "12.5" },
            { "user_id": 2, "paid_share": "0.0", "owed_share": "12.5", "net_balance": "-12.5" }
        ],
        "undocumented_field": { "anything": true }
    })
}

#[tokio::test]
#[serial]
async fn test_get_expenses_excludes_deleted() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json(
        "GET",
        "/api/v3.0/get_expenses",
        json!({ "expenses": [
            expense_json(1, "Dinner", None),
            expense_json(2, "Old rent", Some("2016-01-02T10:00:00Z")),
            expense_json(3, "Taxi", None),
        ]}),
    );

    let expenses = mock.client().get_expenses(None).await.expect("get_expenses should succeed");

    let ids: Vec<i64> = expenses.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(expenses[0].users.len(), 2);
    assert_eq!(expenses[0].category.as_ref().map(|c| c.name.as_str()), Some("General"));

    let request = mock.last_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.query, None);
    assert_signed(&mock, &request, MockSplitwise::consumer(), Some(MockSplitwise::access_token()));
}

#[tokio::test]
#[serial]
async fn test_get_deleted_expenses_only_deleted() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json(
        "GET",
        "/api/v3.0/get_expenses",
        json!({ "expenses": [
            expense_json(1, "Dinner", None),
            expense_json(2, "Old rent", Some("2016-01-02T10:00:00Z")),
        ]}),
    );

    let expenses = mock.client().get_deleted_expenses(None).await.unwrap();

    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].description, "Old rent");
    assert!(expenses[0].is_deleted());
}

#[tokio::test]
#[serial]
async fn test_get_expenses_encodes_filters() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json("GET", "/api/v3.0/get_expenses", json!({ "expenses": [] }));

    let query = ExpensesQuery {
        group_id: Some(7),
        dated_after: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        limit: Some(0),
        ..Default::default()
    };
    let expenses = mock.client().get_expenses(Some(&query)).await.unwrap();
    assert!(expenses.is_empty());

    let request = mock.last_request();
    assert_eq!(
        request.query.as_deref(),
        Some("group_id=7&dated_after=2024-01-01T00%3A00%3A00Z&limit=0")
    );
    assert_signed(&mock, &request, MockSplitwise::consumer(), Some(MockSplitwise::access_token()));
}

#[tokio::test]
#[serial]
async fn test_get_expense() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json(
        "GET",
        "/api/v3.0/get_expense/99",
        json!({ "expense": expense_json(99, "Groceries", None) }),
    );

    let expense = mock.client().get_expense(99).await.unwrap();

    assert_eq!(expense.id, 99);
    assert_eq!(expense.cost, "25.0");
    assert_eq!(expense.repayments[0].amount, "12.5");
}

#[tokio::test]
#[serial]
async fn test_get_expense_not_found() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;

    let err = mock.client().get_expense(12345).await.unwrap_err();

    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Status { status, message }) => {
            assert_eq!(*status, 404);
            assert_eq!(message, "Invalid API Request: record not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[serial]
async fn test_create_expense_encodes_user_shares() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json(
        "POST",
        "/api/v3.0/create_expense",
        json!({ "expenses": [expense_json(500, "Dinner at Mario's", None)], "errors": {} }),
    );

    let expense = CreateExpenseRequest {
        payment: false,
        cost: "25.00".to_string(),
        description: "Dinner at Mario's".to_string(),
        group_id: Some(42),
        currency_code: Some("GBP".to_string()),
        ..Default::default()
    };
    let shares = vec![
        UserShare::new(1, "25.00", "12.50"),
        UserShare::new(2, "0.00", "12.50"),
    ];

    let created = mock.client().create_expense(&expense, &shares).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].id, 500);

    let request = mock.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.query.as_deref(),
        Some(
            "payment=false&cost=25.00&description=Dinner%20at%20Mario%27s&group_id=42&currency_code=GBP\
             &users__0__user_id=1&users__0__paid_share=25.00&users__0__owed_share=12.50\
             &users__1__user_id=2&users__1__paid_share=0.00&users__1__owed_share=12.50"
        )
    );
    assert_signed(&mock, &request, MockSplitwise::consumer(), Some(MockSplitwise::access_token()));
}

#[tokio::test]
#[serial]
async fn test_create_expense_rejected() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json(
        "POST",
        "/api/v3.0/create_expense",
        json!({
            "expenses": [],
            "errors": {
                "base": ["The total of everyone's owed shares ($5.00) is different than the total cost ($9.99)"]
            }
        }),
    );

    let expense = CreateExpenseRequest {
        cost: "9.99".to_string(),
        description: "Lunch".to_string(),
        ..Default::default()
    };
    let err = mock
        .client()
        .create_expense(&expense, &[UserShare::new(1, "9.99", "5.00")])
        .await
        .unwrap_err();

    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Rejected { errors }) => assert!(errors.get("base").is_some()),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[serial]
async fn test_update_expense() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json(
        "POST",
        "/api/v3.0/update_expense/500",
        json!({ "expenses": [expense_json(500, "Dinner (edited)", None)], "errors": {} }),
    );

    let shares = vec![ParamMap::new()
        .with("user_id", 1)
        .with("paid_share", "30.00")
        .with("owed_share", "30.00")];
    let params = ParamMap::new()
        .with("description", "Dinner (edited)")
        .with("cost", "30.00")
        .with("users", encode_object_array("users", &shares));

    let updated = mock.client().update_expense(500, &params).await.unwrap();
    assert_eq!(updated[0].description, "Dinner (edited)");

    assert_eq!(
        mock.last_request().query.as_deref(),
        Some("description=Dinner%20%28edited%29&cost=30.00&users__0__user_id=1&users__0__paid_share=30.00&users__0__owed_share=30.00")
    );
}

#[tokio::test]
#[serial]
async fn test_update_expense_rejects_unknown_keys_before_sending() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;

    let params = ParamMap::new().with("cost", "1.00").with("owner", 3);
    let err = mock.client().update_expense(500, &params).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<EncodeError>(),
        Some(EncodeError::UnexpectedKey { key, .. }) if key == "owner"
    ));
    assert!(mock.requests().is_empty(), "no request should be sent");
}

#[tokio::test]
#[serial]
async fn test_delete_expense() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json("POST", "/api/v3.0/delete_expense/500", json!({ "success": true }));

    let deleted = mock.client().delete_expense(500).await.unwrap();

    assert!(deleted);
    let request = mock.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/v3.0/delete_expense/500");
}

#[tokio::test]
#[serial]
async fn test_delete_expense_with_errors() {
    common::init_test_logging();
    let mock = MockSplitwise::start().await;
    mock.respond_json(
        "POST",
        "/api/v3.0/delete_expense/500",
        json!({ "success": false, "errors": { "base": ["Expense not found"] } }),
    );

    let err = mock.client().delete_expense(500).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Rejected { .. })));
}
