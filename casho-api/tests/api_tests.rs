/// End-to-end tests for the REST and GraphQL surfaces

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{TestContext, PASSWORD};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../migrations")]
async fn test_health_reports_database(pool: PgPool) {
    let ctx = TestContext::new(pool);

    let (status, body) = ctx.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_register_then_login(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;
    assert!(!user.refresh.is_empty());

    let (status, body) = ctx
        .send(
            "POST",
            "/api/login/",
            None,
            Some(json!({"email": "JANE@example.com", "password": PASSWORD})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user.id.as_str());
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["access"].is_string());
}

#[sqlx::test(migrations = "../migrations")]
async fn test_login_rejects_wrong_password(pool: PgPool) {
    let ctx = TestContext::new(pool);
    ctx.register("jane", "jane@example.com").await;

    let (status, _) = ctx
        .send(
            "POST",
            "/api/login/",
            None,
            Some(json!({"email": "jane@example.com", "password": "wrongpass123"})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_register_rejects_mismatch_and_duplicates(pool: PgPool) {
    let ctx = TestContext::new(pool);

    let (status, body) = ctx
        .send(
            "POST",
            "/api/register/",
            None,
            Some(json!({
                "username": "jane",
                "email": "jane@example.com",
                "password": PASSWORD,
                "password_confirm": "different123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "password_confirm");

    ctx.register("jane", "jane@example.com").await;

    let (status, _) = ctx
        .send(
            "POST",
            "/api/register/",
            None,
            Some(json!({
                "username": "other",
                "email": "Jane@Example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_protected_routes_require_token(pool: PgPool) {
    let ctx = TestContext::new(pool);

    for uri in ["/api/categories/", "/api/transactions/", "/api/accounts/", "/api/profile/"] {
        let (status, body) = ctx.send("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized");
    }

    let (status, _) = ctx
        .send("GET", "/api/categories/", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_refresh_token_is_not_an_access_token(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let (status, _) = ctx
        .send("GET", "/api/categories/", Some(&user.refresh), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_category_crud(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let id = ctx.create_category(&user, "Food", "expense").await;
    ctx.create_category(&user, "Salary", "income").await;

    let (status, body) = ctx
        .send("GET", "/api/categories/?type=expense", Some(&user.access), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Food");
    assert_eq!(body[0]["icon"], "");
    assert_eq!(body[0]["color"], "#000000");

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/api/categories/{id}/"),
            Some(&user.access),
            Some(json!({"color": "#FF5733"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["color"], "#FF5733");
    assert_eq!(body["name"], "Food");

    let (status, _) = ctx
        .send(
            "POST",
            "/api/categories/",
            Some(&user.access),
            Some(json!({"name": "Food", "type": "expense"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .send("DELETE", &format!("/api/categories/{id}/"), Some(&user.access), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .send("GET", &format!("/api/categories/{id}/"), Some(&user.access), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_category_is_invisible_to_other_users(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let jane = ctx.register("jane", "jane@example.com").await;
    let john = ctx.register("john", "john@example.com").await;

    let id = ctx.create_category(&jane, "Food", "expense").await;

    let (status, _) = ctx
        .send("GET", &format!("/api/categories/{id}/"), Some(&john.access), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send("DELETE", &format!("/api/categories/{id}/"), Some(&john.access), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_transaction_takes_type_from_category(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;
    let food = ctx.create_category(&user, "Food", "expense").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/transactions/",
            Some(&user.access),
            Some(json!({
                "category": food,
                "amount": "50.00",
                "date": "2024-01-01",
                "description": "Groceries",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["type"], "expense");
    assert_eq!(body["amount"], "50.00");
    assert_eq!(body["category"], food.as_str());
    assert_eq!(body["category_name"], "Food");

    let (status, body) = ctx
        .send(
            "POST",
            "/api/transactions/",
            Some(&user.access),
            Some(json!({
                "category": food,
                "type": "income",
                "amount": "10.00",
                "date": "2024-01-01",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "type");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_transaction_rejects_foreign_category(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let jane = ctx.register("jane", "jane@example.com").await;
    let john = ctx.register("john", "john@example.com").await;
    let janes_food = ctx.create_category(&jane, "Food", "expense").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/transactions/",
            Some(&john.access),
            Some(json!({
                "category": janes_food,
                "amount": "5.00",
                "date": "2024-01-01",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "category");

    let (_, listed) = ctx
        .send("GET", "/api/transactions/", Some(&jane.access), None)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_stats_for_single_expense(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;
    let food = ctx.create_category(&user, "Food", "expense").await;

    let (status, _) = ctx
        .send(
            "POST",
            "/api/transactions/",
            Some(&user.access),
            Some(json!({"category": food, "amount": "50.00", "date": "2024-01-01"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .send(
            "GET",
            "/api/transactions/stats/?start_date=2024-01-01&end_date=2024-01-31",
            Some(&user.access),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["income_total"], "0.00");
    assert_eq!(body["expense_total"], "50.00");
    assert_eq!(body["balance"], "-50.00");
    assert_eq!(body["category_stats"]["Food"], "50.00");
    assert_eq!(body["category_breakdown"][0]["type"], "expense");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_stats_default_period_is_trailing_month(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;
    let salary = ctx.create_category(&user, "Salary", "income").await;

    let today = Utc::now().date_naive();
    for (days_ago, amount) in [(1, "100.00"), (60, "900.00")] {
        let date = (today - Duration::days(days_ago)).to_string();
        let (status, _) = ctx
            .send(
                "POST",
                "/api/transactions/",
                Some(&user.access),
                Some(json!({"category": salary, "amount": amount, "date": date})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = ctx
        .send("GET", "/api/transactions/stats/?period=bogus", Some(&user.access), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "month");
    assert_eq!(body["income_total"], "100.00");
    assert_eq!(body["balance"], "100.00");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_stats_rejects_inverted_range(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let (status, body) = ctx
        .send(
            "GET",
            "/api/transactions/stats/?start_date=2024-02-01&end_date=2024-01-01",
            Some(&user.access),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "start_date");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_stats_rejects_end_date_at_calendar_floor(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let (status, body) = ctx
        .send(
            "GET",
            "/api/transactions/stats/?end_date=-262143-01-01",
            Some(&user.access),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["details"][0]["field"], "end_date");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_logout_blacklists_refresh_token(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/token/refresh/",
            None,
            Some(json!({"refresh": user.refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());

    let (status, body) = ctx
        .send(
            "POST",
            "/api/logout/",
            Some(&user.access),
            Some(json!({"refresh_token": user.refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logout successful");

    let (status, _) = ctx
        .send(
            "POST",
            "/api/token/refresh/",
            None,
            Some(json!({"refresh": user.refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send("POST", "/api/token/verify/", None, Some(json!({"token": user.refresh})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_logout_with_garbage_token_fails(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/logout/",
            Some(&user.access),
            Some(json!({"refresh_token": "garbage"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Logout failed");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_verify_accepts_access_token(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let (status, body) = ctx
        .send("POST", "/api/token/verify/", None, Some(json!({"token": user.access})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[sqlx::test(migrations = "../migrations")]
async fn test_profile_update_clears_phone(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let (status, body) = ctx
        .send(
            "PUT",
            "/api/profile/",
            Some(&user.access),
            Some(json!({"phone": "5551234"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone"], "5551234");

    let (status, body) = ctx
        .send(
            "PUT",
            "/api/profile/",
            Some(&user.access),
            Some(json!({"phone": null})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["phone"].is_null());
    assert_eq!(body["username"], "jane");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_monthly_report_job_is_private(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let jane = ctx.register("jane", "jane@example.com").await;
    let john = ctx.register("john", "john@example.com").await;

    let (status, body) = ctx
        .send("POST", "/api/reports/monthly/", Some(&jane.access), None)
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["kind"], "monthly_report");
    assert_eq!(body["state"], "pending");

    let job_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send("GET", &format!("/api/jobs/{job_id}/"), Some(&jane.access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send("GET", &format!("/api/jobs/{job_id}/"), Some(&john.access), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_monthly_report_requests_collapse_per_day(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let jane = ctx.register("jane", "jane@example.com").await;
    let john = ctx.register("john", "john@example.com").await;

    let (_, first) = ctx
        .send("POST", "/api/reports/monthly/", Some(&jane.access), None)
        .await;
    let (status, second) = ctx
        .send("POST", "/api/reports/monthly/", Some(&jane.access), None)
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(first["id"], second["id"]);

    let (status, other) = ctx
        .send("POST", "/api/reports/monthly/", Some(&john.access), None)
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_ne!(first["id"], other["id"]);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_graphql_anonymous_queries_are_empty(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;
    ctx.create_category(&user, "Food", "expense").await;

    let body = ctx
        .graphql(None, "{ transactions { id } categories { id } users { id } me { id } }")
        .await;

    assert!(body.get("errors").is_none(), "{body}");
    assert_eq!(body["data"]["transactions"], json!([]));
    assert_eq!(body["data"]["categories"], json!([]));
    assert_eq!(body["data"]["users"], json!([]));
    assert!(body["data"]["me"].is_null());
}

#[sqlx::test(migrations = "../migrations")]
async fn test_graphql_mutation_requires_auth(pool: PgPool) {
    let ctx = TestContext::new(pool);

    let body = ctx
        .graphql(
            None,
            r#"mutation { createCategory(input: {name: "Food", type: expense}) { id } }"#,
        )
        .await;

    assert_eq!(body["errors"][0]["message"], "Authentication required");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_graphql_create_and_query_transactions(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;

    let body = ctx
        .graphql(
            Some(&user.access),
            r#"mutation { createCategory(input: {name: "Food", type: expense}) { id name type } }"#,
        )
        .await;
    assert!(body.get("errors").is_none(), "{body}");
    assert_eq!(body["data"]["createCategory"]["type"], "expense");
    let category_id = body["data"]["createCategory"]["id"].as_str().unwrap().to_string();

    let mutation = format!(
        r#"mutation {{ createTransaction(input: {{categoryId: "{category_id}", amount: "12.50", date: "2024-03-05"}}) {{ id type amount categoryName }} }}"#
    );
    let body = ctx.graphql(Some(&user.access), &mutation).await;
    assert!(body.get("errors").is_none(), "{body}");
    assert_eq!(body["data"]["createTransaction"]["type"], "expense");
    assert_eq!(body["data"]["createTransaction"]["categoryName"], "Food");

    let body = ctx
        .graphql(
            Some(&user.access),
            r#"{ transactions { amount } stats(startDate: "2024-03-01", endDate: "2024-03-31") { expenseTotal balance categoryStats { name total } } me { username } }"#,
        )
        .await;
    assert!(body.get("errors").is_none(), "{body}");
    assert_eq!(body["data"]["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["stats"]["expenseTotal"], "12.50");
    assert_eq!(body["data"]["stats"]["balance"], "-12.50");
    assert_eq!(body["data"]["stats"]["categoryStats"][0]["name"], "Food");
    assert_eq!(body["data"]["me"]["username"], "jane");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_graphql_category_stats_merge_names_across_types(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let user = ctx.register("jane", "jane@example.com").await;
    let other_in = ctx.create_category(&user, "Other", "income").await;
    let other_out = ctx.create_category(&user, "Other", "expense").await;

    let today = Utc::now().date_naive();
    for category in [&other_in, &other_out] {
        let (status, _) = ctx
            .send(
                "POST",
                "/api/transactions/",
                Some(&user.access),
                Some(json!({"category": category, "amount": "20.50", "date": today.to_string()})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let query = format!(
        r#"{{ transactionStats(period: "week") {{ categoryStats {{ name total }} categoryBreakdown {{ name type total }} }} stats(startDate: "{today}", endDate: "{today}") {{ categoryStats {{ name total }} categoryBreakdown {{ type }} }} }}"#
    );
    let body = ctx.graphql(Some(&user.access), &query).await;
    assert!(body.get("errors").is_none(), "{body}");

    for field in ["transactionStats", "stats"] {
        let merged = body["data"][field]["categoryStats"].as_array().unwrap();
        assert_eq!(merged.len(), 1, "{field}: {body}");
        assert_eq!(merged[0]["name"], "Other");
        assert_eq!(merged[0]["total"], "41.00");
        assert_eq!(body["data"][field]["categoryBreakdown"].as_array().unwrap().len(), 2);
    }

    let (_, rest) = ctx
        .send("GET", "/api/transactions/stats/?period=week", Some(&user.access), None)
        .await;
    assert_eq!(rest["category_stats"]["Other"], "41.00");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_graphql_login_and_refresh(pool: PgPool) {
    let ctx = TestContext::new(pool);
    ctx.register("jane", "jane@example.com").await;

    let body = ctx
        .graphql(
            None,
            &format!(
                r#"mutation {{ login(input: {{email: "jane@example.com", password: "{PASSWORD}"}}) {{ accessToken refreshToken user {{ username }} }} }}"#
            ),
        )
        .await;
    assert!(body.get("errors").is_none(), "{body}");
    assert_eq!(body["data"]["login"]["user"]["username"], "jane");

    let refresh = body["data"]["login"]["refreshToken"].as_str().unwrap().to_string();
    let body = ctx
        .graphql(
            None,
            &format!(r#"mutation {{ refreshToken(refreshToken: "{refresh}") {{ accessToken }} }}"#),
        )
        .await;
    assert!(body["data"]["refreshToken"]["accessToken"].is_string(), "{body}");

    let body = ctx
        .graphql(
            None,
            &format!(r#"mutation {{ verifyToken(token: "{refresh}") {{ tokenType }} }}"#),
        )
        .await;
    assert_eq!(body["data"]["verifyToken"]["tokenType"], "refresh");
}
