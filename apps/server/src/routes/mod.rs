//! # HTTP Routes
//!
//! ```text
//! GET    /health                        liveness + database ping
//! GET    /products                      catalog
//! POST   /products                      add product
//! PUT    /products/{id}                 edit product
//! DELETE /products/{id}                 remove product
//! GET    /customers                     customer list
//! POST   /sales                         register sale
//! POST   /venta/nueva                   register sale (legacy path)
//! GET    /sales?limit=N                 recent sales
//! GET    /sales/{id}                    sale with lines and totals
//! GET    /sales/{id}/invoice.pdf        render invoice
//! POST   /sales/{id}/invoice/resend     render and mail again
//! GET    /dashboard                     reporting figures
//! ```

pub mod customers;
pub mod dashboard;
pub mod health;
pub mod products;
pub mod sales;

use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/customers", get(customers::list))
        .route("/sales", get(sales::list).post(sales::register))
        .route("/venta/nueva", post(sales::register))
        .route("/sales/{id}", get(sales::get))
        .route("/sales/{id}/invoice.pdf", get(sales::invoice_pdf))
        .route("/sales/{id}/invoice/resend", post(sales::resend))
        .route("/dashboard", get(dashboard::summary))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliveryMode;
    use crate::test_support::{test_state, FailingMailer, RecordingMailer};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use factura_invoice::InvoiceMailer;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app(mailer: Arc<dyn InvoiceMailer>) -> (Router, Vec<factura_core::Product>) {
        let (state, products) = test_state(DeliveryMode::Inline, mailer).await;
        (router(state), products)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let resp = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn call_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = call(app, method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(Arc::new(RecordingMailer::default())).await;
        let (status, body) = call_json(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], true);
        assert_eq!(body["delivery"], "inline");
        assert_eq!(body["migrations_applied"], body["migrations_total"]);
    }

    #[tokio::test]
    async fn test_product_crud() {
        let (app, products) = app(Arc::new(RecordingMailer::default())).await;

        let (status, created) = call_json(
            &app,
            Method::POST,
            "/products",
            Some(json!({"name": "Cafe", "price_cents": 899, "stock": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = call_json(
            &app,
            Method::PUT,
            &format!("/products/{}", id),
            Some(json!({"name": "Cafe molido", "price_cents": 950, "stock": 4})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Cafe molido");

        let (status, _) = call(&app, Method::DELETE, &format!("/products/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call_json(&app, Method::DELETE, &format!("/products/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (_, list) = call_json(&app, Method::GET, "/products", None).await;
        assert_eq!(list.as_array().unwrap().len(), products.len());
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected() {
        let (app, _) = app(Arc::new(RecordingMailer::default())).await;

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/products",
            Some(json!({"name": "", "price_cents": 100, "stock": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/products",
            Some(json!({"name": "Cafe", "price_cents": "caro"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_register_sale_and_read_back() {
        let mailer = Arc::new(RecordingMailer::default());
        let (app, products) = app(mailer.clone()).await;

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/sales",
            Some(json!({
                "customer_name": "Ana Diaz",
                "customer_email": "ana@example.com",
                "customer_national_id": "30111222",
                "lines": [
                    {"product_id": products[0].id, "quantity": 2},
                    {"product_id": products[1].id, "quantity": 5}
                ]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], 1);
        assert_eq!(body["total_cents"], 2500);
        assert_eq!(body["invoice_status"], "sent");
        assert_eq!(body["rejected"][0]["index"], 1);
        assert_eq!(body["rejected"][0]["reason"]["kind"], "insufficient_stock");
        assert_eq!(mailer.sent().len(), 1);

        let sale_id = body["sale_id"].as_i64().unwrap();
        let (status, detail) = call_json(&app, Method::GET, &format!("/sales/{}", sale_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["lines"].as_array().unwrap().len(), 1);
        assert_eq!(detail["subtotal_cents"], 2500);
        assert_eq!(detail["tax_cents"], 400);
        assert_eq!(detail["total_cents"], 2900);
        assert_eq!(detail["customer"]["national_id"], "30111222");

        let (_, recent) = call_json(&app, Method::GET, "/sales?limit=5", None).await;
        assert_eq!(recent[0]["id"], sale_id);

        let (_, customers) = call_json(&app, Method::GET, "/customers", None).await;
        assert_eq!(customers.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_path_and_field_names() {
        let (app, products) = app(Arc::new(RecordingMailer::default())).await;

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/venta/nueva",
            Some(json!({
                "nombre_cliente": "Ana Diaz",
                "email_cliente": "ana@example.com",
                "dni_cliente": "30111222",
                "productos": [{"producto_id": products[0].id, "cantidad": 1}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], 1);
        assert_eq!(body["total_cents"], 1250);
    }

    #[tokio::test]
    async fn test_dispatch_failure_reports_saved_sale() {
        let (app, products) = app(Arc::new(FailingMailer)).await;

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/sales",
            Some(json!({
                "customer_name": "Ana Diaz",
                "customer_email": "ana@example.com",
                "lines": [{"product_id": products[0].id, "quantity": 1}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "INVOICE_DISPATCH_FAILED");
        let sale_id = body["sale_id"].as_i64().unwrap();

        let (_, detail) = call_json(&app, Method::GET, &format!("/sales/{}", sale_id), None).await;
        assert_eq!(detail["sale"]["invoice_status"], "failed");
    }

    #[tokio::test]
    async fn test_invalid_customer_saves_nothing() {
        let (app, products) = app(Arc::new(RecordingMailer::default())).await;

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/sales",
            Some(json!({
                "customer_name": "Ana Diaz",
                "customer_email": "ana",
                "lines": [{"product_id": products[0].id, "quantity": 1}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body.get("sale_id").is_none());

        let (_, recent) = call_json(&app, Method::GET, "/sales", None).await;
        assert!(recent.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invoice_pdf_and_resend() {
        let mailer = Arc::new(RecordingMailer::default());
        let (app, products) = app(mailer.clone()).await;

        let (_, body) = call_json(
            &app,
            Method::POST,
            "/sales",
            Some(json!({
                "customer_name": "Ana Diaz",
                "customer_email": "ana@example.com",
                "lines": [{"product_id": products[0].id, "quantity": 1}]
            })),
        )
        .await;
        let sale_id = body["sale_id"].as_i64().unwrap();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/sales/{}/invoice.pdf", sale_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let (status, sale) = call_json(
            &app,
            Method::POST,
            &format!("/sales/{}/invoice/resend", sale_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sale["invoice_status"], "sent");
        assert_eq!(mailer.sent().len(), 2);

        let (status, _) = call_json(&app, Method::GET, "/sales/999/invoice.pdf", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let (app, products) = app(Arc::new(RecordingMailer::default())).await;

        call_json(
            &app,
            Method::POST,
            "/sales",
            Some(json!({
                "customer_name": "Ana Diaz",
                "customer_email": "ana@example.com",
                "lines": [{"product_id": products[0].id, "quantity": 3}]
            })),
        )
        .await;

        let (status, body) = call_json(&app, Method::GET, "/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_stock_units"], 7 + 2);
        assert_eq!(body["total_revenue_cents"], 3750);
        assert_eq!(body["sales_today"], 1);
        assert_eq!(body["sales_last_7_days"], 1);
        assert_eq!(body["top_products"][0]["name"], "Yerba Mate");
        assert_eq!(body["top_products"][0]["quantity_sold"], 3);
    }

    #[tokio::test]
    async fn test_queued_mode_responds_pending() {
        let mailer = Arc::new(RecordingMailer::default());
        let (state, products) = test_state(DeliveryMode::Queued, mailer.clone()).await;
        let app = router(state.clone());

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/sales",
            Some(json!({
                "customer_name": "Ana Diaz",
                "customer_email": "ana@example.com",
                "lines": [{"product_id": products[0].id, "quantity": 1}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invoice_status"], "pending");

        let sale_id = body["sale_id"].as_i64().unwrap();
        for _ in 0..200 {
            if !mailer.sent().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(mailer.sent()[0].filename, format!("factura-{}.pdf", sale_id));
    }
}
