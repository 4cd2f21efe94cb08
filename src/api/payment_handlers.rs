use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::api::handlers::{api_error, ApiContext, ApiError, AppState};
use crate::model::Payment;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub data: Option<Payment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

impl Links {
    pub fn to_self(self_link: String) -> Self {
        Self {
            self_link,
            next: None,
            prev: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub data: Payment,
    pub links: Links,
}

#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    pub data: Vec<Payment>,
    pub links: Links,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub version: Option<String>,
}

/// The `[from, to)` window requested by a list call, with `limit` clamped to
/// the configured maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub from: i64,
    pub to: i64,
    pub limit: i64,
}

impl Page {
    /// Missing or unparseable bounds fall back to `from = 0`, `to = max_results`
    pub fn from_query(query: &ListQuery, max_results: i64) -> anyhow::Result<Self> {
        let from = int_or_default(query.from.as_deref(), 0);
        let to = int_or_default(query.to.as_deref(), max_results);

        let limit = to
            .checked_sub(from)
            .filter(|limit| *limit > 0 && from >= 0)
            .ok_or_else(|| anyhow!("Invalid from ({}) or to ({}) query params", from, to))?;

        Ok(Self {
            from,
            to,
            limit: limit.min(max_results),
        })
    }

    pub fn links(&self, ctx: &ApiContext) -> Links {
        let prev = if self.from >= self.limit {
            Some(ctx.payments_url(self.from - self.limit, self.from))
        } else {
            None
        };

        Links {
            self_link: ctx.payments_url(self.from, self.to),
            next: Some(ctx.payments_url(self.to, self.to.saturating_add(self.limit))),
            prev,
        }
    }
}

fn int_or_default(value: Option<&str>, default: i64) -> i64 {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn decode_payment(body: &[u8]) -> anyhow::Result<Payment> {
    let request: PaymentRequest = serde_json::from_slice(body)?;
    request
        .data
        .ok_or_else(|| anyhow!("Request body has no payment data"))
}

/// Failures of a read: absent records are 404, the rest 500
fn read_error(err: StoreError) -> ApiError {
    if err.is_not_found() {
        api_error(StatusCode::NOT_FOUND, err)
    } else {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

fn internal_error(err: StoreError) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, err)
}

/// GET /payments?from=N&to=M
pub async fn list_payments(
    State(ctx): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaymentsResponse>, ApiError> {
    let Query(query) = query.map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let page = Page::from_query(&query, ctx.max_results)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let records = ctx
        .store
        .list(page.from, page.limit)
        .await
        .map_err(internal_error)?;
    let payments = Payment::from_records(&records).map_err(internal_error)?;

    Ok(Json(PaymentsResponse {
        data: payments,
        links: page.links(&ctx),
    }))
}

/// GET /payments/{id}
pub async fn get_payment(
    State(ctx): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let record = ctx.store.fetch(&id).await.map_err(read_error)?;
    let payment = Payment::from_record(&record).map_err(internal_error)?;

    Ok(Json(PaymentResponse {
        data: payment,
        links: Links::to_self(ctx.payment_url(&id)),
    }))
}

/// POST /payments
pub async fn create_payment(
    State(ctx): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let payment = decode_payment(&body).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    payment
        .validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let record = payment.to_record().map_err(internal_error)?;
    let created = ctx.store.create(record).await.map_err(|err| {
        if ctx.store.is_conflict(&err) {
            api_error(StatusCode::CONFLICT, err)
        } else {
            internal_error(err)
        }
    })?;

    let payment = Payment::from_record(&created).map_err(internal_error)?;
    log::info!("Created payment {}", payment.id);

    let links = Links::to_self(ctx.payment_url(&payment.id));
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            data: payment,
            links,
        }),
    ))
}

/// PUT /payments/{id}
/// The body's version must be the stored one; the response carries version + 1
pub async fn update_payment(
    State(ctx): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = decode_payment(&body).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    payment
        .validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    if !payment.id.is_empty() && payment.id != id {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Payment id {} does not match path id {}", payment.id, id),
        ));
    }

    // A missing record is a 404 here, so a failed swap below can only be a stale version
    ctx.store.fetch(&id).await.map_err(read_error)?;

    let record = payment.to_record().map_err(internal_error)?;
    let updated = ctx.store.update(record).await.map_err(|err| {
        if ctx.store.is_conflict(&err) {
            api_error(StatusCode::CONFLICT, err)
        } else {
            internal_error(err)
        }
    })?;

    let payment = Payment::from_record(&updated).map_err(internal_error)?;

    Ok(Json(PaymentResponse {
        data: payment,
        links: Links::to_self(ctx.payment_url(&id)),
    }))
}

/// DELETE /payments/{id}?version=N
pub async fn delete_payment(
    State(ctx): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(query) = query.map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let version = query
        .version
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .parse::<i64>()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid version: {}", e)))?;

    ctx.store.fetch(&id).await.map_err(read_error)?;

    // The record existed a moment ago: losing it now means someone else
    // changed or deleted it in between.
    ctx.store.delete(&id, version).await.map_err(|err| {
        if ctx.store.is_not_found(&err) || ctx.store.is_conflict(&err) {
            api_error(StatusCode::CONFLICT, err)
        } else {
            internal_error(err)
        }
    })?;

    log::info!("Deleted payment {} at version {}", id, version);
    Ok(StatusCode::NO_CONTENT)
}
