//! Request handlers.
//!
//! Store calls are synchronous (SQLite, file I/O), so every handler runs its
//! store work on the blocking pool.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dental_records_core::models::{NewPatient, Patient};
use dental_records_core::query::{self, FilterCriteria, ListFilter, SortOrder};
use dental_records_core::stats::Dashboard;
use dental_records_core::store::{DeleteOutcome, PatientStore, StoreError, StoreResult};

use crate::error::ApiError;
use crate::AppState;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn PatientStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "backend": state.store.backend_name() }))
}

pub async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Patient>>), ApiError> {
    let Json(new) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let patient = blocking(&state, move |store| store.create(new)).await?;
    Ok((StatusCode::CREATED, ok(patient)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub age_range: Option<String>,
    pub payment_status: Option<String>,
    pub patient_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// List, then search and narrow by the list filter fields, then apply the
/// filter criteria, then optionally sort by entry date.
pub async fn list_patients(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Patient>> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let criteria: FilterCriteria = match params.filter.as_deref() {
        Some(key) => key.parse()?,
        None => FilterCriteria::All,
    };
    let order = params
        .sort
        .as_deref()
        .map(str::parse::<SortOrder>)
        .transpose()?;
    let list_filter = ListFilter::from_keys(
        params.age_range.as_deref(),
        params.payment_status.as_deref(),
        params.patient_type.as_deref(),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
    )?;
    let search = params.search.unwrap_or_default();

    let patients = blocking(&state, move |store| {
        let found = store.find(&search, &list_filter)?;
        let filtered = query::filter(found, criteria);
        Ok(match order {
            Some(order) => query::sort_by_entry_date(filtered, order),
            None => filtered,
        })
    })
    .await?;
    Ok(ok(patients))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Patient> {
    let patient = blocking(&state, move |store| {
        store.get(&id)?.ok_or(StoreError::NotFound(id))
    })
    .await?;
    Ok(ok(patient))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = blocking(&state, move |store| {
        if store.delete_one(&id)? {
            Ok(id)
        } else {
            Err(StoreError::NotFound(id))
        }
    })
    .await?;
    Ok(ok(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<String>,
}

pub async fn delete_patients(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> ApiResult<Vec<DeleteOutcome>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let outcomes = blocking(&state, move |store| store.delete_many(&request.ids)).await?;
    Ok(ok(outcomes))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> ApiResult<Patient> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let patient =
        blocking(&state, move |store| store.update_payment(&id, request.amount)).await?;
    Ok(ok(patient))
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Dashboard for the requested month, defaulting to the current one.
pub async fn dashboard(
    State(state): State<AppState>,
    params: Result<Query<DashboardParams>, QueryRejection>,
) -> ApiResult<Dashboard> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let today = chrono::Local::now().date_naive();
    let year = params.year.unwrap_or(today.year());
    let month = params.month.unwrap_or(today.month());
    if !(1..=12).contains(&month) {
        return Err(ApiError::BadRequest(format!("Invalid month: {}", month)));
    }

    let dashboard = blocking(&state, move |store| {
        Ok(Dashboard::build(&store.list()?, year, month, today))
    })
    .await?;
    Ok(ok(dashboard))
}
