//! In-memory stand-in for the GetResponse v3 contacts API.
//!
//! Mirrors the wire contract closely enough for client integration tests:
//! the same paths, camelCase bodies, `X-Auth-Token`/`api_key` credentials and
//! structured error payloads with upstream error codes.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const CODE_VALIDATION: i64 = 1000;
pub const CODE_INVALID_FORMAT: i64 = 1003;
pub const CODE_MISSING_PARAMETER: i64 = 1005;
pub const CODE_ALREADY_EXISTS: i64 = 1008;
pub const CODE_NOT_FOUND: i64 = 1013;
pub const CODE_AUTHENTICATION: i64 = 1014;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub campaign_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldValue {
    pub custom_field_id: String,
    pub value: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub contact_id: String,
    pub href: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_cycle: Option<i32>,
    pub origin: String,
    pub campaign: Campaign,
    pub custom_field_values: Vec<CustomFieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContact {
    pub email: String,
    pub name: Option<String>,
    pub day_of_cycle: Option<i32>,
    pub campaign: Campaign,
    #[serde(default)]
    pub custom_field_values: Vec<CustomFieldValue>,
    pub ip_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
    pub day_of_cycle: Option<i32>,
    pub campaign: Option<Campaign>,
    pub custom_field_values: Option<Vec<CustomFieldValue>>,
    pub ip_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomFields {
    pub custom_field_values: Vec<CustomFieldValue>,
}

/// Contacts kept in creation order.
pub type Db = Arc<RwLock<Vec<Contact>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub api_key: Arc<str>,
}

/// Error payload in the upstream format.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: i64,
    pub message: String,
    pub context: Vec<String>,
}

impl ApiFailure {
    fn new(status: StatusCode, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    fn with_context(mut self, entry: impl Into<String>) -> Self {
        self.context.push(entry.into());
        self
    }

    fn not_found(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, CODE_NOT_FOUND, "Resource not found").with_context(format!("contactId: {id}"))
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "httpStatus": self.status.as_u16(),
            "code": self.code,
            "message": self.message,
            "moreInfo": format!("https://apidocs.getresponse.com/v3/errors/{}", self.code),
            "context": self.context,
            "uuid": Uuid::new_v4().to_string(),
        });
        (self.status, Json(body)).into_response()
    }
}

type Params = Query<HashMap<String, String>>;

pub fn app(api_key: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Vec::new())),
        api_key: Arc::from(api_key),
    };
    Router::new()
        .route("/v3/contacts", get(list_contacts).post(create_contact))
        .route(
            "/v3/contacts/{id}",
            get(get_contact).post(update_contact).delete(delete_contact),
        )
        .route("/v3/contacts/{id}/custom-fields", post(update_custom_fields))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

fn authorize(state: &AppState, headers: &HeaderMap, params: &HashMap<String, String>) -> Result<(), ApiFailure> {
    let expected = format!("api-key {}", state.api_key);
    let header_ok = headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    let query_ok = params.get("api_key").is_some_and(|k| k.as_str() == &*state.api_key);
    if header_ok || query_ok {
        Ok(())
    } else {
        Err(ApiFailure::new(
            StatusCode::UNAUTHORIZED,
            CODE_AUTHENTICATION,
            "Unable to authenticate request. Check credentials or authentication method details",
        ))
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiFailure> {
    serde_json::from_slice(body).map_err(|e| {
        ApiFailure::new(
            StatusCode::BAD_REQUEST,
            CODE_VALIDATION,
            "General error of validation process, more details should be in context section",
        )
        .with_context(e.to_string())
    })
}

/// Keep only the selected keys; `contactId` and `href` always survive.
fn select_fields(contact: &Contact, fields: Option<&String>) -> Value {
    let value = serde_json::to_value(contact).unwrap_or(Value::Null);
    let Some(fields) = fields.filter(|f| !f.is_empty()) else {
        return value;
    };
    let wanted: Vec<&str> = fields.split(',').map(str::trim).collect();
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| k == "contactId" || k == "href" || wanted.contains(&k.as_str()))
                .collect(),
        ),
        other => other,
    }
}

fn page_param(params: &HashMap<String, String>, key: &str, default: usize) -> Result<usize, ApiFailure> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
            ApiFailure::new(StatusCode::BAD_REQUEST, CODE_INVALID_FORMAT, "Invalid parameter format").with_context(format!("{key}: {raw}"))
        }),
    }
}

async fn list_contacts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Json<Vec<Value>>, ApiFailure> {
    authorize(&state, &headers, &params)?;
    let page = page_param(&params, "page", 1)?;
    let per_page = page_param(&params, "perPage", 100)?;

    let contacts = state.db.read().await;
    let mut matched: Vec<&Contact> = contacts
        .iter()
        .filter(|c| params.get("filter[email]").map_or(true, |e| &c.email == e))
        .filter(|c| {
            params
                .get("filter[name]")
                .map_or(true, |n| c.name.as_deref().is_some_and(|name| name.contains(n.as_str())))
        })
        .filter(|c| {
            params
                .get("filter[campaignId]")
                .map_or(true, |id| &c.campaign.campaign_id == id)
        })
        .collect();

    if let Some(direction) = params.get("sort[name]") {
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        if direction.eq_ignore_ascii_case("desc") {
            matched.reverse();
        }
    } else if let Some(direction) = params.get("sort[email]") {
        matched.sort_by(|a, b| a.email.cmp(&b.email));
        if direction.eq_ignore_ascii_case("desc") {
            matched.reverse();
        }
    }

    let fields = params.get("fields");
    let page_items = matched
        .into_iter()
        .skip(page.saturating_sub(1).saturating_mul(per_page))
        .take(per_page)
        .map(|c| select_fields(c, fields))
        .collect();
    Ok(Json(page_items))
}

async fn create_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Params,
    body: Bytes,
) -> Result<StatusCode, ApiFailure> {
    authorize(&state, &headers, &params)?;
    let input: CreateContact = parse_body(&body)?;

    let mut contacts = state.db.write().await;
    let duplicate = contacts
        .iter()
        .any(|c| c.email == input.email && c.campaign == input.campaign);
    if duplicate {
        return Err(ApiFailure::new(
            StatusCode::CONFLICT,
            CODE_ALREADY_EXISTS,
            "Contact already added",
        )
        .with_context(format!("email: {}", input.email)));
    }

    let id = Uuid::new_v4().simple().to_string();
    tracing::info!(contact_id = %id, "contact created");
    contacts.push(Contact {
        href: format!("/v3/contacts/{id}"),
        contact_id: id,
        email: input.email,
        name: input.name,
        note: None,
        day_of_cycle: input.day_of_cycle,
        origin: "api".to_string(),
        campaign: input.campaign,
        custom_field_values: input.custom_field_values,
        ip_address: input.ip_address,
    });
    Ok(StatusCode::ACCEPTED)
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Json<Value>, ApiFailure> {
    authorize(&state, &headers, &params)?;
    let contacts = state.db.read().await;
    contacts
        .iter()
        .find(|c| c.contact_id == id)
        .map(|c| Json(select_fields(c, params.get("fields"))))
        .ok_or_else(|| ApiFailure::not_found(&id))
}

async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Params,
    body: Bytes,
) -> Result<Json<Contact>, ApiFailure> {
    authorize(&state, &headers, &params)?;
    let input: UpdateContact = parse_body(&body)?;

    let mut contacts = state.db.write().await;
    let contact = contacts
        .iter_mut()
        .find(|c| c.contact_id == id)
        .ok_or_else(|| ApiFailure::not_found(&id))?;
    if let Some(name) = input.name {
        contact.name = Some(name);
    }
    if let Some(email) = input.email {
        contact.email = email;
    }
    if let Some(note) = input.note {
        contact.note = Some(note);
    }
    if let Some(day) = input.day_of_cycle {
        contact.day_of_cycle = Some(day);
    }
    if let Some(campaign) = input.campaign {
        contact.campaign = campaign;
    }
    if let Some(values) = input.custom_field_values {
        contact.custom_field_values = values;
    }
    if let Some(ip) = input.ip_address {
        contact.ip_address = Some(ip);
    }
    Ok(Json(contact.clone()))
}

async fn update_custom_fields(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Params,
    body: Bytes,
) -> Result<Json<Contact>, ApiFailure> {
    authorize(&state, &headers, &params)?;
    let input: UpdateCustomFields = parse_body(&body)?;

    let mut contacts = state.db.write().await;
    let contact = contacts
        .iter_mut()
        .find(|c| c.contact_id == id)
        .ok_or_else(|| ApiFailure::not_found(&id))?;
    for field in input.custom_field_values {
        match contact
            .custom_field_values
            .iter_mut()
            .find(|f| f.custom_field_id == field.custom_field_id)
        {
            Some(existing) => existing.value = field.value,
            None => contact.custom_field_values.push(field),
        }
    }
    Ok(Json(contact.clone()))
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<StatusCode, ApiFailure> {
    authorize(&state, &headers, &params)?;
    for key in ["messageId", "ipAddress"] {
        if !params.contains_key(key) {
            return Err(ApiFailure::new(
                StatusCode::BAD_REQUEST,
                CODE_MISSING_PARAMETER,
                "Missing parameter",
            )
            .with_context(key));
        }
    }

    let mut contacts = state.db.write().await;
    let index = contacts
        .iter()
        .position(|c| c.contact_id == id)
        .ok_or_else(|| ApiFailure::not_found(&id))?;
    contacts.remove(index);
    tracing::info!(contact_id = %id, message_id = %params["messageId"], "contact removed");
    Ok(StatusCode::NO_CONTENT)
}
