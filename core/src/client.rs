//! Request builders, response parsers and the executing client for the
//! GetResponse contacts API.
//!
//! # Design
//! `ContactsApi` holds only the base URL, credential and auth placement, and
//! carries no mutable state between calls. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`, so the I/O boundary stays explicit.
//!
//! `GetResponseClient` glues the two halves to a [`Transport`]: build,
//! execute, classify, decode. It never retries.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::{AuthMode, ClientConfig};
use crate::error::{decode_error, GetResponseError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::{Contact, ContactQuery, CustomField, CustomFieldsUpdate, NewContact};

/// Versioned prefix every resource path lives under.
pub const API_PREFIX: &str = "/v3";
pub const AUTH_HEADER: &str = "X-Auth-Token";
pub const AUTH_QUERY_PARAM: &str = "api_key";

/// Stateless request builder and response parser for the contacts API.
#[derive(Clone, PartialEq, Eq)]
pub struct ContactsApi {
    base_url: String,
    api_key: String,
    auth_mode: AuthMode,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ContactsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactsApi")
            .field("base_url", &self.base_url)
            .field("auth_mode", &self.auth_mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ContactsApi {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            auth_mode: AuthMode::Header,
            timeout: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url, config.api_key.clone())
            .with_auth_mode(config.auth_mode)
            .with_timeout(Some(config.timeout))
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Timeout attached to every built request; `None` leaves it to the
    /// transport's default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn build_create_contact(&self, input: &NewContact) -> Result<HttpRequest, GetResponseError> {
        let body = serde_json::to_string(input).map_err(GetResponseError::Serialization)?;
        Ok(self.request(HttpMethod::Post, "/contacts").with_body(body))
    }

    pub fn build_list_contacts(&self, query: &ContactQuery) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, "/contacts");
        for (key, value) in &query.filters {
            req = req.with_query(format!("filter[{key}]"), value);
        }
        for (key, value) in &query.sort {
            req = req.with_query(format!("sort[{key}]"), value);
        }
        if !query.fields.is_empty() {
            req = req.with_query("fields", query.fields.join(","));
        }
        req = req
            .with_query("page", query.page.to_string())
            .with_query("perPage", query.per_page.to_string());
        if let Some(flags) = &query.additional_flags {
            req = req.with_query("additionalFlags", flags);
        }
        req
    }

    pub fn build_get_contact<S: AsRef<str>>(&self, id: &str, fields: &[S]) -> HttpRequest {
        let req = self.request(HttpMethod::Get, &contact_path(id));
        if fields.is_empty() {
            return req;
        }
        let joined = fields.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        req.with_query("fields", joined)
    }

    pub fn build_update_contact(&self, id: &str, new_data: &Contact) -> Result<HttpRequest, GetResponseError> {
        let body = serde_json::to_string(new_data).map_err(GetResponseError::Serialization)?;
        Ok(self.request(HttpMethod::Post, &contact_path(id)).with_body(body))
    }

    pub fn build_update_contact_custom_fields(
        &self,
        id: &str,
        custom_fields: &[CustomField],
    ) -> Result<HttpRequest, GetResponseError> {
        let wrapper = CustomFieldsUpdate {
            custom_field_values: custom_fields.to_vec(),
        };
        let body = serde_json::to_string(&wrapper).map_err(GetResponseError::Serialization)?;
        let path = format!("{}/custom-fields", contact_path(id));
        Ok(self.request(HttpMethod::Post, &path).with_body(body))
    }

    pub fn build_delete_contact(&self, id: &str, message_id: &str, ip_address: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &contact_path(id))
            .with_query("messageId", message_id)
            .with_query("ipAddress", ip_address)
    }

    pub fn parse_create_contact(&self, response: HttpResponse) -> Result<(), GetResponseError> {
        check_status(&response)
    }

    pub fn parse_list_contacts(&self, response: HttpResponse) -> Result<Vec<Contact>, GetResponseError> {
        check_status(&response)?;
        decode_body(&response)
    }

    pub fn parse_get_contact(&self, response: HttpResponse) -> Result<Contact, GetResponseError> {
        check_status(&response)?;
        decode_body(&response)
    }

    pub fn parse_update_contact(&self, response: HttpResponse) -> Result<Contact, GetResponseError> {
        check_status(&response)?;
        decode_body(&response)
    }

    pub fn parse_update_contact_custom_fields(&self, response: HttpResponse) -> Result<Contact, GetResponseError> {
        check_status(&response)?;
        decode_body(&response)
    }

    pub fn parse_delete_contact(&self, response: HttpResponse) -> Result<(), GetResponseError> {
        check_status(&response)
    }

    /// Base request for `path` with the JSON content type and credential set.
    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let req = HttpRequest::new(method, format!("{}{API_PREFIX}{path}", self.base_url))
            .with_header("Content-Type", "application/json")
            .with_timeout(self.timeout);
        match self.auth_mode {
            AuthMode::Header => req.with_header(AUTH_HEADER, format!("api-key {}", self.api_key)),
            AuthMode::QueryParam => req.with_query(AUTH_QUERY_PARAM, &self.api_key),
        }
    }
}

fn contact_path(id: &str) -> String {
    format!("/contacts/{}", urlencoding::encode(id))
}

/// Route non-success statuses through the error decoder.
fn check_status(response: &HttpResponse) -> Result<(), GetResponseError> {
    if response.is_success() {
        return Ok(());
    }
    Err(decode_error(response.status, &response.body))
}

fn decode_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, GetResponseError> {
    serde_json::from_slice(&response.body).map_err(|e| GetResponseError::decoding_response(&response.body, e))
}

/// Blocking client for the contacts API: one method per operation.
///
/// Immutable after construction, so a single instance can be shared across
/// threads when the transport allows it.
#[derive(Debug, Clone)]
pub struct GetResponseClient<T = UreqTransport> {
    api: ContactsApi,
    transport: T,
}

impl GetResponseClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, GetResponseError> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    pub fn from_env() -> Result<Self, GetResponseError> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> GetResponseClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, GetResponseError> {
        config.validate()?;
        Ok(Self {
            api: ContactsApi::from_config(&config),
            transport,
        })
    }

    pub fn api(&self) -> &ContactsApi {
        &self.api
    }

    /// `POST /v3/contacts`. The API answers 202 with no body.
    pub fn create_contact(&self, input: &NewContact) -> Result<(), GetResponseError> {
        let req = self.api.build_create_contact(input)?;
        self.api.parse_create_contact(self.send(&req)?)
    }

    /// `GET /v3/contacts` with filters, sort, field selection and paging.
    pub fn list_contacts(&self, query: &ContactQuery) -> Result<Vec<Contact>, GetResponseError> {
        let req = self.api.build_list_contacts(query);
        self.api.parse_list_contacts(self.send(&req)?)
    }

    /// `GET /v3/contacts/{id}`
    pub fn get_contact<S: AsRef<str>>(&self, id: &str, fields: &[S]) -> Result<Contact, GetResponseError> {
        let req = self.api.build_get_contact(id, fields);
        self.api.parse_get_contact(self.send(&req)?)
    }

    /// `POST /v3/contacts/{id}`
    pub fn update_contact(&self, id: &str, new_data: &Contact) -> Result<Contact, GetResponseError> {
        let req = self.api.build_update_contact(id, new_data)?;
        self.api.parse_update_contact(self.send(&req)?)
    }

    /// `POST /v3/contacts/{id}/custom-fields`
    pub fn update_contact_custom_fields(
        &self,
        id: &str,
        custom_fields: &[CustomField],
    ) -> Result<Contact, GetResponseError> {
        let req = self.api.build_update_contact_custom_fields(id, custom_fields)?;
        self.api.parse_update_contact_custom_fields(self.send(&req)?)
    }

    /// `DELETE /v3/contacts/{id}`. `message_id` and `ip_address` attribute
    /// the removal to an unsubscribe event.
    pub fn delete_contact(&self, id: &str, message_id: &str, ip_address: &str) -> Result<(), GetResponseError> {
        let req = self.api.build_delete_contact(id, message_id, ip_address);
        self.api.parse_delete_contact(self.send(&req)?)
    }

    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, GetResponseError> {
        // `path` never carries the credential; `url()` may.
        tracing::debug!(method = %req.method, path = %req.path, "sending GetResponse request");
        let response = self.transport.execute(req).map_err(|e| {
            tracing::debug!(method = %req.method, path = %req.path, error = %e, "transport failure");
            GetResponseError::Transport(e)
        })?;
        tracing::debug!(
            method = %req.method,
            path = %req.path,
            status = response.status,
            "GetResponse responded"
        );
        Ok(response)
    }
}

impl<T: Transport + Clone> GetResponseClient<T> {
    /// A copy of this client whose requests use `timeout` instead of the
    /// configured one.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            api: self.api.clone().with_timeout(Some(timeout)),
            transport: self.transport.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::error::{ERROR_DECODING_ERROR, ERROR_DECODING_RESPONSE};

    fn api() -> ContactsApi {
        ContactsApi::new("http://localhost:3000", "secret")
    }

    #[test]
    fn build_create_contact_produces_correct_request() {
        let input = NewContact::new("foo@bar.baz", "")
            .name("foobar")
            .day_of_cycle(5)
            .custom_fields(vec![CustomField::new("some_key", ["some_value"])])
            .ip_address("127.0.0.1");
        let req = api().build_create_contact(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/v3/contacts");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("x-auth-token"), Some("api-key secret"));
        assert!(req.query.is_empty());
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "email": "foo@bar.baz",
                "name": "foobar",
                "dayOfCycle": 5,
                "campaign": {"campaignId": ""},
                "customFieldValues": [{"customFieldId": "some_key", "value": ["some_value"]}],
                "ipAddress": "127.0.0.1"
            })
        );
    }

    #[test]
    fn build_create_contact_omits_absent_fields() {
        let req = api().build_create_contact(&NewContact::new("a@b.c", "V")).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert!(body.get("name").is_none());
        assert!(body.get("dayOfCycle").is_none());
        assert!(body.get("customFieldValues").is_none());
        assert!(body.get("ipAddress").is_none());
    }

    #[test]
    fn build_list_contacts_renders_bracketed_params() {
        let query = ContactQuery::new()
            .filter("email", "foo@bar.baz")
            .filter("campaignId", "123")
            .sort_by("name", "asc")
            .fields(["name", "email"])
            .page(NonZeroU32::new(2).unwrap())
            .per_page(NonZeroU32::new(10).unwrap());
        let req = api().build_list_contacts(&query);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/v3/contacts");
        assert!(req.body.is_none());
        assert_eq!(
            req.query,
            vec![
                ("filter[campaignId]".to_string(), "123".to_string()),
                ("filter[email]".to_string(), "foo@bar.baz".to_string()),
                ("sort[name]".to_string(), "asc".to_string()),
                ("fields".to_string(), "name,email".to_string()),
                ("page".to_string(), "2".to_string()),
                ("perPage".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn build_list_contacts_skips_empty_selection_and_flags() {
        let req = api().build_list_contacts(&ContactQuery::new());
        assert_eq!(req.query_param("fields"), None);
        assert_eq!(req.query_param("additionalFlags"), None);
        assert_eq!(req.query_param("page"), Some("1"));
        assert_eq!(req.query_param("perPage"), Some("100"));

        let req = api().build_list_contacts(&ContactQuery::new().additional_flags("exactMatch"));
        assert_eq!(req.query_param("additionalFlags"), Some("exactMatch"));
    }

    #[test]
    fn build_get_contact_with_and_without_fields() {
        let req = api().build_get_contact("foo", &["name", "email"]);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/v3/contacts/foo");
        assert_eq!(req.query_param("fields"), Some("name,email"));

        let none: [&str; 0] = [];
        let req = api().build_get_contact("foo", &none);
        assert!(req.query.is_empty());
    }

    #[test]
    fn contact_ids_are_encoded_as_one_segment() {
        let req = api().build_get_contact::<&str>("a/b c", &[]);
        assert_eq!(req.path, "http://localhost:3000/v3/contacts/a%2Fb%20c");
    }

    #[test]
    fn build_update_contact_sends_only_set_fields() {
        let new_data = Contact {
            name: Some("foobar".to_string()),
            ..Contact::default()
        };
        let req = api().build_update_contact("foo", &new_data).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/v3/contacts/foo");
        assert_eq!(req.body.as_deref(), Some(r#"{"name":"foobar"}"#));
    }

    #[test]
    fn build_update_custom_fields_wraps_values() {
        let fields = vec![CustomField::new("some_key", ["a", "b"])];
        let req = api().build_update_contact_custom_fields("foo", &fields).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/v3/contacts/foo/custom-fields");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"customFieldValues": [{"customFieldId": "some_key", "value": ["a", "b"]}]})
        );
    }

    #[test]
    fn build_delete_contact_carries_attribution() {
        let req = api().build_delete_contact("123", "hello world", "127.0.0.1");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:3000/v3/contacts/123");
        assert!(req.body.is_none());
        assert_eq!(req.query_param("messageId"), Some("hello world"));
        assert_eq!(req.query_param("ipAddress"), Some("127.0.0.1"));
    }

    #[test]
    fn query_param_auth_moves_key_out_of_headers() {
        let api = api().with_auth_mode(AuthMode::QueryParam);
        let req = api.build_delete_contact("123", "m", "127.0.0.1");
        assert_eq!(req.header("x-auth-token"), None);
        assert_eq!(req.query_param("api_key"), Some("secret"));
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let api = ContactsApi::new("http://localhost:3000/", "k");
        let req = api.build_list_contacts(&ContactQuery::new());
        assert_eq!(req.path, "http://localhost:3000/v3/contacts");
    }

    #[test]
    fn timeout_is_attached_to_requests() {
        let api = api().with_timeout(Some(Duration::from_millis(250)));
        let req = api.build_get_contact::<&str>("x", &[]);
        assert_eq!(req.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn parse_create_contact_accepts_any_success_status() {
        assert!(api().parse_create_contact(HttpResponse::new(200, "")).is_ok());
        assert!(api().parse_create_contact(HttpResponse::new(202, "")).is_ok());
    }

    #[test]
    fn parse_list_contacts_success() {
        let response = HttpResponse::new(200, r#"[{"name":"foobar","email":"foo@bar.baz"}]"#);
        let contacts = api().parse_list_contacts(response).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name.as_deref(), Some("foobar"));
        assert_eq!(contacts[0].contact_id, None);
    }

    #[test]
    fn parse_list_contacts_empty_array() {
        let contacts = api().parse_list_contacts(HttpResponse::new(200, "[]")).unwrap();
        assert!(contacts.is_empty());
    }

    #[test]
    fn parse_get_contact_bad_success_body() {
        let err = api().parse_get_contact(HttpResponse::new(200, "not json")).unwrap_err();
        assert_eq!(err.code(), ERROR_DECODING_RESPONSE);
    }

    #[test]
    fn parse_get_contact_wrong_shape_is_decoding_error() {
        let err = api().parse_get_contact(HttpResponse::new(200, "[]")).unwrap_err();
        assert!(err.is_decoding());
    }

    #[test]
    fn parse_update_contact_api_error() {
        let err = api()
            .parse_update_contact(HttpResponse::new(409, r#"{"code":1008}"#))
            .unwrap_err();
        assert!(err.is_api());
        assert_eq!(err.code(), "1008");
    }

    #[test]
    fn parse_delete_contact_malformed_error_body() {
        let err = api()
            .parse_delete_contact(HttpResponse::new(500, r#"{"not json""#))
            .unwrap_err();
        assert_eq!(err.code(), ERROR_DECODING_ERROR);
    }

    #[test]
    fn parse_update_custom_fields_success() {
        let response = HttpResponse::new(
            200,
            r#"{"contactId":"foo","customFieldValues":[{"customFieldId":"k","value":["v"]}]}"#,
        );
        let contact = api().parse_update_contact_custom_fields(response).unwrap();
        assert_eq!(contact.custom_field_values.unwrap()[0].custom_field_id, "k");
    }

    #[test]
    fn redirect_statuses_count_as_success() {
        assert!(api().parse_delete_contact(HttpResponse::new(302, "")).is_ok());
    }
}
