//! Typed client for the GetResponse v3 contacts API.
//!
//! # Overview
//! `ContactsApi` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `GetResponseClient`
//! pairs it with a [`Transport`], by default a blocking `ureq` agent, and
//! exposes one method per operation.
//!
//! # Design
//! - Everything is immutable after construction; clients can be shared.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit and testable.
//! - Statuses in `[200, 400)` are success. Anything else is decoded as an
//!   upstream error payload; bodies that cannot be decoded become
//!   [`GetResponseError::Decoding`], never an API error.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//!
//! ```no_run
//! use getresponse_core::{ClientConfig, GetResponseClient, NewContact};
//!
//! let client = GetResponseClient::new(ClientConfig::new("my-api-key"))?;
//! client.create_contact(&NewContact::new("jane@example.com", "V").name("Jane"))?;
//! let jane = client.get_contact("pV3r", &["name", "email"])?;
//! println!("{:?}", jane.email);
//! # Ok::<(), getresponse_core::GetResponseError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::{ContactsApi, GetResponseClient};
pub use config::{AuthMode, ClientConfig};
pub use error::{decode_error, ApiErrorCode, ErrorPayload, GetResponseError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use types::{Campaign, Contact, ContactQuery, CustomField, Geolocation, NewContact, Tag};
