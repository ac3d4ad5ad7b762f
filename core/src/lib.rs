//! Async client core for the SS12000 school-data REST API.
//!
//! # Overview
//! A generic request engine shared by every resource family: typed query
//! filters are encoded by `query`, requests are assembled and dispatched by
//! `SchoolDataClient`, and raw responses are classified by
//! `response::normalize` into `Outcome::Empty`, `Outcome::Json`, or an
//! `ApiError`.
//!
//! # Design
//! - The `Context` (base URL, bearer token, transport) is validated once and
//!   never mutated afterwards, so one client serves any number of concurrent
//!   calls.
//! - Building and parsing are plain functions over `HttpRequest` /
//!   `HttpResponse`; the network sits behind the `Transport` trait.
//! - Decoded bodies stay `serde_json::Value`; callers choose a schema through
//!   `Outcome::decode`.
//! - One page per list call. Looping over pages is the caller's job.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod facade;
pub mod filters;
pub mod http;
pub mod pagination;
pub mod query;
pub mod resources;
pub mod response;
pub mod subscriptions;
pub mod transport;
pub mod webhook;

pub use client::SchoolDataClient;
pub use config::ClientConfig;
pub use context::Context;
pub use error::{ApiError, TransportError};
pub use filters::{
    ActivityFilter, CalendarEventFilter, DateBounds, DeletedEntitiesFilter, GroupFilter, MetaFilter,
    OrganisationFilter, PersonFilter, TimeBounds, ToFilters,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};
pub use pagination::{Page, PageRequest};
pub use query::{FilterValue, Filters, QueryParams};
pub use resources::{Endpoint, Resource};
pub use response::{normalize, Outcome};
pub use subscriptions::{CreateSubscription, ResourceTypeRef, Subscription};
pub use transport::{ReqwestTransport, Transport};
pub use webhook::ChangeNotification;
