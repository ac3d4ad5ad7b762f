//! Resource-generic operations: list, get by id, lookup, deleted entities,
//! and the log/statistics reporting endpoints.

use serde_json::{json, Value};

use crate::client::SchoolDataClient;
use crate::error::ApiError;
use crate::filters::{DeletedEntitiesFilter, ToFilters};
use crate::pagination::{Page, PageRequest};
use crate::query::Filters;
use crate::resources::{Endpoint, Resource};
use crate::response::Outcome;
use crate::transport::Transport;

const EXPAND_REFERENCE_NAMES: &str = "expandReferenceNames";

impl<T: Transport> SchoolDataClient<T> {
    /// Fetch one page of a collection.
    pub async fn list(
        &self,
        resource: Resource,
        filter: &impl ToFilters,
        page: &PageRequest,
    ) -> Result<Page<Value>, ApiError> {
        let endpoint = Endpoint::list(resource)?;
        let mut filters = filter.to_filters();
        page.apply(&mut filters);
        match self.call(&endpoint, &filters, None).await? {
            Outcome::Json(value) => Page::from_value(value),
            Outcome::Empty => Ok(Page {
                data: Vec::new(),
                page_token: None,
            }),
        }
    }

    /// Fetch a single entity. `None` when the server answers 204.
    pub async fn get(
        &self,
        resource: Resource,
        id: &str,
        expand_reference_names: bool,
    ) -> Result<Option<Value>, ApiError> {
        let endpoint = Endpoint::by_id(resource, id)?;
        let filters = expand_filter(expand_reference_names);
        Ok(self.call(&endpoint, &filters, None).await?.into_value())
    }

    /// Fetch every entity whose id is in `ids`.
    pub async fn lookup(
        &self,
        resource: Resource,
        ids: &[String],
        expand_reference_names: bool,
    ) -> Result<Vec<Value>, ApiError> {
        let endpoint = Endpoint::lookup(resource)?;
        let filters = expand_filter(expand_reference_names);
        let body = json!({ "ids": ids });
        match self.call(&endpoint, &filters, Some(&body)).await? {
            Outcome::Json(value) => Ok(Page::from_value(value)?.data),
            Outcome::Empty => Ok(Vec::new()),
        }
    }

    /// Fetch one page of deletion records.
    pub async fn deleted_entities(
        &self,
        filter: &DeletedEntitiesFilter,
        page: &PageRequest,
    ) -> Result<Option<Value>, ApiError> {
        let endpoint = Endpoint::list(Resource::DeletedEntities)?;
        let mut filters = filter.to_filters();
        page.apply(&mut filters);
        Ok(self.call(&endpoint, &filters, None).await?.into_value())
    }

    /// `POST /log` with caller-defined entries.
    pub async fn log(&self, entries: &Value) -> Result<Outcome, ApiError> {
        self.call(&Endpoint::create(Resource::Log), &Filters::new(), Some(entries))
            .await
    }

    /// `POST /statistics` with caller-defined entries.
    pub async fn statistics(&self, entries: &Value) -> Result<Outcome, ApiError> {
        self.call(
            &Endpoint::create(Resource::Statistics),
            &Filters::new(),
            Some(entries),
        )
        .await
    }
}

fn expand_filter(expand_reference_names: bool) -> Filters {
    Filters::new().with_opt(EXPAND_REFERENCE_NAMES, expand_reference_names.then_some(true))
}
