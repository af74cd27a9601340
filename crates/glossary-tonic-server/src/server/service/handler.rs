//! gRPC service implementation for the term glossary.
//!
//! This module defines [`TermService`], the concrete implementation of the
//! [`GlossaryService`] gRPC service defined in `glossary.proto`.
//! Every call performs exactly one [`TermStore`] operation and maps the result
//! straight into the response message.
//!
//! ## Responsibilities
//!
//! - Normalise paging values: a zero limit means 10, a negative limit means
//!   no limit, a negative offset means 0.
//! - Translate a lookup miss into `NOT_FOUND` instead of an empty term.
//! - Report storage failures as `INTERNAL` without taking the process down.
//! - Record per-RPC telemetry.

use crate::server::{
    storage::TermStore,
    telemetry::{
        increment_errors, increment_not_found, increment_requests, record_request_duration,
        record_terms_listed,
    },
};
use glossary_tonic_core::{
    Error, Result,
    proto::{
        AddTermRequest, AddTermResponse, GetTermRequest, GetTermResponse, ListTermsRequest,
        ListTermsResponse, glossary_service_server::GlossaryService,
    },
};
use std::time::Instant;
use tonic::{Request, Response, Status};

const GET_TERM: &str = "GetTerm";
const LIST_TERMS: &str = "ListTerms";
const ADD_TERM: &str = "AddTerm";

/// gRPC front end over a [`TermStore`].
///
/// Holds no per-request state, so tonic may run any number of calls against
/// clones of it concurrently.
#[derive(Debug, Clone)]
pub struct TermService {
    store: TermStore,
}

impl TermService {
    pub fn new(store: TermStore) -> Self {
        Self { store }
    }

    async fn lookup(&self, req: GetTermRequest) -> Result<GetTermResponse> {
        match self.store.fetch_term(&req.keyword).await? {
            Some(term) => Ok(GetTermResponse { term: Some(term) }),
            None => Err(Error::TermNotFound {
                keyword: req.keyword,
            }),
        }
    }

    async fn page(&self, req: ListTermsRequest) -> Result<ListTermsResponse> {
        let page = self
            .store
            .list_terms(req.limit.into(), req.offset.into())
            .await?;
        record_terms_listed(page.terms.len() as f64);

        Ok(ListTermsResponse {
            terms: page.terms,
            total: i32::try_from(page.total).unwrap_or(i32::MAX),
        })
    }

    async fn upsert(&self, req: AddTermRequest) -> Result<AddTermResponse> {
        // An absent term is stored as an empty one under the keyword "".
        let term = req.term.unwrap_or_default();
        let success = self.store.upsert_term(term).await?;
        Ok(AddTermResponse { success })
    }
}

#[tonic::async_trait]
impl GlossaryService for TermService {
    #[tracing::instrument(skip_all, fields(keyword = %req.get_ref().keyword))]
    async fn get_term(
        &self,
        req: Request<GetTermRequest>,
    ) -> core::result::Result<Response<GetTermResponse>, Status> {
        let start = Instant::now();
        increment_requests(GET_TERM);
        let result = self.lookup(req.into_inner()).await;
        complete(GET_TERM, start, result)
    }

    #[tracing::instrument(skip_all, fields(limit = req.get_ref().limit, offset = req.get_ref().offset))]
    async fn list_terms(
        &self,
        req: Request<ListTermsRequest>,
    ) -> core::result::Result<Response<ListTermsResponse>, Status> {
        let start = Instant::now();
        increment_requests(LIST_TERMS);
        let result = self.page(req.into_inner()).await;
        complete(LIST_TERMS, start, result)
    }

    #[tracing::instrument(skip_all, fields(keyword = req.get_ref().term.as_ref().map(|t| t.keyword.as_str())))]
    async fn add_term(
        &self,
        req: Request<AddTermRequest>,
    ) -> core::result::Result<Response<AddTermResponse>, Status> {
        let start = Instant::now();
        increment_requests(ADD_TERM);
        let result = self.upsert(req.into_inner()).await;
        complete(ADD_TERM, start, result)
    }
}

/// Records telemetry for a finished call and converts its outcome into a
/// tonic response.
fn complete<T>(
    rpc: &'static str,
    start: Instant,
    result: Result<T>,
) -> core::result::Result<Response<T>, Status> {
    record_request_duration(rpc, start.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(body) => Ok(Response::new(body)),
        Err(err) => {
            match &err {
                Error::TermNotFound { keyword } => {
                    increment_not_found();
                    tracing::debug!(%keyword, "term not found");
                }
                Error::Storage { context } => {
                    increment_errors(rpc);
                    tracing::error!(%context, "{rpc} failed");
                }
            }
            Err(err.into())
        }
    }
}
