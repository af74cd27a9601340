//! Thin wrapper over the generated glossary client.

use glossary_tonic_core::proto::{
    AddTermRequest, AddTermResponse, GetTermRequest, GetTermResponse, ListTermsRequest,
    ListTermsResponse, Term, glossary_service_client::GlossaryServiceClient,
};
use tonic::{
    Status,
    transport::{Channel, Endpoint},
};

/// One simulated user's connection to the server.
#[derive(Debug, Clone)]
pub struct GlossaryClient {
    inner: GlossaryServiceClient<Channel>,
}

impl GlossaryClient {
    pub async fn connect(endpoint: Endpoint) -> Result<Self, tonic::transport::Error> {
        let channel = endpoint.connect().await?;
        Ok(Self {
            inner: GlossaryServiceClient::new(channel),
        })
    }

    pub async fn get_term(&mut self, keyword: impl Into<String>) -> Result<GetTermResponse, Status> {
        let resp = self
            .inner
            .get_term(GetTermRequest {
                keyword: keyword.into(),
            })
            .await?;
        Ok(resp.into_inner())
    }

    pub async fn list_terms(&mut self, limit: i32, offset: i32) -> Result<ListTermsResponse, Status> {
        let resp = self
            .inner
            .list_terms(ListTermsRequest { limit, offset })
            .await?;
        Ok(resp.into_inner())
    }

    pub async fn add_term(&mut self, term: Term) -> Result<AddTermResponse, Status> {
        let resp = self
            .inner
            .add_term(AddTermRequest { term: Some(term) })
            .await?;
        Ok(resp.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use glossary_tonic_core::proto::glossary_service_server::{
        GlossaryService, GlossaryServiceServer,
    };
    use glossary_tonic_core::types::SEED_TERMS;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::{Request, Response, transport::Server};

    /// Answers like a freshly seeded server without touching a database.
    #[derive(Debug, Default)]
    struct SeededGlossary;

    fn seed_terms() -> Vec<Term> {
        SEED_TERMS
            .iter()
            .map(|seed| Term {
                keyword: seed.keyword.to_string(),
                title: seed.title.to_string(),
                description: seed.description.to_string(),
            })
            .collect()
    }

    #[tonic::async_trait]
    impl GlossaryService for SeededGlossary {
        async fn get_term(
            &self,
            req: Request<GetTermRequest>,
        ) -> Result<Response<GetTermResponse>, Status> {
            let keyword = req.into_inner().keyword;
            seed_terms()
                .into_iter()
                .find(|t| t.keyword == keyword)
                .map(|term| Response::new(GetTermResponse { term: Some(term) }))
                .ok_or_else(|| Status::not_found("Term not found"))
        }

        async fn list_terms(
            &self,
            req: Request<ListTermsRequest>,
        ) -> Result<Response<ListTermsResponse>, Status> {
            let req = req.into_inner();
            let mut terms = seed_terms();
            terms.sort_by(|a, b| a.keyword.cmp(&b.keyword));
            let total = terms.len() as i32;
            let terms = terms
                .into_iter()
                .skip(req.offset.max(0) as usize)
                .take(if req.limit == 0 { 10 } else { req.limit.max(0) as usize })
                .collect();
            Ok(Response::new(ListTermsResponse { terms, total }))
        }

        async fn add_term(
            &self,
            _req: Request<AddTermRequest>,
        ) -> Result<Response<AddTermResponse>, Status> {
            Ok(Response::new(AddTermResponse { success: true }))
        }
    }

    /// Serves [`SeededGlossary`] on an ephemeral port until the returned
    /// sender is used or dropped.
    pub(crate) async fn spawn_seeded_server() -> (Endpoint, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(
            Server::builder()
                .add_service(GlossaryServiceServer::new(SeededGlossary))
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    let _ = stop_rx.await;
                }),
        );
        let endpoint = Endpoint::from_shared(format!("http://{addr}")).unwrap();
        (endpoint, stop_tx)
    }

    #[tokio::test]
    async fn wraps_all_three_calls() {
        let (endpoint, _stop) = spawn_seeded_server().await;
        let mut client = GlossaryClient::connect(endpoint).await.unwrap();

        let gof = client.get_term("gof").await.unwrap().term.unwrap();
        assert_eq!(gof.title, "Паттерны GoF");

        let status = client.get_term("protobuf").await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let page = client.list_terms(2, 0).await.unwrap();
        assert_eq!(page.terms.len(), 2);
        assert_eq!(page.total, 4);

        let added = client.add_term(Term::default()).await.unwrap();
        assert!(added.success);
    }
}
