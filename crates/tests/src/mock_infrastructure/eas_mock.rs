//! GraphQL Mock Builder for EAS Indexer Testing

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Serves attestation pages keyed by their `skip` offset.
pub struct EasMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl EasMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks the page of `schema_id` attestations starting at `skip`.
    pub fn mock_attestations_page(
        &mut self,
        schema_id: &str,
        skip: usize,
        attestations: &[Value],
    ) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r"query Attestations".to_string()),
                Matcher::Regex(format!(r#""equals"\s*:\s*"{schema_id}""#)),
                Matcher::Regex(format!(r#""skip"\s*:\s*{skip}[,}}]"#)),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "data": { "attestations": attestations } }).to_string())
            .expect(1)
            .create();
        self.mocks.push(mock);
        self
    }

    /// Mocks a GraphQL `errors` response for any query.
    pub fn mock_graphql_error(&mut self, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "data": null, "errors": [{ "message": message }] }).to_string())
            .create();
        self.mocks.push(mock);
        self
    }

    pub fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert();
        }
    }
}
