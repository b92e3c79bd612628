//! UniProt REST keyword lookup.

use embedplot_shared::{ENTRY_ID_PLACEHOLDER, EmbedplotError, Result, build_client};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{KeywordLookup, KeywordRecord};

/// Search response body. Only the first result is consulted.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<KeywordRecord>,
}

/// Looks up keywords with one GET per accession against a templated URL.
#[derive(Debug, Clone)]
pub struct UniprotKeywordClient {
    client: Client,
    url_template: String,
}

impl UniprotKeywordClient {
    /// Build a client for `url_template` (must contain `ENTRY_ID`).
    /// `timeout_secs = None` leaves requests unbounded.
    pub fn new(url_template: impl Into<String>, timeout_secs: Option<u64>) -> Result<Self> {
        Ok(Self::with_client(build_client(timeout_secs)?, url_template))
    }

    /// Reuse an existing reqwest client.
    pub fn with_client(client: Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    /// The request URL for `accession`, with the id percent-encoded.
    pub fn request_url(&self, accession: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(accession.as_bytes()).collect();
        self.url_template.replace(ENTRY_ID_PLACEHOLDER, &encoded)
    }
}

impl KeywordLookup for UniprotKeywordClient {
    async fn lookup(&self, accession: &str) -> Result<KeywordRecord> {
        let url = self.request_url(accession);
        debug!(accession, %url, "requesting keywords");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbedplotError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedplotError::Transport(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EmbedplotError::Transport(format!("{url}: body read failed: {e}")))?;

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| EmbedplotError::schema(format!("unexpected keyword response: {e}")))?;

        parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedplotError::schema("keyword search returned no results"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(server: &wiremock::MockServer) -> String {
        format!(
            "{}/uniprotkb/search?query=accession_id:ENTRY_ID&fields=keyword",
            server.uri()
        )
    }

    #[test]
    fn request_url_substitutes_and_encodes() {
        let client = UniprotKeywordClient::new(
            "https://rest.uniprot.org/uniprotkb/search?query=accession_id:ENTRY_ID&fields=keyword",
            None,
        )
        .unwrap();
        assert_eq!(
            client.request_url("P69905"),
            "https://rest.uniprot.org/uniprotkb/search?query=accession_id:P69905&fields=keyword"
        );
        assert!(client.request_url("A&B").contains("accession_id:A%26B"));
    }

    #[tokio::test]
    async fn lookup_parses_first_result() {
        let server = wiremock::MockServer::start().await;

        let body = serde_json::json!({
            "results": [{
                "entryType": "UniProtKB reviewed (Swiss-Prot)",
                "primaryAccession": "P69905",
                "keywords": [
                    { "id": "KW-0349", "category": "Ligand", "name": "Heme" },
                    { "id": "KW-0561", "category": "Biological process", "name": "Oxygen transport" }
                ]
            }]
        });

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/uniprotkb/search"))
            .and(wiremock::matchers::query_param("query", "accession_id:P69905"))
            .and(wiremock::matchers::query_param("fields", "keyword"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = UniprotKeywordClient::new(template(&server), None).unwrap();
        let record = client.lookup("P69905").await.unwrap();

        assert_eq!(record.primary_accession, "P69905");
        assert_eq!(record.keywords.len(), 2);
        assert_eq!(record.keywords[0].category, "Ligand");
        assert_eq!(record.keywords[0].id.as_deref(), Some("KW-0349"));
        assert_eq!(record.keywords[1].name, "Oxygen transport");
    }

    #[tokio::test]
    async fn lookup_sends_the_embedplot_user_agent() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::header("user-agent", embedplot_shared::USER_AGENT))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "primaryAccession": "P69905", "keywords": [] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = UniprotKeywordClient::new(template(&server), Some(5)).unwrap();
        let record = client.lookup("P69905").await.unwrap();
        assert!(record.keywords.is_empty());
    }

    #[tokio::test]
    async fn lookup_fails_on_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = UniprotKeywordClient::new(template(&server), None).unwrap();
        let err = client.lookup("P69905").await.unwrap_err();
        assert!(matches!(err, EmbedplotError::Transport(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn lookup_fails_on_empty_results() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "results": [] })),
            )
            .mount(&server)
            .await;

        let client = UniprotKeywordClient::new(template(&server), None).unwrap();
        let err = client.lookup("P00000").await.unwrap_err();
        assert!(matches!(err, EmbedplotError::Schema { .. }));
        assert!(err.to_string().contains("no results"));
    }

    #[tokio::test]
    async fn lookup_fails_on_missing_fields() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "results": [{ "primaryAccession": "P69905" }] }),
            ))
            .mount(&server)
            .await;

        let client = UniprotKeywordClient::new(template(&server), None).unwrap();
        let err = client.lookup("P69905").await.unwrap_err();
        assert!(matches!(err, EmbedplotError::Schema { .. }));
    }

    #[tokio::test]
    async fn lookup_fails_on_malformed_json() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = UniprotKeywordClient::new(template(&server), None).unwrap();
        let err = client.lookup("P69905").await.unwrap_err();
        assert!(matches!(err, EmbedplotError::Schema { .. }));
    }
}
