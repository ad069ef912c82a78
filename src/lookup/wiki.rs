//! Wiki API client
//!
//! Resolves revisions and rendered markup through the MediaWiki Action API
//! (`api.php`, JSON, formatversion 2).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{LookupError, LookupResult, RevisionId, RevisionLookup, RevisionRef};
use crate::config::TimelapseConfig;
use crate::timestamp;

const BASE_PARAMS: [(&str, &str); 3] = [("format", "json"), ("formatversion", "2"), ("origin", "*")];

/// HTTP client for a wiki's Action API
pub struct WikiClient {
    client: Client,
    api_url: String,
}

impl WikiClient {
    pub fn new(api_url: impl Into<String>, user_agent: &str) -> LookupResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    pub fn from_config(config: &TimelapseConfig) -> LookupResult<Self> {
        Self::new(config.api_url.clone(), &config.user_agent)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> LookupResult<Value> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&BASE_PARAMS)
            .query(params)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.to_string()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Protocol(e.to_string()))?;
        check_api_error(&body)?;
        Ok(body)
    }
}

#[async_trait]
impl RevisionLookup for WikiClient {
    async fn resolve_revision(&self, title: &str, at: DateTime<Utc>) -> LookupResult<RevisionRef> {
        let continuation = format!("{}|0", timestamp::encode(at));
        debug!("Resolving revision of '{}' at {}", title, continuation);

        let body = self
            .get_json(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvlimit", "1"),
                ("titles", title),
                ("rvcontinue", &continuation),
            ])
            .await?;
        parse_revision_response(body)
    }

    async fn fetch_markup(&self, id: RevisionId) -> LookupResult<String> {
        debug!("Fetching rendered markup for revision {}", id);
        let oldid = id.to_string();
        let body = self
            .get_json(&[("action", "parse"), ("prop", "text"), ("oldid", &oldid)])
            .await?;
        parse_markup_response(body)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: QueryBody,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<PageBody>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    revisions: Option<Vec<RevisionBody>>,
}

#[derive(Debug, Deserialize)]
struct RevisionBody {
    revid: u64,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: ParseBody,
}

#[derive(Debug, Deserialize)]
struct ParseBody {
    text: String,
}

fn check_api_error(body: &Value) -> LookupResult<()> {
    match body.get("error") {
        Some(error) => {
            let error: ApiErrorBody = serde_json::from_value(error.clone())
                .map_err(|e| LookupError::Protocol(format!("unreadable error envelope: {}", e)))?;
            Err(LookupError::Api {
                code: error.code,
                info: error.info,
            })
        }
        None => Ok(()),
    }
}

/// Extract the revision id from a `prop=revisions` answer.
///
/// A page without revisions (missing page, or nothing before the timestamp)
/// resolves to `NotFound`.
fn parse_revision_response(body: Value) -> LookupResult<RevisionRef> {
    let response: QueryResponse =
        serde_json::from_value(body).map_err(|e| LookupError::Protocol(e.to_string()))?;

    let revision = response
        .query
        .pages
        .into_iter()
        .next()
        .and_then(|page| page.revisions)
        .and_then(|revisions| revisions.into_iter().next());

    Ok(match revision {
        Some(rev) => RevisionRef::Found(RevisionId(rev.revid)),
        None => RevisionRef::NotFound,
    })
}

fn parse_markup_response(body: Value) -> LookupResult<String> {
    let response: ParseResponse =
        serde_json::from_value(body).map_err(|e| LookupError::Protocol(e.to_string()))?;
    Ok(response.parse.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_revision_found() {
        let body = json!({
            "continue": { "rvcontinue": "20050101000000|123", "continue": "||" },
            "query": { "pages": [{
                "pageid": 4242,
                "ns": 0,
                "title": "UVB-76",
                "revisions": [{ "revid": 31337, "parentid": 31000 }]
            }]}
        });
        assert_eq!(
            parse_revision_response(body).unwrap(),
            RevisionRef::Found(RevisionId(31337))
        );
    }

    #[test]
    fn test_parse_revision_without_revisions_is_not_found() {
        let body = json!({
            "query": { "pages": [{ "pageid": 4242, "ns": 0, "title": "UVB-76" }] }
        });
        assert_eq!(parse_revision_response(body).unwrap(), RevisionRef::NotFound);
    }

    #[test]
    fn test_parse_revision_missing_page_is_not_found() {
        let body = json!({
            "query": { "pages": [{ "ns": 0, "title": "Nope", "missing": true }] }
        });
        assert_eq!(parse_revision_response(body).unwrap(), RevisionRef::NotFound);
    }

    #[test]
    fn test_parse_revision_malformed() {
        let body = json!({ "batchcomplete": true });
        assert!(matches!(
            parse_revision_response(body),
            Err(LookupError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_markup() {
        let body = json!({
            "parse": { "title": "UVB-76", "pageid": 4242, "revid": 31337, "text": "<div>buzz</div>" }
        });
        assert_eq!(parse_markup_response(body).unwrap(), "<div>buzz</div>");
    }

    #[test]
    fn test_api_error_envelope() {
        let body = json!({
            "error": { "code": "nosuchrevid", "info": "There is no revision with ID 1." }
        });
        match check_api_error(&body) {
            Err(LookupError::Api { code, info }) => {
                assert_eq!(code, "nosuchrevid");
                assert!(info.contains("ID 1"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_client_keeps_api_url() {
        let client = WikiClient::new("https://example.org/w/api.php", "test-agent").unwrap();
        assert_eq!(client.api_url(), "https://example.org/w/api.php");
    }
}
