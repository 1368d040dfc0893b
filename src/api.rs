//! The HTTP fallback path: the two native B2 API calls the run needs when the
//! CLI is absent or exhausted.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::rules::CorsRule;

/// The pieces of a `b2_authorize_account` response the update call needs,
/// held in memory only for the duration of the run.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub api_url: String,
    pub token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeResponse {
    api_url: Option<String>,
    authorization_token: Option<String>,
}

/// Calls `b2_authorize_account` with HTTP basic auth. `basic_user` is the
/// application key id, or the account id when no key id was configured.
pub async fn authorize_account(
    client: &Client,
    auth_url: &str,
    basic_user: &str,
    application_key: &str,
) -> Result<Authorization> {
    let url = format!(
        "{}/b2api/v2/b2_authorize_account",
        auth_url.trim_end_matches('/')
    );
    debug!("Sending authorize request to: {}", url);

    let response = client
        .get(&url)
        .basic_auth(basic_user, Some(application_key))
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::AuthorizationFailed {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: AuthorizeResponse = serde_json::from_str(&body)?;
    let api_url = parsed.api_url.ok_or(Error::MalformedResponse("apiUrl"))?;
    let token = parsed
        .authorization_token
        .ok_or(Error::MalformedResponse("authorizationToken"))?;
    Ok(Authorization { api_url, token })
}

/// Calls `b2_update_bucket` at the authorized API base URL, replacing the
/// bucket's CORS rules. The account id may be absent; the server rejects the
/// request with its own diagnostic in that case.
pub async fn update_bucket(
    client: &Client,
    auth: &Authorization,
    account_id: Option<&str>,
    bucket_id: &str,
    rules: &[CorsRule],
) -> Result<Value> {
    let url = format!(
        "{}/b2api/v2/b2_update_bucket",
        auth.api_url.trim_end_matches('/')
    );
    let payload = json!({
        "accountId": account_id,
        "bucketId": bucket_id,
        "corsRules": rules,
    });

    info!("Updating bucket CORS via native B2 API...");
    let response = client
        .post(&url)
        .header("Authorization", &auth.token)
        .json(&payload)
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::UpdateFailed {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use mockito::{Matcher, Server};

    fn basic_header(user: &str, password: &str) -> String {
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", user, password))
        )
    }

    /// A successful authorize returns the API base URL and the bearer token,
    /// and carries the key pair as basic auth.
    #[tokio::test]
    async fn authorize_success() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/b2api/v2/b2_authorize_account")
            .match_header(
                "authorization",
                basic_header("keyid123", "secret").as_str(),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"accountId": "00acc", "apiUrl": "https://api005.backblazeb2.com", "authorizationToken": "token123"}"#,
            )
            .create_async()
            .await;

        let client = Client::new();
        let auth = authorize_account(&client, &server.url(), "keyid123", "secret")
            .await
            .expect("authorize should succeed");
        m.assert_async().await;
        assert_eq!(auth.api_url, "https://api005.backblazeb2.com");
        assert_eq!(auth.token, "token123");
    }

    /// A non-success status is fatal and carries the status and body.
    #[tokio::test]
    async fn authorize_rejected() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/b2api/v2/b2_authorize_account")
            .with_status(401)
            .with_body("bad credentials")
            .create_async()
            .await;

        let client = Client::new();
        let err = authorize_account(&client, &server.url(), "keyid123", "wrong")
            .await
            .expect_err("authorize should fail");
        m.assert_async().await;
        match err {
            Error::AuthorizationFailed { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad credentials");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// A 200 without apiUrl is a malformed response naming the field.
    #[tokio::test]
    async fn authorize_missing_api_url() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/b2api/v2/b2_authorize_account")
            .with_status(200)
            .with_body(r#"{"authorizationToken": "token123"}"#)
            .create_async()
            .await;

        let client = Client::new();
        let err = authorize_account(&client, &server.url(), "keyid123", "secret")
            .await
            .expect_err("authorize should fail");
        assert!(matches!(err, Error::MalformedResponse("apiUrl")));
    }

    #[tokio::test]
    async fn authorize_missing_token() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/b2api/v2/b2_authorize_account")
            .with_status(200)
            .with_body(r#"{"apiUrl": "https://api005.backblazeb2.com"}"#)
            .create_async()
            .await;

        let client = Client::new();
        let err = authorize_account(&client, &server.url(), "keyid123", "secret")
            .await
            .expect_err("authorize should fail");
        assert!(matches!(err, Error::MalformedResponse("authorizationToken")));
    }

    /// The update call posts the rule list with the bearer token.
    #[tokio::test]
    async fn update_bucket_success() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/b2api/v2/b2_update_bucket")
            .match_header("authorization", "token123")
            .match_body(Matcher::PartialJson(json!({
                "accountId": "00acc",
                "bucketId": "bucket123",
                "corsRules": [{"corsRuleName": "s3UploadFromFrontend"}],
            })))
            .with_status(200)
            .with_body(r#"{"bucketId": "bucket123"}"#)
            .create_async()
            .await;

        let auth = Authorization {
            api_url: server.url(),
            token: "token123".to_string(),
        };
        let rules = [CorsRule::for_origins(vec!["https://a.example".to_string()])];
        let client = Client::new();
        let response = update_bucket(&client, &auth, Some("00acc"), "bucket123", &rules)
            .await
            .expect("update should succeed");
        m.assert_async().await;
        assert_eq!(response["bucketId"], "bucket123");
    }

    #[tokio::test]
    async fn update_bucket_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/b2api/v2/b2_update_bucket")
            .with_status(400)
            .with_body("no such bucket")
            .create_async()
            .await;

        let auth = Authorization {
            api_url: server.url(),
            token: "token123".to_string(),
        };
        let rules = [CorsRule::for_origins(vec!["https://a.example".to_string()])];
        let client = Client::new();
        let err = update_bucket(&client, &auth, None, "missing", &rules)
            .await
            .expect_err("update should fail");
        assert!(matches!(err, Error::UpdateFailed { status: 400, .. }));
    }
}
