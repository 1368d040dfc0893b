//! The run itself: CLI attempts first, the two-call HTTP path second.

use std::fmt;

use reqwest::Client;
use tracing::info;

use crate::api;
use crate::cli::B2Cli;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::rules::CorsRule;

/// Which path applied the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Cli,
    Http,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Cli => write!(f, "b2 CLI"),
            Outcome::Http => write!(f, "HTTP API"),
        }
    }
}

/// Ensures the bucket's CORS ruleset includes the configured rule.
///
/// Fatal only on missing mandatory configuration or a failed HTTP call;
/// every CLI misstep is logged and absorbed by the cascade.
pub async fn run(config: &Config) -> Result<Outcome> {
    let (application_key, bucket_id) = config.mandatory()?;
    let rules = [CorsRule::for_origins(config.origins())];
    let cors_payload = serde_json::to_string(&rules)?;

    let cli = B2Cli::discover(config.cli_path());
    if let Some(cli) = &cli {
        info!("Using b2 CLI at: {}", cli.path().display());
        cli.authorize(config.application_key_id(), application_key)
            .await;
        let bucket_name = cli.resolve_bucket_name(bucket_id).await;
        if cli
            .apply_cors(bucket_name.as_deref(), bucket_id, &cors_payload)
            .await
        {
            info!("Done. Changes may take a few minutes to propagate.");
            return Ok(Outcome::Cli);
        }
    } else {
        info!("b2 CLI not found, using the HTTP API directly");
    }

    // The HTTP payload wants the full account id. Recover it from the CLI
    // when the configured one is absent or lacks the vendor's "00" prefix.
    let mut account_id = config.account_id().map(str::to_string);
    if account_id.as_deref().map_or(true, |id| !id.starts_with("00")) {
        if let Some(cli) = &cli {
            if let Some(recovered) = cli.account_id().await {
                info!("Using accountId from b2 CLI: {}", recovered);
                account_id = Some(recovered);
            }
        }
    }

    let Some(basic_user) = config.application_key_id().or(account_id.as_deref()) else {
        return Err(Error::MissingConfig(
            "Set B2_APPLICATION_KEY_ID, or ensure the b2 CLI has cached credentials."
                .to_string(),
        ));
    };

    info!("Authorizing with B2 (HTTP API)...");
    let client = Client::new();
    let auth = api::authorize_account(&client, &config.auth_url, basic_user, application_key).await?;
    let response =
        api::update_bucket(&client, &auth, account_id.as_deref(), bucket_id, &rules).await?;

    info!(
        "Update response: {}",
        serde_json::to_string_pretty(&response)?
    );
    info!("Done. Changes may take a few minutes to propagate.");
    Ok(Outcome::Http)
}
