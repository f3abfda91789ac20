use anyhow::{Result, bail};
use refcheck_core::advisory::{AdvisoryClient, AdvisoryMode};
use refcheck_core::config::Config;

use super::{gemini_client, until_interrupted};

/// Prints the advisory answer. Service failures are printed as the answer
/// and do not change the exit code.
pub async fn run(mode: AdvisoryMode, text: &str, config: &Config) -> Result<()> {
    let client = gemini_client(config)?;
    tracing::debug!(model = %client.config().text_model, %mode, "advisory query");

    let advisory = AdvisoryClient::from_config(client, config);
    let Some(answer) = until_interrupted(advisory.query(mode, text)).await? else {
        bail!("Nothing to ask: the question is empty");
    };

    if let Some(kind) = answer.failure {
        tracing::info!(%kind, configuration = kind.is_configuration(), "advisory query failed");
    }
    println!("{}", answer.text);
    Ok(())
}
