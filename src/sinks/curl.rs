use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tracing::info;

/// Run `<curl_cli> -H <header> <url> <extra_args...>` and return its stdout.
pub async fn curl_command(curl_cli: &str, header: &str, url: &str, extra_args: &[String]) -> Result<String> {
    info!("calling '{}' with '{}'", url, curl_cli);
    let output = Command::new(curl_cli)
        .arg("-H")
        .arg(header)
        .arg(url)
        .args(extra_args)
        .output()
        .await
        .with_context(|| format!("failed to run '{}'", curl_cli))?;

    if !output.status.success() {
        return Err(anyhow!(
            "'{}' failed ({}): {}",
            curl_cli,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
