//! Placing phone calls through the system `tel:` handler

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use super::{ActionError, ActionOutcome};

/// Desktop URL openers, in lookup order
const URL_OPENERS: &[&str] = &["xdg-open", "open", "gio"];

/// Something that can hand a `tel:` URL to the platform dialer
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Whether a handler exists for the URL
    async fn can_open(&self, url: &str) -> bool;

    /// Open the URL
    async fn open(&self, url: &str) -> ActionOutcome<()>;
}

/// Build a `tel:` URL, percent-encoding anything outside the dial alphabet
#[must_use]
pub fn tel_url(phone_number: &str) -> String {
    let mut url = String::from("tel:");
    for c in phone_number.trim().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '+' | '*' | '#' | '-' | '.' | '(' | ')') {
            url.push(c);
        } else {
            url.push_str(&urlencoding::encode(c.encode_utf8(&mut [0; 4])));
        }
    }
    url
}

/// Dial a number
///
/// Only triggers the dial action; whether the call connects is not checked.
///
/// # Errors
///
/// `UnsupportedOperation` if the device cannot place calls
pub async fn call_someone(dialer: &dyn Dialer, phone_number: &str) -> ActionOutcome<String> {
    let url = tel_url(phone_number);

    if !dialer.can_open(&url).await {
        return Err(ActionError::unsupported(
            "Phone calls are not supported on this device",
        ));
    }

    dialer.open(&url).await?;
    tracing::info!(%url, "dial requested");

    Ok(format!("Calling {phone_number}"))
}

/// Dialer that delegates to the desktop URL handler
#[derive(Debug, Clone, Default)]
pub struct SystemDialer {
    opener: Option<PathBuf>,
}

impl SystemDialer {
    /// Find a URL opener on `PATH`
    #[must_use]
    pub fn detect() -> Self {
        let opener = URL_OPENERS.iter().find_map(|name| which::which(name).ok());
        if opener.is_none() {
            tracing::warn!("no URL opener found; calls will be unsupported");
        }
        Self { opener }
    }

    /// Use a specific opener binary
    #[must_use]
    pub const fn with_opener(opener: PathBuf) -> Self {
        Self {
            opener: Some(opener),
        }
    }
}

#[async_trait]
impl Dialer for SystemDialer {
    async fn can_open(&self, url: &str) -> bool {
        url.starts_with("tel:") && url.len() > "tel:".len() && self.opener.is_some()
    }

    async fn open(&self, url: &str) -> ActionOutcome<()> {
        let Some(opener) = &self.opener else {
            return Err(ActionError::unsupported(
                "Phone calls are not supported on this device",
            ));
        };

        // `gio` needs the `open` verb
        let mut cmd = tokio::process::Command::new(opener);
        if opener.file_name().is_some_and(|n| n == "gio") {
            cmd.arg("open");
        }
        cmd.arg(url).stdout(Stdio::null()).stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| ActionError::unsupported(format!("failed to launch dialer: {e}")))?;

        let output = tokio::time::timeout(Duration::from_secs(10), child.wait_with_output())
            .await
            .map_err(|_| ActionError::upstream("dialer did not respond"))?
            .map_err(|e| ActionError::upstream(format!("dialer error: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ActionError::unsupported(format!(
                "dialer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
