use anyhow::{bail, Context, Result};

use crate::model::Rumour;

/// Open a URL in the user's default browser
///
/// # Errors
/// Returns error if browser cannot be opened (e.g., no browser available)
pub fn open_url(url: &str) -> Result<()> {
    webbrowser::open(url)
        .with_context(|| format!("Failed to open browser for URL: {}", url))?;
    Ok(())
}

/// The link to open for a rumour: its article URL.
pub fn rumour_url(rumour: &Rumour) -> Result<&str> {
    match rumour.source_url.as_deref().map(str::trim) {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(url),
        Some(url) if !url.is_empty() => bail!(
            "Rumour #{} has a malformed source URL: {}",
            rumour.id,
            url
        ),
        _ => bail!("Rumour #{} has no source URL", rumour.id),
    }
}
