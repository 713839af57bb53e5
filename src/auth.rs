//! OAuth2 authentication for the Gmail API
//!
//! The purge pipeline never touches credentials; it receives the hub built
//! here through [`crate::client::ProductionGmailClient`].

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::env;
use std::path::Path;
use yup_oauth2::ApplicationSecret;

use crate::client::{FULL_ACCESS_SCOPE, MODIFY_SCOPE};
use crate::error::{GmailError, Result};
use crate::models::Mode;

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Narrowest scope that allows the given mode.
///
/// `messages.delete` is only permitted with full mailbox access; everything
/// else works with `gmail.modify`.
pub fn scope_for_mode(mode: Mode) -> &'static str {
    match mode {
        Mode::PermanentDelete => FULL_ACCESS_SCOPE,
        Mode::Preview | Mode::MoveToTrash => MODIFY_SCOPE,
    }
}

/// Initialize Gmail API hub with OAuth2 authentication
///
/// Reads the client secret from `credentials_path`, falling back to
/// [`load_credentials_from_env`] when the file does not exist.
///
/// Uses the installed-app flow (opens a browser on first use), persists the
/// token cache to `token_cache_path`, and pre-authorises the scope needed for
/// `mode` so the first API call does not trigger a second consent screen.
pub async fn initialize_gmail_hub(
    credentials_path: &Path,
    token_cache_path: &Path,
    mode: Mode,
) -> Result<GmailHub> {
    let secret = if credentials_path.exists() {
        yup_oauth2::read_application_secret(credentials_path)
            .await
            .map_err(|e| GmailError::AuthError(format!("Failed to read credentials: {}", e)))?
    } else {
        load_credentials_from_env().map_err(|e| {
            GmailError::AuthError(format!(
                "No credentials file at {:?} and no environment fallback: {}",
                credentials_path, e
            ))
        })?
    };

    if let Some(parent) = token_cache_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| GmailError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    let _token = auth
        .token(&[scope_for_mode(mode)])
        .await
        .map_err(|e| GmailError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if token_cache_path.exists() {
        secure_token_file(token_cache_path).await?;
    }

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| GmailError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Load OAuth2 client credentials from environment variables
///
/// # Environment Variables
/// - `GMAIL_CLIENT_ID`: OAuth2 client ID
/// - `GMAIL_CLIENT_SECRET`: OAuth2 client secret
/// - `GMAIL_REDIRECT_URI`: Redirect URI (optional, defaults to http://localhost:8080)
pub fn load_credentials_from_env() -> Result<ApplicationSecret> {
    let client_id = env::var("GMAIL_CLIENT_ID")
        .map_err(|_| GmailError::ConfigError("GMAIL_CLIENT_ID not set".to_string()))?;
    let client_secret = env::var("GMAIL_CLIENT_SECRET")
        .map_err(|_| GmailError::ConfigError("GMAIL_CLIENT_SECRET not set".to_string()))?;
    let redirect_uri =
        env::var("GMAIL_REDIRECT_URI").unwrap_or_else(|_| "http://localhost:8080".to_string());

    Ok(ApplicationSecret {
        client_id,
        client_secret,
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        redirect_uris: vec![redirect_uri],
        ..Default::default()
    })
}

/// Restrict the token cache to its owner (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    fn test_scope_for_mode() {
        assert_eq!(scope_for_mode(Mode::Preview), MODIFY_SCOPE);
        assert_eq!(scope_for_mode(Mode::MoveToTrash), MODIFY_SCOPE);
        assert_eq!(scope_for_mode(Mode::PermanentDelete), "https://mail.google.com/");
    }

    #[tokio::test]
    async fn test_secure_token_file() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "token").await.unwrap();

        secure_token_file(temp_file.path()).await.unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = tokio::fs::metadata(temp_file.path()).await.unwrap();
            assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_credentials_is_auth_error() {
        env::remove_var("GMAIL_CLIENT_ID");
        let dir = tempfile::tempdir().unwrap();
        let result = initialize_gmail_hub(
            &dir.path().join("missing-credentials.json"),
            &dir.path().join("token.json"),
            Mode::Preview,
        )
        .await;

        assert!(matches!(result, Err(GmailError::AuthError(_))));
    }

    #[test]
    #[serial]
    fn test_load_credentials_from_env() {
        env::set_var("GMAIL_CLIENT_ID", "test-id");
        env::set_var("GMAIL_CLIENT_SECRET", "test-secret");
        env::set_var("GMAIL_REDIRECT_URI", "http://localhost:9999");

        let secret = load_credentials_from_env().unwrap();
        assert_eq!(secret.client_id, "test-id");
        assert_eq!(secret.client_secret, "test-secret");
        assert_eq!(secret.redirect_uris[0], "http://localhost:9999");

        env::remove_var("GMAIL_CLIENT_ID");
        env::remove_var("GMAIL_CLIENT_SECRET");
        env::remove_var("GMAIL_REDIRECT_URI");
    }

    #[test]
    #[serial]
    fn test_load_credentials_from_env_missing_id() {
        env::remove_var("GMAIL_CLIENT_ID");
        env::set_var("GMAIL_CLIENT_SECRET", "test-secret");

        let err = load_credentials_from_env().unwrap_err();
        assert!(err.to_string().contains("GMAIL_CLIENT_ID not set"));

        env::remove_var("GMAIL_CLIENT_SECRET");
    }
}
