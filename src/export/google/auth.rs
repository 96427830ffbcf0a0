//! Installed-app OAuth: a silent check against stored tokens, and an explicit
//! consent flow through the browser with a loopback redirect.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use google_calendar::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use super::api::Credentials;
use super::session::Session;
use super::types::TokenGrant;
use super::{AccessToken, AuthError, AuthStatus, SCOPES};
use crate::config::GoogleConfig;
use crate::export::Authorizer;

/// How long to wait for the user to finish the consent screen.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct GoogleAuth {
    credentials: Option<Credentials>,
    session_path: PathBuf,
    redirect_port: u16,
    config_hint: String,
}

impl GoogleAuth {
    /// `config_hint` names the config file in the missing-credentials error.
    pub fn new(config: &GoogleConfig, session_path: PathBuf, config_hint: String) -> Self {
        Self {
            credentials: Credentials::from_config(config),
            session_path,
            redirect_port: config.redirect_port,
            config_hint,
        }
    }

    fn credentials(&self) -> Result<&Credentials, AuthError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| AuthError::MissingCredentials(self.config_hint.clone()))
    }

    fn redirect_address(&self) -> String {
        format!("127.0.0.1:{}", self.redirect_port)
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let creds = self.credentials()?;
        let refresh_token = session
            .refresh_token()
            .ok_or_else(|| AuthError::Token("no refresh token stored".to_string()))?;

        let granted = creds
            .client(session.access_token().secret(), refresh_token)
            .refresh_access_token()
            .await
            .map_err(|e| AuthError::Token(e.to_string()))?;
        let grant = TokenGrant::new(granted.access_token, granted.refresh_token, granted.expires_in);
        Ok(Session::from_grant(grant, Some(refresh_token)))
    }

    fn store(&self, session: &Session) -> Result<(), AuthError> {
        session
            .save(&self.session_path)
            .map_err(|e| AuthError::Session(format!("{}: {e}", self.session_path.display())))
    }

    /// A token from the stored session, refreshed if it expired. `None` when
    /// there is nothing usable on disk.
    async fn stored_token(&self) -> Result<Option<AccessToken>, AuthError> {
        let Some(session) = Session::load(&self.session_path)? else {
            return Ok(None);
        };

        if !session.is_expired() {
            return Ok(Some(session.access_token()));
        }

        log::info!("stored Google token expired, refreshing");
        let refreshed = self.refresh(&session).await?;
        self.store(&refreshed)?;
        Ok(Some(refreshed.access_token()))
    }

    async fn consent(&self) -> Result<AccessToken, AuthError> {
        let mut client = self.credentials()?.auth_client();
        let (url, state) = consent_url(&client)?;

        // Bind before opening the browser so the redirect can't race us.
        let listener = TcpListener::bind(self.redirect_address()).await?;

        log::info!("opening consent screen: {url}");
        if let Err(e) = open::that(url.as_str()) {
            log::warn!("could not open browser ({e}); visit {url}");
        }

        let code = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_callback(&listener, &state))
            .await
            .map_err(|_| AuthError::Denied("timed out waiting for consent".to_string()))??;

        let granted = client
            .get_access_token(&code, &state)
            .await
            .map_err(|e| AuthError::Token(e.to_string()))?;
        let grant = TokenGrant::new(granted.access_token, granted.refresh_token, granted.expires_in);
        let session = Session::from_grant(grant, None);
        self.store(&session)?;
        Ok(session.access_token())
    }
}

/// The consent screen URL, and the `state` it carries for the callback to echo.
pub fn consent_url(client: &Client) -> Result<(Url, String), AuthError> {
    let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let url = Url::parse(&client.user_consent_url(&scopes))
        .map_err(|e| AuthError::Token(format!("bad consent URL: {e}")))?;
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::Token("consent URL carries no state".to_string()))?;
    Ok((url, state))
}

#[async_trait]
impl Authorizer for GoogleAuth {
    async fn check_silent(&self) -> AuthStatus {
        match self.stored_token().await {
            Ok(Some(_)) => AuthStatus::Authorized,
            Ok(None) => AuthStatus::Unauthorized,
            Err(e) => {
                log::warn!("silent Google authorization check failed: {e}");
                AuthStatus::Unauthorized
            }
        }
    }

    async fn authorize(&self) -> Result<AccessToken, AuthError> {
        match self.stored_token().await {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => {}
            Err(e) => log::warn!("stored Google session unusable, asking for consent: {e}"),
        }
        self.consent().await
    }
}

const PAGE_OK: &str = "<html><body><h1>Authorization complete</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";
const PAGE_DENIED: &str = "<html><body><h1>Authorization denied</h1>\
    <p>Return to the terminal to try again.</p></body></html>";

/// Accept loopback requests until the OAuth redirect arrives, and return the
/// authorization code it carries.
pub async fn wait_for_callback(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    loop {
        let (stream, _) = listener.accept().await?;
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        // Browsers open spare connections that close without a request.
        match reader.read_line(&mut request_line).await {
            Ok(0) => continue,
            Ok(_) => {}
            Err(e) => {
                log::debug!("dropping loopback connection: {e}");
                continue;
            }
        }

        // Drain the headers so closing the socket doesn't reset the connection.
        let mut header = String::new();
        while matches!(reader.read_line(&mut header).await, Ok(n) if n > 2) {
            header.clear();
        }

        let Some(url) = request_line
            .split_whitespace()
            .nth(1)
            .and_then(|target| Url::parse(&format!("http://localhost{target}")).ok())
        else {
            log::debug!("ignoring loopback request {:?}", request_line.trim());
            continue;
        };

        let mut stream = reader.into_inner();

        // Browsers like to ask for /favicon.ico as well.
        if url.path() != "/callback" {
            respond(&mut stream, "404 Not Found", "").await?;
            continue;
        }

        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(error) = param("error") {
            respond(&mut stream, "200 OK", PAGE_DENIED).await?;
            return Err(AuthError::Denied(error));
        }

        if param("state").as_deref() != Some(expected_state) {
            respond(&mut stream, "400 Bad Request", PAGE_DENIED).await?;
            return Err(AuthError::StateMismatch);
        }

        let code = param("code").ok_or_else(|| AuthError::BadCallback("no code".to_string()))?;
        respond(&mut stream, "200 OK", PAGE_OK).await?;
        return Ok(code);
    }
}

async fn respond(stream: &mut tokio::net::TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    use super::*;

    fn config() -> GoogleConfig {
        GoogleConfig {
            client_id: Some("client.apps.googleusercontent.com".to_string()),
            client_secret: Some("shh".to_string()),
            redirect_port: 8085,
        }
    }

    fn save_session(path: &std::path::Path, access: &str, refresh: Option<&str>, expires_in: i64) {
        Session::from_grant(
            TokenGrant {
                access_token: access.to_string(),
                refresh_token: refresh.map(str::to_string),
                expires_in,
            },
            None,
        )
        .save(path)
        .unwrap();
    }

    async fn send(addr: std::net::SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
            .await
            .unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[test]
    fn consent_url_carries_scope_and_state() {
        let client = Credentials::from_config(&config()).unwrap().auth_client();

        let (url, state) = consent_url(&client).unwrap();
        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        assert!(!state.is_empty());
        assert_eq!(param("state").as_deref(), Some(state.as_str()));
        assert_eq!(param("client_id").as_deref(), Some("client.apps.googleusercontent.com"));
        assert_eq!(param("redirect_uri").as_deref(), Some("http://localhost:8085/callback"));
        assert!(param("scope").unwrap().contains("https://www.googleapis.com/auth/calendar"));
    }

    #[tokio::test]
    async fn missing_credentials_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::new(
            &GoogleConfig::default(),
            dir.path().join("s.toml"),
            "/etc/schedule-tui.toml".into(),
        );
        let err = auth.authorize().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials(p) if p == "/etc/schedule-tui.toml"));
    }

    #[tokio::test]
    async fn callback_returns_code_and_skips_other_paths() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let favicon = send(addr, "/favicon.ico").await;
            let page = send(addr, "/callback?state=abc&code=4%2F0Adeu").await;
            (favicon, page)
        });

        let code = wait_for_callback(&listener, "abc").await.unwrap();
        let (favicon, page) = client.await.unwrap();

        assert_eq!(code, "4/0Adeu");
        assert!(favicon.starts_with("HTTP/1.1 404"));
        assert!(page.contains("Authorization complete"));
    }

    #[tokio::test]
    async fn callback_survives_connections_without_a_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            // Connect and hang up without sending anything.
            drop(TcpStream::connect(addr).await.unwrap());

            let mut garbage = TcpStream::connect(addr).await.unwrap();
            garbage.write_all(b"\r\n\r\n").await.unwrap();
            drop(garbage);

            send(addr, "/callback?state=abc&code=c").await
        });

        let code = wait_for_callback(&listener, "abc").await.unwrap();
        let page = client.await.unwrap();

        assert_eq!(code, "c");
        assert!(page.contains("Authorization complete"));
    }

    #[tokio::test]
    async fn callback_error_is_a_denial() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { send(addr, "/callback?error=access_denied&state=abc").await });

        let err = wait_for_callback(&listener, "abc").await.unwrap_err();
        client.await.unwrap();

        assert!(matches!(err, AuthError::Denied(reason) if reason == "access_denied"));
    }

    #[tokio::test]
    async fn callback_with_wrong_state_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { send(addr, "/callback?state=evil&code=c").await });

        let err = wait_for_callback(&listener, "abc").await.unwrap_err();
        client.await.unwrap();

        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[tokio::test]
    async fn silent_check_without_session_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::new(&config(), dir.path().join("none.toml"), "c".into());
        assert_eq!(auth.check_silent().await, AuthStatus::Unauthorized);
    }

    #[tokio::test]
    async fn expired_session_without_refresh_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let session_path = dir.path().join("session.toml");
        save_session(&session_path, "stale", None, 0);

        let auth = GoogleAuth::new(&config(), session_path.clone(), "c".into());
        assert_eq!(auth.check_silent().await, AuthStatus::Unauthorized);

        // Left alone for the next consent to replace.
        let stored = Session::load(&session_path).unwrap().unwrap();
        assert_eq!(stored.access_token().secret(), "stale");
    }

    #[tokio::test]
    async fn authorize_reuses_valid_session() {
        let dir = tempfile::tempdir().unwrap();
        let session_path = dir.path().join("session.toml");
        save_session(&session_path, "live", Some("r"), 3600);

        let auth = GoogleAuth::new(&config(), session_path, "c".into());
        assert_eq!(auth.authorize().await.unwrap().secret(), "live");
    }
}
