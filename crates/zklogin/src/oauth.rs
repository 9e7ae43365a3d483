use crate::error::Result;
use url::{Host, Url};

pub const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const OAUTH_SCOPES: &str = "openid email profile";
pub const ID_TOKEN_PARAM: &str = "id_token";

/// OAuth client registration for the implicit id_token flow.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Redirect used while running against a local development host
    pub redirect_uri_local: String,
    pub redirect_uri: String,
}

impl OAuthConfig {
    pub fn redirect_uri_for(&self, origin: &Url) -> &str {
        if is_local_origin(origin) {
            &self.redirect_uri_local
        } else {
            &self.redirect_uri
        }
    }

    /// Provider URL the user is sent to, with the zkLogin nonce embedded.
    pub fn authorization_url(&self, origin: &Url, nonce: &str) -> Result<Url> {
        let url = Url::parse_with_params(
            GOOGLE_AUTH_ENDPOINT,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", ID_TOKEN_PARAM),
                ("redirect_uri", self.redirect_uri_for(origin)),
                ("scope", OAUTH_SCOPES),
                ("nonce", nonce),
            ],
        )?;
        Ok(url)
    }
}

pub fn is_local_origin(origin: &Url) -> bool {
    match origin.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Pull the identity token out of a redirect, looking at the query string
/// first and then the fragment. Accepts a bare `#...` or `?...` remainder too.
pub fn extract_id_token(redirect: &str) -> Option<String> {
    match Url::parse(redirect.trim()) {
        Ok(url) => find_id_token(url.query_pairs()).or_else(|| {
            url.fragment()
                .and_then(|fragment| find_id_token(url::form_urlencoded::parse(fragment.as_bytes())))
        }),
        Err(_) => {
            let rest = redirect.trim().trim_start_matches(['#', '?']);
            find_id_token(url::form_urlencoded::parse(rest.as_bytes()))
        }
    }
}

fn find_id_token(mut pairs: url::form_urlencoded::Parse<'_>) -> Option<String> {
    pairs
        .find(|(k, _)| k == ID_TOKEN_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".to_string(),
            redirect_uri_local: "http://localhost:3000/callback".to_string(),
            redirect_uri: "https://wallet.example.com/callback".to_string(),
        }
    }

    #[test]
    fn test_authorization_url_params() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        let url = config().authorization_url(&origin, "nonce-xyz").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(url.as_str().starts_with(GOOGLE_AUTH_ENDPOINT));
        assert!(pairs.contains(&("client_id".into(), "client-123".into())));
        assert!(pairs.contains(&("response_type".into(), "id_token".into())));
        assert!(pairs.contains(&("scope".into(), "openid email profile".into())));
        assert!(pairs.contains(&("nonce".into(), "nonce-xyz".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "http://localhost:3000/callback".into())));
    }

    #[test]
    fn test_redirect_selection() {
        let cfg = config();
        for local in ["http://localhost:5173", "http://127.0.0.1:3000", "http://[::1]:3000"] {
            let origin = Url::parse(local).unwrap();
            assert_eq!(cfg.redirect_uri_for(&origin), cfg.redirect_uri_local);
        }
        let origin = Url::parse("https://wallet.example.com").unwrap();
        assert_eq!(cfg.redirect_uri_for(&origin), cfg.redirect_uri);
    }

    #[test]
    fn test_extract_from_query_and_fragment() {
        assert_eq!(
            extract_id_token("http://localhost:3000/callback?id_token=aaa.bbb.ccc&state=1").as_deref(),
            Some("aaa.bbb.ccc")
        );
        assert_eq!(
            extract_id_token("https://wallet.example.com/callback#state=1&id_token=x.y.z").as_deref(),
            Some("x.y.z")
        );
        assert_eq!(extract_id_token("#id_token=f.g.h").as_deref(), Some("f.g.h"));
        assert_eq!(extract_id_token("http://localhost:3000/callback?code=1"), None);
        assert_eq!(extract_id_token("http://localhost:3000/callback#id_token="), None);
    }
}
