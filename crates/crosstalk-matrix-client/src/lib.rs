mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod urls;

pub use client::MatrixHttpClient;
pub use config::MatrixClientConfig;
pub use error::{MatrixClientError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_validated_and_trimmed() {
        assert!(urls::validated_base("ftp://x").is_err());
        assert!(urls::validated_base("http://").is_err());
        assert_eq!(
            urls::validated_base("https://hs.example.com/").expect("valid"),
            "https://hs.example.com"
        );
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(
            urls::resolve_alias("https://hs.example.com", "#alice|bob:srv"),
            "https://hs.example.com/_matrix/client/v3/directory/room/%23alice%7Cbob%3Asrv"
        );
    }

    #[test]
    fn client_rejects_blank_credentials() {
        let cfg = MatrixClientConfig::default();
        assert!(MatrixHttpClient::new("https://hs.example.com", " ", cfg).is_err());
    }

    #[test]
    fn media_url_translates_mxc_references() {
        let client = MatrixHttpClient::new(
            "https://hs.example.com",
            "token",
            MatrixClientConfig::default(),
        )
        .expect("client");
        assert_eq!(
            client.media_url("mxc://srv/abc").as_deref(),
            Some("https://hs.example.com/_matrix/media/v3/download/srv/abc")
        );
        assert_eq!(client.media_url("https://elsewhere/abc"), None);
        assert_eq!(client.media_url("mxc://srv"), None);
    }
}
