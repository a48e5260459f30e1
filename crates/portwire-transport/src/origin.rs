use url::Url;

use crate::error::{Result, TransportError};

/// ASCII serialization of the origin of `url`.
///
/// Opaque origins (`data:`, `file:` and the like) serialize as `"null"`.
pub fn origin_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|err| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    Ok(parsed.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_and_default_port() {
        assert_eq!(
            origin_of("https://pay.example:443/offers?x=1#frag").unwrap(),
            "https://pay.example"
        );
        assert_eq!(
            origin_of("http://localhost:8080/a").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn opaque_origin_is_null() {
        assert_eq!(origin_of("data:text/html,hi").unwrap(), "null");
    }

    #[test]
    fn relative_url_is_rejected() {
        assert!(matches!(
            origin_of("/offers"),
            Err(TransportError::InvalidUrl { .. })
        ));
    }
}
