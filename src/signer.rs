//! HMAC-SHA-256 URL signatures with optional expiry.
//!
//! A signed URL carries `sig=<base64url(mac)>` where the MAC covers
//! `scheme://host/path?query` with the query parameters sorted. Signatures
//! issued with a TTL also carry `exp=<unix seconds>`; a signature without
//! `exp` never expires.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_QUERY_PARAM: &str = "sig";
pub const EXPIRES_QUERY_PARAM: &str = "exp";

#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    /// Returns `url` with its query canonicalized and a `sig` parameter added.
    #[must_use]
    pub fn sign_url(&self, url: &Url) -> Url {
        let mut signed = canonicalize(url);
        let signature = URL_SAFE.encode(self.compute_mac(signed.as_str()));

        let mut pairs = sorted_pairs(&signed);
        pairs.push((SIGNATURE_QUERY_PARAM.to_string(), signature));
        pairs.sort();
        set_pairs(&mut signed, &pairs);
        signed
    }

    /// Signs `url` so that it stops verifying once `ttl` has elapsed.
    /// Returns `None` when the expiry is past the representable range.
    #[must_use]
    pub fn sign_url_with_ttl(&self, url: &Url, ttl: Duration) -> Option<(Url, DateTime<Utc>)> {
        let expires_at = Utc::now().checked_add_signed(ttl)?;
        Some((self.sign_url_with_expiry(url, expires_at), expires_at))
    }

    #[must_use]
    pub fn sign_url_with_expiry(&self, url: &Url, expires_at: DateTime<Utc>) -> Url {
        let mut with_exp = url.clone();
        let mut pairs: Vec<_> = sorted_pairs(url)
            .into_iter()
            .filter(|(k, _)| k != EXPIRES_QUERY_PARAM)
            .collect();
        pairs.push((
            EXPIRES_QUERY_PARAM.to_string(),
            expires_at.timestamp().to_string(),
        ));
        set_pairs(&mut with_exp, &pairs);
        self.sign_url(&with_exp)
    }

    /// Checks the `sig` parameter against the rest of the URL. Never fails
    /// loudly: a missing or malformed signature is simply invalid.
    #[must_use]
    pub fn verify_url(&self, url: &Url) -> bool {
        let Some(sig) = url
            .query_pairs()
            .find(|(k, _)| k == SIGNATURE_QUERY_PARAM)
            .map(|(_, v)| v.into_owned())
        else {
            return false;
        };

        let Ok(got) = URL_SAFE.decode(sig.as_bytes()) else {
            return false;
        };

        let mut unsigned = url.clone();
        let pairs: Vec<_> = sorted_pairs(url)
            .into_iter()
            .filter(|(k, _)| k != SIGNATURE_QUERY_PARAM)
            .collect();
        set_pairs(&mut unsigned, &pairs);
        unsigned.set_fragment(None);

        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return false;
        };
        mac.update(unsigned.as_str().as_bytes());
        mac.verify_slice(&got).is_ok()
    }

    /// Verifies the signature and, when `exp` is present, that it has not
    /// passed.
    #[must_use]
    pub fn verify_url_and_not_expired(&self, url: &Url) -> bool {
        if !self.verify_url(url) {
            return false;
        }

        match url.query_pairs().find(|(k, _)| k == EXPIRES_QUERY_PARAM) {
            None => true,
            Some((_, exp)) => match exp.parse::<i64>() {
                Ok(exp) => Utc::now().timestamp() <= exp,
                Err(_) => false,
            },
        }
    }

    fn compute_mac(&self, data: &str) -> Vec<u8> {
        // HMAC accepts keys of any length
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return Vec::new();
        };
        mac.update(data.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

/// Reads the expiry carried by a signed URL, if any.
#[must_use]
pub fn expires_at(url: &Url) -> Option<DateTime<Utc>> {
    url.query_pairs()
        .find(|(k, _)| k == EXPIRES_QUERY_PARAM)
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
}

fn canonicalize(url: &Url) -> Url {
    let mut canonical = url.clone();
    let pairs = sorted_pairs(url);
    set_pairs(&mut canonical, &pairs);
    canonical.set_fragment(None);
    canonical
}

fn sorted_pairs(url: &Url) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();
    pairs
}

fn set_pairs(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }

    let mut sorted = pairs.to_vec();
    sorted.sort();
    url.query_pairs_mut().clear().extend_pairs(sorted);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> Signer {
        Signer::new("hmac-and-cheese")
    }

    fn file_url() -> Url {
        Url::parse("https://snips.sh/f/abc123").unwrap()
    }

    fn sig_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(k, _)| k == SIGNATURE_QUERY_PARAM)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let signed = signer().sign_url(&file_url());
        assert!(signed.query().unwrap().contains("sig="));
        assert!(signer().verify_url(&signed));
        assert!(signer().verify_url_and_not_expired(&signed));
    }

    #[test]
    fn test_missing_signature() {
        assert!(!signer().verify_url(&file_url()));
    }

    #[test]
    fn test_malformed_signature() {
        let url = Url::parse("https://snips.sh/f/abc123?sig=%%%not-base64").unwrap();
        assert!(!signer().verify_url(&url));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signed = signer().sign_url(&file_url());
        assert!(!Signer::new("another-key").verify_url(&signed));
    }

    #[test]
    fn test_tampered_path_rejected() {
        let signed = signer().sign_url(&file_url());
        let mut tampered = signed.clone();
        tampered.set_path("/f/other");
        assert!(!signer().verify_url(&tampered));
    }

    #[test]
    fn test_query_order_does_not_matter() {
        let a = Url::parse("https://snips.sh/f/abc123?b=2&a=1").unwrap();
        let b = Url::parse("https://snips.sh/f/abc123?a=1&b=2").unwrap();
        assert_eq!(sig_of(&signer().sign_url(&a)), sig_of(&signer().sign_url(&b)));
    }

    #[test]
    fn test_verify_accepts_reordered_params() {
        let signed = signer().sign_url(&Url::parse("https://snips.sh/f/x?r=1").unwrap());
        let sig = sig_of(&signed);
        let reordered =
            Url::parse(&format!("https://snips.sh/f/x?sig={}&r=1", urlencode(&sig))).unwrap();
        assert!(signer().verify_url(&reordered));
    }

    #[test]
    fn test_ttl_in_future_verifies() {
        let (signed, expires) = signer()
            .sign_url_with_ttl(&file_url(), Duration::hours(1))
            .unwrap();
        assert!(expires > Utc::now());
        assert!(signed.query().unwrap().contains("exp="));
        assert!(signer().verify_url_and_not_expired(&signed));
        assert_eq!(expires_at(&signed).unwrap().timestamp(), expires.timestamp());
    }

    #[test]
    fn test_ttl_in_past_rejected() {
        let signed =
            signer().sign_url_with_expiry(&file_url(), Utc::now() - Duration::seconds(10));
        assert!(signer().verify_url(&signed));
        assert!(!signer().verify_url_and_not_expired(&signed));
    }

    #[test]
    fn test_extended_expiry_rejected() {
        let signed =
            signer().sign_url_with_expiry(&file_url(), Utc::now() - Duration::seconds(10));
        let mut forged = signed.clone();
        let later = (Utc::now() + Duration::hours(1)).timestamp().to_string();
        let pairs: Vec<(String, String)> = signed
            .query_pairs()
            .map(|(k, v)| {
                if k == EXPIRES_QUERY_PARAM {
                    (k.into_owned(), later.clone())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        forged.query_pairs_mut().clear().extend_pairs(pairs);
        assert!(!signer().verify_url_and_not_expired(&forged));
    }

    #[test]
    fn test_ttl_out_of_range() {
        let ttl = Duration::days(365 * 300_000);
        assert!(signer().sign_url_with_ttl(&file_url(), ttl).is_none());
    }

    fn urlencode(s: &str) -> String {
        url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
    }
}
