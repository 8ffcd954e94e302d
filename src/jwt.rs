//! JWT codec for identity-provider tokens.
//!
//! Splits and decodes the three-segment token structure. Cryptographic
//! signature verification is delegated to the identity provider's published
//! keys and is not performed here.

use crate::error::Error;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtHeader {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtClaims {
    pub iss: String,
    pub aud: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// A token broken into its decoded parts plus the raw segments as received.
#[derive(Debug, Clone)]
pub struct DecodedJwt {
    pub header: JwtHeader,
    pub claims: JwtClaims,
    pub raw_segments: [String; 3],
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)
        .map_err(|err| Error::MalformedToken(format!("claims encode: {err}")))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(segment: &str, what: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(segment)
        .map_err(|_| Error::MalformedToken(format!("{what} segment is not valid base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| Error::MalformedToken(format!("{what} segment is not valid json: {err}")))
}

/// Returns true when the token has exactly three dot-separated segments.
#[must_use]
pub fn is_well_formed(token: &str) -> bool {
    token.split('.').count() == 3
}

/// Decode a token into header and claims without verifying its signature.
///
/// # Errors
///
/// Returns [`Error::MalformedToken`] when the segment count is not three or
/// when the header/payload segments are not base64url-encoded JSON.
pub fn decode(token: &str) -> Result<DecodedJwt, Error> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header_b64, claims_b64, signature_b64] = segments.as_slice() else {
        return Err(Error::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let header: JwtHeader = b64d_json(header_b64, "header")?;
    let claims: JwtClaims = b64d_json(claims_b64, "payload")?;

    Ok(DecodedJwt {
        header,
        claims,
        raw_segments: [
            (*header_b64).to_string(),
            (*claims_b64).to_string(),
            (*signature_b64).to_string(),
        ],
    })
}

/// Decode a token and return its `sub` claim.
///
/// # Errors
///
/// Returns [`Error::MalformedToken`] for undecodable tokens and
/// [`Error::MissingClaim`] when the payload has no `sub`.
pub fn extract_subject(token: &str) -> Result<String, Error> {
    let decoded = decode(token)?;
    decoded.claims.sub.ok_or(Error::MissingClaim("sub"))
}

/// Build a three-segment token with an empty signature segment.
///
/// Used by tests and the demo flow, which exercise the pipeline without an
/// identity provider on the other end.
///
/// # Errors
///
/// Returns [`Error::MalformedToken`] when the header or claims cannot be
/// encoded as JSON.
pub fn encode_unsigned(header: &JwtHeader, claims: &JwtClaims) -> Result<String, Error> {
    let header_b64 = b64e_json(header)?;
    let claims_b64 = b64e_json(claims)?;
    let signature_b64 = Base64UrlUnpadded::encode_string(b"unsigned");
    Ok(format!("{header_b64}.{claims_b64}.{signature_b64}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_header() -> JwtHeader {
        JwtHeader {
            alg: "RS256".to_string(),
            typ: Some("JWT".to_string()),
            kid: Some("k1".to_string()),
        }
    }

    pub(crate) fn test_claims(sub: &str, nonce: &str) -> JwtClaims {
        JwtClaims {
            iss: "https://accounts.google.com".to_string(),
            aud: "client-123.apps.googleusercontent.com".to_string(),
            sub: Some(sub.to_string()),
            exp: 1_700_000_120,
            iat: 1_700_000_000,
            nonce: Some(nonce.to_string()),
            email: None,
            name: None,
            picture: None,
        }
    }

    #[test]
    fn well_formed_counts_segments() {
        assert!(is_well_formed("a.b.c"));
        assert!(!is_well_formed("a"));
        assert!(!is_well_formed("a.b"));
        assert!(!is_well_formed("a.b.c.d"));
    }

    #[test]
    fn decode_round_trips_claims() -> Result<(), Error> {
        let token = encode_unsigned(&test_header(), &test_claims("user123", "nonce-1"))?;
        let decoded = decode(&token)?;
        assert_eq!(decoded.header.alg, "RS256");
        assert_eq!(decoded.claims.sub.as_deref(), Some("user123"));
        assert_eq!(decoded.claims.nonce.as_deref(), Some("nonce-1"));
        assert_eq!(decoded.raw_segments.len(), 3);
        Ok(())
    }

    #[test]
    fn decode_rejects_wrong_segment_count() {
        let result = decode("only.two");
        assert!(matches!(result, Err(Error::MalformedToken(_))));
        if let Err(Error::MalformedToken(msg)) = result {
            assert!(msg.contains("found 2"));
        }
    }

    #[test]
    fn decode_rejects_non_json_payload() {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256"}"#);
        let payload = Base64UrlUnpadded::encode_string(b"not json");
        let token = format!("{header}.{payload}.sig");
        assert!(matches!(decode(&token), Err(Error::MalformedToken(_))));
    }

    #[test]
    fn extract_subject_requires_sub() -> Result<(), Error> {
        let mut claims = test_claims("user123", "n");
        claims.sub = None;
        let token = encode_unsigned(&test_header(), &claims)?;
        assert!(matches!(
            extract_subject(&token),
            Err(Error::MissingClaim("sub"))
        ));

        let token = encode_unsigned(&test_header(), &test_claims("user123", "n"))?;
        assert_eq!(extract_subject(&token)?, "user123");
        Ok(())
    }
}
