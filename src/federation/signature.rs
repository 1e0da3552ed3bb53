//! HTTP Signatures for outbound ActivityPub delivery
//!
//! Signs requests per the scheme Mastodon documents:
//! https://docs.joinmastodon.org/spec/security/

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rsa::RsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Headers to add to a signed request
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    /// Signature header value
    pub signature: String,
    /// Date header value (RFC 2616)
    pub date: String,
    /// Digest header value (if body present)
    pub digest: Option<String>,
}

/// Parse a PKCS#8 PEM private key.
///
/// Done once per outbox item so a bad key fails the item before any
/// recipient sees a partial delivery.
pub fn parse_private_key(private_key_pem: &str) -> Result<RsaPrivateKey, AppError> {
    RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| AppError::Signing(format!("Invalid private key: {}", e)))
}

/// Sign an HTTP request with an already-parsed key
///
/// # Arguments
/// * `private_key` - RSA private key
/// * `method` - HTTP method (e.g., "POST")
/// * `url` - Full URL being requested
/// * `body` - Request body (for digest)
/// * `key_id` - Full URL to the public key (actor#main-key)
///
/// # Returns
/// Headers to add: Signature, Date, Digest (if body present)
pub fn sign_request_with_key(
    private_key: &RsaPrivateKey,
    method: &str,
    url: &str,
    body: Option<&[u8]>,
    key_id: &str,
) -> Result<SignatureHeaders, AppError> {
    // 1. Parse URL to get host and path
    let parsed_url =
        url::Url::parse(url).map_err(|e| AppError::Signing(format!("Invalid URL: {}", e)))?;

    let host = parsed_url
        .host_str()
        .ok_or_else(|| AppError::Signing("Missing host in URL".to_string()))?;

    let path = parsed_url.path();
    let query = parsed_url.query();
    let path_and_query = if let Some(q) = query {
        format!("{}?{}", path, q)
    } else {
        path.to_string()
    };

    // 2. Generate Date header (RFC 2822 format)
    let date = chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    // 3. Generate Digest if body present
    let digest = body.map(generate_digest);

    // 4. Build signing string
    let request_target = format!("{} {}", method.to_lowercase(), path_and_query);

    let mut signing_parts = vec![
        format!("(request-target): {}", request_target),
        format!("host: {}", host),
        format!("date: {}", date),
    ];

    let mut headers_list = vec!["(request-target)", "host", "date"];

    if let Some(ref digest_value) = digest {
        signing_parts.push(format!("digest: {}", digest_value));
        headers_list.push("digest");
    }

    let signing_string = signing_parts.join("\n");

    // 5. Sign with RSA-SHA256
    use rsa::signature::{RandomizedSigner, SignatureEncoding};

    let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new_unprefixed(private_key.clone());
    let mut rng = rand::thread_rng();
    let signature = signing_key.sign_with_rng(&mut rng, signing_string.as_bytes());
    let signature_b64 = BASE64.encode(signature.to_bytes());

    // 6. Build Signature header
    let signature_header = format!(
        "keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
        key_id,
        headers_list.join(" "),
        signature_b64
    );

    Ok(SignatureHeaders {
        signature: signature_header,
        date,
        digest,
    })
}

/// Sign an HTTP request from a PEM-encoded key.
pub fn sign_request(
    method: &str,
    url: &str,
    body: Option<&[u8]>,
    private_key_pem: &str,
    key_id: &str,
) -> Result<SignatureHeaders, AppError> {
    let private_key = parse_private_key(private_key_pem)?;
    sign_request_with_key(&private_key, method, url, body, key_id)
}

/// Generate SHA-256 digest for body
///
/// # Returns
/// `SHA-256=base64(hash)`
pub fn generate_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let hash = hasher.finalize();
    format!("SHA-256={}", BASE64.encode(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPublicKey;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use rsa::signature::Verifier;

    fn generate_test_keypair() -> (String, RsaPublicKey) {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).expect("key generation should work");
        let public_key = RsaPublicKey::from(&private_key);

        let private_key_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("private key pem")
            .to_string();

        (private_key_pem, public_key)
    }

    /// Reconstruct the signing string the remote side would verify.
    fn reconstruct_signing_string(
        method: &str,
        url: &str,
        headers: &SignatureHeaders,
    ) -> String {
        let parsed = url::Url::parse(url).expect("valid test url");
        let host = parsed.host_str().expect("host");
        let path_and_query = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };

        let mut parts = vec![
            format!("(request-target): {} {}", method.to_lowercase(), path_and_query),
            format!("host: {}", host),
            format!("date: {}", headers.date),
        ];
        if let Some(ref digest) = headers.digest {
            parts.push(format!("digest: {}", digest));
        }
        parts.join("\n")
    }

    fn extract_signature_b64(signature_header: &str) -> String {
        signature_header
            .split("signature=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .expect("signature parameter")
            .to_string()
    }

    #[test]
    fn signed_request_verifies_against_public_key() {
        let (private_key_pem, public_key) = generate_test_keypair();
        let body = br#"{"type":"Create"}"#;
        let url = "https://remote.example/inbox?foo=bar";

        let headers = sign_request(
            "POST",
            url,
            Some(body),
            &private_key_pem,
            "https://blog.example/users/alice#main-key",
        )
        .expect("signing should succeed");

        let signing_string = reconstruct_signing_string("POST", url, &headers);
        let signature_bytes = BASE64
            .decode(extract_signature_b64(&headers.signature))
            .expect("decodable signature");

        let verifier = rsa::pkcs1v15::VerifyingKey::<Sha256>::new_unprefixed(public_key);
        let signature =
            rsa::pkcs1v15::Signature::try_from(signature_bytes.as_slice()).expect("signature");
        verifier
            .verify(signing_string.as_bytes(), &signature)
            .expect("signature should verify");
    }

    #[test]
    fn signature_header_names_key_and_signed_headers() {
        let (private_key_pem, _) = generate_test_keypair();
        let headers = sign_request(
            "POST",
            "https://remote.example/inbox",
            Some(b"{}"),
            &private_key_pem,
            "https://blog.example/users/alice#main-key",
        )
        .unwrap();

        assert!(headers.signature.contains(
            "keyId=\"https://blog.example/users/alice#main-key\""
        ));
        assert!(headers.signature.contains("algorithm=\"rsa-sha256\""));
        assert!(
            headers
                .signature
                .contains("headers=\"(request-target) host date digest\"")
        );
        assert!(headers.digest.is_some());
    }

    #[test]
    fn bodyless_request_omits_digest() {
        let (private_key_pem, _) = generate_test_keypair();
        let headers = sign_request(
            "GET",
            "https://remote.example/users/bob",
            None,
            &private_key_pem,
            "https://blog.example/users/alice#main-key",
        )
        .unwrap();

        assert!(headers.digest.is_none());
        assert!(
            headers
                .signature
                .contains("headers=\"(request-target) host date\"")
        );
    }

    #[test]
    fn generate_digest_matches_known_value() {
        // SHA-256 of the empty string
        assert_eq!(
            generate_digest(b""),
            "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn invalid_private_key_is_a_signing_error() {
        let result = parse_private_key("not a pem");
        assert!(matches!(result, Err(AppError::Signing(_))));
    }
}
