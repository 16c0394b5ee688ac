//! Signing key tests (Ed25519 over SHA-256 digests)

use cardgate::crypto::SigningKeys;

#[test]
fn test_sign_then_verify() {
    let keys = SigningKeys::from_bytes([8u8; 32]);
    let signature = keys.sign(b"rs-and-x");
    assert!(keys.verify(b"rs-and-x", &signature));
}

#[test]
fn test_verify_rejects_modified_data() {
    let keys = SigningKeys::from_bytes([8u8; 32]);
    let signature = keys.sign(b"rs-and-x");
    assert!(!keys.verify(b"rs-and-y", &signature));
}

#[test]
fn test_verify_rejects_other_key() {
    let keys = SigningKeys::from_bytes([8u8; 32]);
    let other = SigningKeys::from_bytes([9u8; 32]);
    let signature = other.sign(b"payload");
    assert!(!keys.verify(b"payload", &signature));
}

#[test]
fn test_verify_rejects_garbage_signature() {
    let keys = SigningKeys::from_bytes([8u8; 32]);
    assert!(!keys.verify(b"payload", "%%%"));
    assert!(!keys.verify(b"payload", "AAAA"));
    assert!(!keys.verify(b"payload", ""));
}

#[test]
fn test_requests_verified_with_server_key_by_default() {
    let keys = SigningKeys::from_bytes([8u8; 32]);
    let signature = keys.sign(b"ts-and-data");
    assert!(keys.verify_request(b"ts-and-data", &signature));
}

#[test]
fn test_client_key_replaces_request_key() {
    let (client_secret, client_public) = SigningKeys::generate_keypair();
    let client = SigningKeys::from_base64(&client_secret).unwrap();
    let server = SigningKeys::from_bytes([8u8; 32])
        .with_client_key(&client_public)
        .unwrap();

    let from_client = client.sign(b"ts-and-data");
    let from_server = server.sign(b"ts-and-data");

    assert!(server.verify_request(b"ts-and-data", &from_client));
    assert!(
        !server.verify_request(b"ts-and-data", &from_server),
        "with a client key configured, the server key no longer signs requests"
    );
    assert!(server.verify(b"ts-and-data", &from_server));
}

#[test]
fn test_invalid_client_key_rejected() {
    let result = SigningKeys::from_bytes([8u8; 32]).with_client_key("dG9vIHNob3J0");
    assert!(result.is_err());
}
