use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{crypto, encode, Algorithm, DecodingKey, EncodingKey, Header};
use once_cell::sync::Lazy;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::EncodePublicKey;
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

use crate::verifier::EXPECTED_ISSUER;

pub const TEST_KID: &str = "kid_key";
pub const TEST_AUDIENCE: &str = "server-domain.example.com";

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub spki: String,
}

fn generate_key_material() -> KeyMaterial {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let public_key = private_key.to_public_key();

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");
    let spki = public_key
        .to_public_key_pem(LineEnding::LF)
        .expect("spki pem");

    KeyMaterial {
        encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
        decoding: DecodingKey::from_rsa_pem(spki.as_bytes()).expect("decoding key"),
        spki,
    }
}

pub static TEST_KEYS: Lazy<KeyMaterial> = Lazy::new(generate_key_material);
pub static OTHER_KEYS: Lazy<KeyMaterial> = Lazy::new(generate_key_material);

/// 2025-01-01T00:00:00+09:00
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 31, 15, 0, 0).unwrap()
}

/// A claim set that passes every check when verified at `issued_at`.
pub fn token_claims(issued_at: DateTime<Utc>) -> Value {
    json!({
        "iss": EXPECTED_ISSUER,
        "sub": "mirohaniUserId",
        "aud": TEST_AUDIENCE,
        "iat": issued_at.timestamp(),
        "exp": (issued_at + Duration::hours(2)).timestamp(),
        "auth_time": (issued_at - Duration::days(31)).timestamp(),
        "mirohani_user_id": "mirohaniUserId",
    })
}

pub fn sign_token_with(
    keys: &KeyMaterial,
    alg: Algorithm,
    kid: Option<&str>,
    claims: &Value,
) -> String {
    let header = Header {
        typ: None,
        kid: kid.map(str::to_string),
        ..Header::new(alg)
    };
    encode(&header, claims, &keys.encoding).expect("sign token")
}

pub fn sign_token(alg: Algorithm, kid: Option<&str>, claims: &Value) -> String {
    sign_token_with(&TEST_KEYS, alg, kid, claims)
}

fn segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("json"))
}

/// PS256-signs `claims` under a header given as raw JSON.
pub fn sign_with_raw_header(header: &Value, claims: &Value) -> String {
    let message = format!("{}.{}", segment(header), segment(claims));
    let signature =
        crypto::sign(message.as_bytes(), &TEST_KEYS.encoding, Algorithm::PS256).expect("sign");
    format!("{message}.{signature}")
}

/// A token with an arbitrary header and a signature nobody produced.
pub fn forge_token(header: &Value, claims: &Value) -> String {
    format!("{}.{}.c2lnbmF0dXJl", segment(header), segment(claims))
}
