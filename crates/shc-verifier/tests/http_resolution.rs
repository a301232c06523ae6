//! # Issuer Key Discovery over HTTP
//!
//! Runs the verifier against a local mock issuer serving
//! `/.well-known/jwks.json`.

use std::time::Duration;

use serde_json::json;
use shc_core::Bundle;
use shc_crypto::{Key, KeySet};
use shc_vc::{Issuer, ProfileRegistry};
use shc_verifier::{
    HttpKeySetResolver, KeySetResolver, ResolverConfig, Verifier, VerifierError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn bundle() -> Bundle {
    let mut bundle = Bundle::collection();
    bundle.push_entry(
        Some("urn:uuid:0"),
        json!({"resourceType": "Patient", "name": [{"family": "Anyperson"}], "birthDate": "1951-01-20"}),
    );
    bundle
}

fn issuer_at(server: &MockServer, key: &Key) -> Issuer {
    Issuer::new(format!("{}/issuer", server.uri()), key.clone()).unwrap()
}

async fn serve_jwks(server: &MockServer, keys: &KeySet) {
    Mock::given(method("GET"))
        .and(path("/issuer/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(keys.to_public_jwks()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn unknown_key_is_fetched_from_issuer() {
    init_tracing();
    let server = MockServer::start().await;
    let key = Key::generate().unwrap();
    serve_jwks(&server, &KeySet::from(key.public_key())).await;

    let issuer = issuer_at(&server, &key);
    let profile = ProfileRegistry::standard().get("health-card").unwrap();
    let card = issuer.issue_health_card(&bundle(), profile).unwrap();

    let verifier = Verifier::with_config(&ResolverConfig::default()).unwrap();
    assert!(verifier.verify(&card).await.unwrap());
    assert!(verifier.verify(card.compact()).await.unwrap());
    assert!(verifier.keys().is_empty());
}

#[tokio::test]
async fn issuer_without_the_kid_is_missing_key() {
    init_tracing();
    let server = MockServer::start().await;
    let key = Key::generate().unwrap();
    serve_jwks(&server, &KeySet::from(Key::generate().unwrap().public_key())).await;

    let issuer = issuer_at(&server, &key);
    let profile = ProfileRegistry::standard().get("health-card").unwrap();
    let jws = issuer.issue_jws(&bundle(), profile).unwrap();

    let verifier = Verifier::new().unwrap();
    let err = verifier.verify(&jws).await.unwrap_err();
    assert!(matches!(err, VerifierError::MissingPublicKey { kid } if kid == key.kid()));
}

#[tokio::test]
async fn not_found_is_unresolvable() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = HttpKeySetResolver::new(&ResolverConfig::default()).unwrap();
    let err = resolver
        .resolve(&format!("{}/issuer", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifierError::UnresolvableKeySet { reason, .. } if reason.contains("404")));
}

#[tokio::test]
async fn malformed_document_is_unresolvable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issuer/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [{"kty": "RSA"}]})))
        .mount(&server)
        .await;

    let resolver = HttpKeySetResolver::new(&ResolverConfig::default()).unwrap();
    let err = resolver
        .resolve(&format!("{}/issuer", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifierError::UnresolvableKeySet { .. }));
}

#[tokio::test]
async fn slow_issuer_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"keys": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = ResolverConfig::default().with_timeout(Duration::from_millis(200));
    let resolver = HttpKeySetResolver::new(&config).unwrap();
    let err = resolver
        .resolve(&format!("{}/issuer", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifierError::UnresolvableKeySet { .. }));
}

#[tokio::test]
async fn disabled_resolution_never_contacts_issuer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": []})))
        .expect(0)
        .mount(&server)
        .await;

    let key = Key::generate().unwrap();
    let issuer = issuer_at(&server, &key);
    let profile = ProfileRegistry::standard().get("health-card").unwrap();
    let jws = issuer.issue_jws(&bundle(), profile).unwrap();

    let verifier = Verifier::new().unwrap();
    verifier.set_resolve_keys(false);
    assert!(matches!(
        verifier.verify(&jws).await,
        Err(VerifierError::MissingPublicKey { .. })
    ));
}
