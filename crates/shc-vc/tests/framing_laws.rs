//! # Framing Laws
//!
//! Compression is lossless over arbitrary bundles, and minification always
//! leaves resource roots without `id` or `text`.

use proptest::prelude::*;
use serde_json::{json, Value};
use shc_core::Bundle;
use shc_vc::{frame, unframe, Payload, ProfileRegistry};

fn patient() -> impl Strategy<Value = Value> {
    (
        "[a-z]{1,12}",
        prop::collection::vec("[A-Z][a-z]{0,10}", 1..3),
        "[0-9a-f]{1,16}",
        prop::option::of("[A-Za-z ]{1,30}"),
    )
        .prop_map(|(family, given, id, text)| {
            let mut resource = json!({
                "resourceType": "Patient",
                "id": id,
                "name": [{"family": family, "given": given}],
            });
            if let Some(text) = text {
                resource["text"] = json!({"status": "generated", "div": text});
            }
            resource
        })
}

fn bundle() -> impl Strategy<Value = Bundle> {
    prop::collection::vec(patient(), 0..6).prop_map(|patients| {
        let mut bundle = Bundle::collection();
        for (i, resource) in patients.into_iter().enumerate() {
            bundle.push_entry(Some(&format!("urn:uuid:{i}")), resource);
        }
        bundle
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn unframe_inverts_frame(bundle in bundle()) {
        let profile = ProfileRegistry::standard().get("health-card").unwrap();
        let credential = Payload::new(bundle, "https://example.org", profile).credential().unwrap();
        let restored = unframe(&frame(&credential).unwrap()).unwrap();
        prop_assert_eq!(restored, credential);
    }

    #[test]
    fn minified_roots_carry_no_id_or_text(bundle in bundle()) {
        let profile = ProfileRegistry::standard().get("health-card").unwrap();
        let minified = Payload::new(bundle, "https://example.org", profile).minified_bundle().unwrap();
        for resource in minified.resources() {
            prop_assert!(resource.get("id").is_none());
            prop_assert!(resource.get("text").is_none());
        }
    }
}
