//! # Bundle Minification
//!
//! Produces the de-identified copy of a bundle that goes into a credential.
//! The input bundle is never modified.
//!
//! 1. Every entry gets a short `resource:<N>` full URL, numbered from 0 in
//!    entry order.
//! 2. Each entry's resource is walked pre-order. A reference is rewritten
//!    to the short URL of the entry it denotes: first by exact match on the
//!    original `fullUrl`, then by resolving it against the FHIR base of the
//!    referencing entry's own original `fullUrl`. A reference that matches
//!    neither aborts minification.
//! 3. A resource root keeps `meta` only when it carries `security`.
//! 4. The profile's attribute rules are applied to the element:
//!    - a typed allow list is a whitelist;
//!    - typed disallow rules strip their attributes;
//!    - the wildcard disallow strips its attributes from resource roots.

use std::collections::HashMap;

use serde_json::Value;

use shc_core::fhir::{resolve_against_entry, visit_elements};
use shc_core::{Bundle, BundleError, Element, ElementKind};

use crate::error::CredentialError;
use crate::profile::{PayloadProfile, TypeSelector};

/// Attributes a whitelist never removes.
const STRUCTURAL_ATTRIBUTES: &[&str] = &["resourceType", "meta"];

/// Minify `bundle` under `profile`.
pub fn minify(bundle: &Bundle, profile: &PayloadProfile) -> Result<Bundle, CredentialError> {
    let mut minified = bundle.clone();
    if let Some(entries) = minified.entries_mut() {
        rewrite_entries(entries, profile)?;
        tracing::debug!(profile = profile.id(), entries = entries.len(), "minified bundle");
    }
    Ok(minified)
}

fn rewrite_entries(entries: &mut [Value], profile: &PayloadProfile) -> Result<(), CredentialError> {
    let mut url_map: HashMap<String, String> = HashMap::new();
    let mut original_urls: Vec<Option<String>> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter_mut().enumerate() {
        let short = format!("resource:{index}");
        let original = entry
            .get("fullUrl")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(url) = &original {
            if let Some(normalized) = normalize(url) {
                url_map.entry(normalized).or_insert_with(|| short.clone());
            }
            url_map.insert(url.clone(), short.clone());
        }
        if let Some(obj) = entry.as_object_mut() {
            obj.insert("fullUrl".to_string(), Value::String(short));
        }
        original_urls.push(original);
    }

    for (entry, original_url) in entries.iter_mut().zip(&original_urls) {
        let Some(resource) = entry.get_mut("resource") else {
            continue;
        };
        visit_elements(resource, &mut |element: &mut Element<'_>| {
            match element.kind() {
                ElementKind::Reference => {
                    rewrite_reference(element, original_url.as_deref(), &url_map)?
                }
                ElementKind::Resource => strip_meta(element),
                ElementKind::Plain => {}
            }
            apply_policy(element, profile);
            Ok::<(), CredentialError>(())
        })?;
    }
    Ok(())
}

fn rewrite_reference(
    element: &mut Element<'_>,
    entry_url: Option<&str>,
    url_map: &HashMap<String, String>,
) -> Result<(), CredentialError> {
    let Some(reference) = element
        .get("reference")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return Ok(());
    };

    if let Some(short) = url_map.get(&reference) {
        let short = short.clone();
        element.set("reference", Value::String(short));
        return Ok(());
    }

    let resolved = match entry_url {
        Some(base) => resolve_against_entry(base, &reference)?,
        None => return Err(BundleError::UnresolvableReference(reference).into()),
    };
    match url_map.get(&resolved) {
        Some(short) => {
            let short = short.clone();
            element.set("reference", Value::String(short));
            Ok(())
        }
        None => Err(BundleError::UnresolvableReference(resolved).into()),
    }
}

fn strip_meta(element: &mut Element<'_>) {
    let keep = element
        .get("meta")
        .map(|meta| meta.get("security").is_some())
        .unwrap_or(true);
    if !keep {
        element.remove("meta");
    }
}

fn apply_policy(element: &mut Element<'_>, profile: &PayloadProfile) {
    if let Some(allowed) = profile.allowed(element.type_name()) {
        element.retain(|name| STRUCTURAL_ATTRIBUTES.contains(&name) || allowed.contains(name));
    }

    let typed = TypeSelector::Type(element.type_name().to_string());
    if let Some(disallowed) = profile.disallowed(&typed) {
        element.retain(|name| !disallowed.contains(name));
    }

    if element.kind() == ElementKind::Resource {
        if let Some(disallowed) = profile.disallowed(&TypeSelector::AllResources) {
            element.retain(|name| !disallowed.contains(name));
        }
    }
}

/// The WHATWG-serialized form of an absolute URL, so `http://Example.org/a`
/// and `http://example.org/a` map to the same entry.
fn normalize(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let normalized = String::from(parsed);
    (normalized != url).then_some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileRegistry;
    use serde_json::json;

    fn logical_link_bundle() -> Bundle {
        Bundle::from_value(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"fullUrl": "http://example.org/fhir/Patient/123",
                 "resource": {"resourceType": "Patient", "id": "123"}},
                {"fullUrl": "urn:uuid:4fe4f8d4-9b6e-4780-8ea8-6b5c9d6f0a4e",
                 "resource": {"resourceType": "Patient"}},
                {"fullUrl": "http://example.org/fhir/Observation/1",
                 "resource": {"resourceType": "Observation", "subject": {"reference": "Patient/123"}}},
                {"fullUrl": "http://example.org/fhir/Observation/2",
                 "resource": {"resourceType": "Observation",
                              "subject": {"reference": "http://example.org/fhir/Patient/123"}}},
                {"fullUrl": "http://example.org/fhir/Observation/3",
                 "resource": {"resourceType": "Observation",
                              "subject": {"reference": "urn:uuid:4fe4f8d4-9b6e-4780-8ea8-6b5c9d6f0a4e"}}}
            ]
        }))
        .unwrap()
    }

    fn base() -> PayloadProfile {
        PayloadProfile::base()
    }

    #[test]
    fn assigns_short_urls_in_entry_order() {
        let minified = minify(&logical_link_bundle(), &base()).unwrap();
        let urls: Vec<&str> = minified
            .entries()
            .iter()
            .filter_map(|e| e["fullUrl"].as_str())
            .collect();
        assert_eq!(
            urls,
            ["resource:0", "resource:1", "resource:2", "resource:3", "resource:4"]
        );
    }

    #[test]
    fn every_reference_form_resolves_to_the_same_entry() {
        let minified = minify(&logical_link_bundle(), &base()).unwrap();
        let entries = minified.entries();
        assert_eq!(entries[2]["resource"]["subject"]["reference"], "resource:0");
        assert_eq!(entries[3]["resource"]["subject"]["reference"], "resource:0");
        assert_eq!(entries[4]["resource"]["subject"]["reference"], "resource:1");
    }

    #[test]
    fn relative_reference_under_nested_service_base() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"fullUrl": "https://hospital.example/Organization/acme/fhir/Patient/3",
                 "resource": {"resourceType": "Patient"}},
                {"fullUrl": "https://hospital.example/Organization/acme/fhir/Observation/7",
                 "resource": {"resourceType": "Observation", "subject": {"reference": "Patient/3"}}}
            ]
        }))
        .unwrap();
        let minified = minify(&bundle, &base()).unwrap();
        assert_eq!(
            minified.entries()[1]["resource"]["subject"]["reference"],
            "resource:0"
        );
    }

    #[test]
    fn reference_outside_bundle_fails() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"fullUrl": "http://example.org/fhir/Observation/1",
                 "resource": {"resourceType": "Observation", "subject": {"reference": "Patient/999"}}}
            ]
        }))
        .unwrap();
        match minify(&bundle, &base()) {
            Err(CredentialError::InvalidBundleReference { url }) => {
                assert_eq!(url, "http://example.org/fhir/Patient/999")
            }
            other => panic!("expected InvalidBundleReference, got {other:?}"),
        }
    }

    #[test]
    fn relative_reference_from_non_http_entry_fails() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"fullUrl": "urn:uuid:1",
                 "resource": {"resourceType": "Observation", "subject": {"reference": "Patient/1"}}}
            ]
        }))
        .unwrap();
        assert!(matches!(
            minify(&bundle, &base()),
            Err(CredentialError::InvalidBundleReference { url }) if url == "Patient/1"
        ));
    }

    #[test]
    fn original_bundle_is_untouched() {
        let bundle = logical_link_bundle();
        let before = bundle.clone();
        minify(&bundle, &base()).unwrap();
        assert_eq!(bundle, before);
    }

    #[test]
    fn strips_resource_id_text_and_plain_meta() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"fullUrl": "urn:uuid:1", "resource": {
                    "resourceType": "Patient",
                    "id": "p1",
                    "text": {"status": "generated", "div": "<div/>"},
                    "meta": {"versionId": "3"},
                    "name": [{"text": "Jane Doe", "given": ["Jane"]}]
                }},
                {"fullUrl": "urn:uuid:2", "resource": {
                    "resourceType": "Patient",
                    "meta": {"security": [{"code": "IAL1.2"}], "versionId": "3"}
                }}
            ]
        }))
        .unwrap();
        let minified = minify(&bundle, &base()).unwrap();
        let patient = &minified.entries()[0]["resource"];
        assert!(patient.get("id").is_none());
        assert!(patient.get("text").is_none());
        assert!(patient.get("meta").is_none());
        assert_eq!(patient["name"][0]["text"], "Jane Doe");

        let meta = &minified.entries()[1]["resource"]["meta"];
        assert_eq!(meta.as_object().unwrap().len(), 1);
        assert_eq!(meta["security"][0]["code"], "IAL1.2");
    }

    #[test]
    fn strips_codeable_concept_text_and_coding_display() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [{"fullUrl": "urn:uuid:1", "resource": {
                "resourceType": "Observation",
                "valueCodeableConcept": {
                    "text": "Not detected",
                    "coding": [{"system": "http://snomed.info/sct", "code": "260385009", "display": "Negative"}]
                }
            }}]
        }))
        .unwrap();
        let minified = minify(&bundle, &base()).unwrap();
        let concept = &minified.entries()[0]["resource"]["valueCodeableConcept"];
        assert!(concept.get("text").is_none());
        assert!(concept["coding"][0].get("display").is_none());
        assert_eq!(concept["coding"][0]["code"], "260385009");
    }

    #[test]
    fn allow_list_is_a_whitelist() {
        let covid = ProfileRegistry::standard().get("covid19").unwrap();
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [{"fullUrl": "urn:uuid:1", "resource": {
                "resourceType": "Patient",
                "gender": "female",
                "telecom": [{"system": "phone", "value": "555"}],
                "birthDate": "1961-01-20",
                "identifier": [{"value": "ghp-example"}],
                "name": [{"family": "Anyperson", "given": ["Jane"]}]
            }}]
        }))
        .unwrap();
        let minified = minify(&bundle, &covid).unwrap();
        let patient = &minified.entries()[0]["resource"];
        assert!(patient.get("gender").is_none());
        assert!(patient.get("telecom").is_none());
        assert_eq!(patient["resourceType"], "Patient");
        assert_eq!(patient["birthDate"], "1961-01-20");
        assert_eq!(patient["identifier"][0]["value"], "ghp-example");
        assert_eq!(patient["name"][0]["given"][0], "Jane");
    }

    #[test]
    fn bundle_without_entries_minifies_to_itself() {
        let bundle = Bundle::collection();
        assert_eq!(minify(&bundle, &base()).unwrap(), bundle);
    }
}
