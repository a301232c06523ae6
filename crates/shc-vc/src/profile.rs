//! # Payload Profiles
//!
//! A profile is the immutable configuration of one credential kind: the
//! `vc.type` URIs it declares, the FHIR version it claims, and the attribute
//! rules minification enforces.
//!
//! Profiles are composed, not inherited. [`PayloadProfile::base`] is the
//! generic health card; every other kind starts from a parent with
//! [`PayloadProfile::extend`] and adds deltas. Types and rules only
//! accumulate; a child can replace the FHIR version but can never drop a
//! parent's type or rule.
//!
//! [`ProfileRegistry`] maps identifiers to shared profiles so callers can
//! select a kind by name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::CredentialError;

/// Base credential type every health card declares.
pub const HEALTH_CARD_TYPE: &str = "https://smarthealth.cards#health-card";
pub const COVID19_TYPE: &str = "https://smarthealth.cards#covid19";
pub const IMMUNIZATION_TYPE: &str = "https://smarthealth.cards#immunization";
pub const LABORATORY_TYPE: &str = "https://smarthealth.cards#laboratory";
pub const MONKEYPOX_TYPE: &str = "https://smarthealth.cards#monkeypox";

/// FHIR version claimed by the base profile.
pub const DEFAULT_FHIR_VERSION: &str = "4.0.1";

/// Which elements a disallow rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeSelector {
    /// Every resource root (`*`).
    AllResources,
    /// Elements of one datatype or resource type.
    Type(String),
}

/// Immutable configuration of a credential kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadProfile {
    id: String,
    types: Vec<String>,
    fhir_version: String,
    allow: BTreeMap<String, BTreeSet<String>>,
    disallow: BTreeMap<TypeSelector, BTreeSet<String>>,
}

impl PayloadProfile {
    /// The generic `health-card` profile.
    ///
    /// Keeps only `Meta.security`, strips `id` and `text` from resources,
    /// `CodeableConcept.text`, and `Coding.display`.
    pub fn base() -> Self {
        Self {
            id: "health-card".to_string(),
            types: Vec::new(),
            fhir_version: DEFAULT_FHIR_VERSION.to_string(),
            allow: BTreeMap::new(),
            disallow: BTreeMap::new(),
        }
        .extend("health-card")
        .additional_type(HEALTH_CARD_TYPE)
        .allow("Meta", ["security"])
        .disallow(TypeSelector::AllResources, ["id", "text"])
        .disallow(TypeSelector::Type("CodeableConcept".to_string()), ["text"])
        .disallow(TypeSelector::Type("Coding".to_string()), ["display"])
        .build()
    }

    /// Start a child profile that inherits everything from `self`.
    pub fn extend(&self, id: impl Into<String>) -> ProfileBuilder {
        let mut profile = self.clone();
        profile.id = id.into();
        ProfileBuilder { profile }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared `vc.type` URIs, parents first.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn fhir_version(&self) -> &str {
        &self.fhir_version
    }

    /// True iff every URI in `types` is declared by this profile.
    pub fn supports_type<S: AsRef<str>>(&self, types: &[S]) -> bool {
        types
            .iter()
            .all(|t| self.types.iter().any(|own| own == t.as_ref()))
    }

    /// The allow list for `type_name`. `None` means no whitelist applies.
    pub fn allowed(&self, type_name: &str) -> Option<&BTreeSet<String>> {
        self.allow.get(type_name)
    }

    /// The disallowed attributes for `selector`.
    pub fn disallowed(&self, selector: &TypeSelector) -> Option<&BTreeSet<String>> {
        self.disallow.get(selector)
    }
}

/// Accumulates deltas on top of a parent profile.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    profile: PayloadProfile,
}

impl ProfileBuilder {
    /// Declare an additional `vc.type` URI. Duplicates are ignored.
    pub fn additional_type(mut self, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        if !self.profile.types.contains(&uri) {
            self.profile.types.push(uri);
        }
        self
    }

    /// Override the FHIR version.
    pub fn fhir_version(mut self, version: impl Into<String>) -> Self {
        self.profile.fhir_version = version.into();
        self
    }

    /// Add attributes to the whitelist for `type_name`.
    pub fn allow<I, S>(mut self, type_name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profile
            .allow
            .entry(type_name.into())
            .or_default()
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Add attributes that are always stripped for `selector`.
    pub fn disallow<I, S>(mut self, selector: TypeSelector, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profile
            .disallow
            .entry(selector)
            .or_default()
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> PayloadProfile {
        self.profile
    }
}

/// Attribute whitelists shared by the disease-specific profiles.
fn with_clinical_allow_lists(builder: ProfileBuilder) -> ProfileBuilder {
    builder
        .allow("Patient", ["identifier", "name", "birthDate"])
        .allow(
            "Immunization",
            [
                "status",
                "vaccineCode",
                "patient",
                "occurrenceDateTime",
                "occurrenceString",
                "manufacturer",
                "lotNumber",
                "performer",
                "isSubpotent",
            ],
        )
        .allow(
            "Observation",
            [
                "status",
                "code",
                "subject",
                "effectiveDateTime",
                "effectivePeriod",
                "performer",
                "valueCodeableConcept",
                "valueQuantity",
                "valueString",
                "referenceRange",
                "interpretation",
            ],
        )
}

/// Named profiles, shared behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<String, Arc<PayloadProfile>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in kinds: `health-card`, `covid19`, `covid19-immunization`,
    /// `covid19-laboratory`, `monkeypox`, and `monkeypox-immunization`.
    pub fn standard() -> Self {
        let base = PayloadProfile::base();
        let covid = with_clinical_allow_lists(base.extend("covid19").additional_type(COVID19_TYPE))
            .build();
        let covid_immunization = covid
            .extend("covid19-immunization")
            .additional_type(IMMUNIZATION_TYPE)
            .build();
        let covid_laboratory = covid
            .extend("covid19-laboratory")
            .additional_type(LABORATORY_TYPE)
            .build();
        let monkeypox =
            with_clinical_allow_lists(base.extend("monkeypox").additional_type(MONKEYPOX_TYPE))
                .build();
        let monkeypox_immunization = monkeypox
            .extend("monkeypox-immunization")
            .additional_type(IMMUNIZATION_TYPE)
            .build();

        let mut registry = Self::new();
        for profile in [
            base,
            covid,
            covid_immunization,
            covid_laboratory,
            monkeypox,
            monkeypox_immunization,
        ] {
            registry.register(profile);
        }
        registry
    }

    /// Register a profile under its id, returning any profile it replaced.
    pub fn register(&mut self, profile: PayloadProfile) -> Option<Arc<PayloadProfile>> {
        self.profiles
            .insert(profile.id.clone(), Arc::new(profile))
    }

    pub fn get(&self, id: &str) -> Result<Arc<PayloadProfile>, CredentialError> {
        self.profiles
            .get(id)
            .cloned()
            .ok_or_else(|| CredentialError::UnknownProfile(id.to_string()))
    }

    /// The most specific registered profile declaring every URI in `types`.
    pub fn find_by_types<S: AsRef<str>>(&self, types: &[S]) -> Option<Arc<PayloadProfile>> {
        self.profiles
            .values()
            .filter(|p| p.supports_type(types) && p.types.len() == types.len())
            .min_by(|a, b| a.id.cmp(&b.id))
            .cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_profile_rules() {
        let base = PayloadProfile::base();
        assert_eq!(base.id(), "health-card");
        assert_eq!(base.types(), [HEALTH_CARD_TYPE]);
        assert_eq!(base.fhir_version(), "4.0.1");
        assert!(base.allowed("Meta").unwrap().contains("security"));
        let wildcard = base.disallowed(&TypeSelector::AllResources).unwrap();
        assert!(wildcard.contains("id") && wildcard.contains("text"));
        assert!(base
            .disallowed(&TypeSelector::Type("Coding".to_string()))
            .unwrap()
            .contains("display"));
    }

    #[test]
    fn children_accumulate_types() {
        let registry = ProfileRegistry::standard();
        let base = registry.get("health-card").unwrap();
        let covid = registry.get("covid19").unwrap();
        let lab = registry.get("covid19-laboratory").unwrap();

        assert_eq!(base.types().len(), 1);
        assert_eq!(covid.types(), [HEALTH_CARD_TYPE, COVID19_TYPE]);
        assert_eq!(lab.types(), [HEALTH_CARD_TYPE, COVID19_TYPE, LABORATORY_TYPE]);
        assert_eq!(lab.fhir_version(), covid.fhir_version());
    }

    #[test]
    fn child_can_override_fhir_version_and_add_type() {
        let covid = ProfileRegistry::standard().get("covid19").unwrap();
        let changed = covid
            .extend("covid19-test")
            .fhir_version("4.0.2")
            .additional_type("https://smarthealth.cards#test")
            .build();
        assert_eq!(changed.fhir_version(), "4.0.2");
        assert_eq!(changed.types().len(), covid.types().len() + 1);
        assert_eq!(covid.fhir_version(), "4.0.1");
        assert_eq!(changed.allowed("Patient"), covid.allowed("Patient"));
    }

    #[test]
    fn child_rules_add_to_parent_rules() {
        let covid = ProfileRegistry::standard().get("covid19").unwrap();
        let child = covid.extend("child").allow("Patient", ["gender"]).build();
        let patient = child.allowed("Patient").unwrap();
        assert!(patient.contains("gender"));
        assert!(patient.contains("birthDate"));
        assert!(child.allowed("Meta").unwrap().contains("security"));
    }

    #[test]
    fn supports_type_requires_every_uri() {
        let covid = ProfileRegistry::standard().get("covid19").unwrap();
        assert!(covid.supports_type(&[HEALTH_CARD_TYPE]));
        assert!(covid.supports_type(&[HEALTH_CARD_TYPE, COVID19_TYPE]));
        assert!(!covid.supports_type(&[HEALTH_CARD_TYPE, MONKEYPOX_TYPE]));
    }

    #[test]
    fn registry_lookup() {
        let registry = ProfileRegistry::standard();
        assert_eq!(registry.ids().count(), 6);
        assert!(matches!(
            registry.get("measles"),
            Err(CredentialError::UnknownProfile(id)) if id == "measles"
        ));
        let found = registry
            .find_by_types(&[HEALTH_CARD_TYPE, MONKEYPOX_TYPE, IMMUNIZATION_TYPE])
            .unwrap();
        assert_eq!(found.id(), "monkeypox-immunization");
    }

    #[test]
    fn register_replaces_by_id() {
        let mut registry = ProfileRegistry::new();
        assert!(registry.register(PayloadProfile::base()).is_none());
        let replaced = registry
            .register(PayloadProfile::base().extend("health-card").fhir_version("4.0.2").build())
            .unwrap();
        assert_eq!(replaced.fhir_version(), "4.0.1");
        assert_eq!(registry.get("health-card").unwrap().fhir_version(), "4.0.2");
    }
}
