//! # Clinical Bundle Model
//!
//! A thin model over FHIR R4 JSON. Structural validation of the clinical
//! model is out of scope; this module only provides what minification and
//! card queries need:
//!
//! - [`Bundle`]: a validated `resourceType: "Bundle"` JSON object with
//!   ordered `entry` access.
//! - [`visit_elements()`]: a pre-order walk over every complex element of a
//!   resource, tagging each with an [`ElementKind`] and a datatype name.
//! - [`reference_base()`]: extraction of the FHIR service base from an
//!   absolute `fullUrl`, matching against the canonical resource type names.
//!
//! ## Element classification
//!
//! JSON carries no datatype, so kinds are inferred from structure:
//!
//! | Shape | Kind | Type name |
//! |-------|------|-----------|
//! | object with a string `resourceType` | `Resource` | the resource type |
//! | object with a `reference` member | `Reference` | `Reference` |
//! | value of a `meta` member | `Plain` | `Meta` |
//! | item of a `coding` array | `Plain` | `Coding` |
//! | object with a `coding` member | `Plain` | `CodeableConcept` |
//! | anything else | `Plain` | `Element` |

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::BundleError;

/// FHIR R4 resource type names, used to locate the `Type/id` suffix of an
/// absolute entry URL.
pub const RESOURCE_TYPES: &[&str] = &[
    "Account", "ActivityDefinition", "AdverseEvent", "AllergyIntolerance", "Appointment",
    "AppointmentResponse", "AuditEvent", "Basic", "Binary", "BiologicallyDerivedProduct",
    "BodyStructure", "Bundle", "CapabilityStatement", "CarePlan", "CareTeam", "CatalogEntry",
    "ChargeItem", "ChargeItemDefinition", "Claim", "ClaimResponse", "ClinicalImpression",
    "CodeSystem", "Communication", "CommunicationRequest", "CompartmentDefinition",
    "Composition", "ConceptMap", "Condition", "Consent", "Contract", "Coverage",
    "CoverageEligibilityRequest", "CoverageEligibilityResponse", "DetectedIssue", "Device",
    "DeviceDefinition", "DeviceMetric", "DeviceRequest", "DeviceUseStatement",
    "DiagnosticReport", "DocumentManifest", "DocumentReference", "EffectEvidenceSynthesis",
    "Encounter", "Endpoint", "EnrollmentRequest", "EnrollmentResponse", "EpisodeOfCare",
    "EventDefinition", "Evidence", "EvidenceVariable", "ExampleScenario",
    "ExplanationOfBenefit", "FamilyMemberHistory", "Flag", "Goal", "GraphDefinition", "Group",
    "GuidanceResponse", "HealthcareService", "ImagingStudy", "Immunization",
    "ImmunizationEvaluation", "ImmunizationRecommendation", "ImplementationGuide",
    "InsurancePlan", "Invoice", "Library", "Linkage", "List", "Location", "Measure",
    "MeasureReport", "Media", "Medication", "MedicationAdministration", "MedicationDispense",
    "MedicationKnowledge", "MedicationRequest", "MedicationStatement", "MedicinalProduct",
    "MedicinalProductAuthorization", "MedicinalProductContraindication",
    "MedicinalProductIndication", "MedicinalProductIngredient",
    "MedicinalProductInteraction", "MedicinalProductManufactured",
    "MedicinalProductPackaged", "MedicinalProductPharmaceutical",
    "MedicinalProductUndesirableEffect", "MessageDefinition", "MessageHeader",
    "MolecularSequence", "NamingSystem", "NutritionOrder", "Observation",
    "ObservationDefinition", "OperationDefinition", "OperationOutcome", "Organization",
    "OrganizationAffiliation", "Patient", "PaymentNotice", "PaymentReconciliation", "Person",
    "PlanDefinition", "Practitioner", "PractitionerRole", "Procedure", "Provenance",
    "Questionnaire", "QuestionnaireResponse", "RelatedPerson", "RequestGroup",
    "ResearchDefinition", "ResearchElementDefinition", "ResearchStudy", "ResearchSubject",
    "RiskAssessment", "RiskEvidenceSynthesis", "Schedule", "SearchParameter",
    "ServiceRequest", "Slot", "Specimen", "SpecimenDefinition", "StructureDefinition",
    "StructureMap", "Subscription", "Substance", "SubstanceNucleicAcid", "SubstancePolymer",
    "SubstanceProtein", "SubstanceReferenceInformation", "SubstanceSourceMaterial",
    "SubstanceSpecification", "SupplyDelivery", "SupplyRequest", "Task",
    "TerminologyCapabilities", "TestReport", "TestScript", "ValueSet", "VerificationResult",
    "VisionPrescription",
];

/// Returns true if `name` is a FHIR R4 resource type.
pub fn is_resource_type(name: &str) -> bool {
    RESOURCE_TYPES.contains(&name)
}

/// A FHIR `Bundle` held as its JSON tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Bundle(Value);

impl Bundle {
    /// Wrap a JSON value, rejecting anything that is not a `Bundle` resource.
    pub fn from_value(value: Value) -> Result<Self, BundleError> {
        match value.get("resourceType").and_then(Value::as_str) {
            Some("Bundle") if value.is_object() => Ok(Self(value)),
            Some(other) => Err(BundleError::NotABundle(other.to_string())),
            None => Err(BundleError::NotABundle(describe(&value))),
        }
    }

    /// Parse FHIR JSON text into a bundle.
    pub fn from_json(text: &str) -> Result<Self, BundleError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| BundleError::NotABundle(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// An empty `collection` bundle.
    pub fn collection() -> Self {
        Self(serde_json::json!({"resourceType": "Bundle", "type": "collection"}))
    }

    /// Append an entry.
    pub fn push_entry(&mut self, full_url: Option<&str>, resource: Value) {
        let mut entry = Map::new();
        if let Some(url) = full_url {
            entry.insert("fullUrl".to_string(), Value::String(url.to_string()));
        }
        entry.insert("resource".to_string(), resource);
        if let Some(obj) = self.0.as_object_mut() {
            let entries = obj
                .entry("entry")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = entries {
                items.push(Value::Object(entry));
            }
        }
    }

    /// The `Bundle.type` code, if present.
    pub fn bundle_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Entries in bundle order. Empty when the bundle has no `entry`.
    pub fn entries(&self) -> &[Value] {
        self.0
            .get("entry")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mutable entries, or `None` when the bundle has no `entry` array.
    pub fn entries_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.0.get_mut("entry").and_then(Value::as_array_mut)
    }

    /// The `resource` of every entry, in order.
    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entries().iter().filter_map(|e| e.get("resource"))
    }

    /// Borrow the JSON tree.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the JSON tree.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl<'de> Deserialize<'de> for Bundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object without resourceType".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Element visitor
// ---------------------------------------------------------------------------

/// The closed set of element kinds minification dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// The root of a resource (entry resource or contained resource).
    Resource,
    /// A `Reference` datatype pointing at another entry.
    Reference,
    /// Any other complex element.
    Plain,
}

/// A complex element reached during traversal, with mutable access to its
/// attributes.
#[derive(Debug)]
pub struct Element<'a> {
    kind: ElementKind,
    type_name: String,
    attributes: &'a mut Map<String, Value>,
}

impl<'a> Element<'a> {
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Datatype or resource type name, e.g. `Patient`, `Meta`, `Coding`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn set(&mut self, attribute: &str, value: Value) {
        self.attributes.insert(attribute.to_string(), value);
    }

    pub fn remove(&mut self, attribute: &str) -> Option<Value> {
        self.attributes.remove(attribute)
    }

    /// Keep only attributes for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.attributes.retain(|k, _| keep(k));
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// Walk every complex element under `root` in pre-order.
///
/// `visit` runs on a node before its children, so attributes it removes are
/// never descended into. Traversal stops at the first error.
pub fn visit_elements<F, E>(root: &mut Value, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&mut Element<'_>) -> Result<(), E>,
{
    walk(root, None, visit)
}

fn walk<F, E>(value: &mut Value, field: Option<&str>, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&mut Element<'_>) -> Result<(), E>,
{
    match value {
        Value::Object(map) => {
            let (kind, type_name) = classify(field, map);
            visit(&mut Element {
                kind,
                type_name,
                attributes: map,
            })?;
            for (key, child) in map.iter_mut() {
                walk(child, Some(key.as_str()), visit)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                walk(item, field, visit)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn classify(field: Option<&str>, map: &Map<String, Value>) -> (ElementKind, String) {
    if let Some(resource_type) = map.get("resourceType").and_then(Value::as_str) {
        return (ElementKind::Resource, resource_type.to_string());
    }
    if map.contains_key("reference") {
        return (ElementKind::Reference, "Reference".to_string());
    }
    let type_name = match field {
        Some("meta") => "Meta",
        Some("coding") => "Coding",
        _ if map.contains_key("coding") => "CodeableConcept",
        _ => "Element",
    };
    (ElementKind::Plain, type_name.to_string())
}

// ---------------------------------------------------------------------------
// Reference bases
// ---------------------------------------------------------------------------

/// Extract the FHIR service base URL from an absolute `Type/id` URL.
///
/// `https://example.org/fhir/Patient/123/_history/2` yields
/// `https://example.org/fhir/`. The base ends before the last `Type/id`
/// pair, so a base path may itself contain type-like segments. Returns
/// `None` for non-http(s) URLs (e.g. `urn:uuid:`) and for URLs without a
/// recognizable `Type/id` pair.
pub fn reference_base(full_url: &str) -> Option<Url> {
    let parsed = Url::parse(full_url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let position = segments
        .windows(2)
        .rposition(|pair| is_resource_type(pair[0]) && is_logical_id(pair[1]))?;

    let mut base = parsed.clone();
    let prefix = segments[..position].join("/");
    if prefix.is_empty() {
        base.set_path("/");
    } else {
        base.set_path(&format!("/{prefix}/"));
    }
    base.set_query(None);
    base.set_fragment(None);
    Some(base)
}

/// Resolve `reference` against the service base of `entry_url`.
///
/// Fails with `UnresolvableReference` carrying `reference` when the entry
/// URL has no service base or the join is not a valid URL.
pub fn resolve_against_entry(entry_url: &str, reference: &str) -> Result<String, BundleError> {
    reference_base(entry_url)
        .and_then(|base| base.join(reference).ok())
        .map(String::from)
        .ok_or_else(|| BundleError::UnresolvableReference(reference.to_string()))
}

fn is_logical_id(segment: &str) -> bool {
    (1..=64).contains(&segment.len())
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
