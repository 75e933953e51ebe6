//! Heuristic schema suggestion.
//!
//! When neither the stored graph nor the AI proposed a schema hint, infer
//! one from the document title (keyword match against known archetypes) or
//! from whichever entity types are present.

use crate::models::SemanticGraph;

/// `(title keywords, schema identifier)`, first match wins.
const ARCHETYPES: &[(&[&str], &str)] = &[
    (&["summary of product characteristics", "smpc", "rcp"], "smpc_v1"),
    (&["variation"], "variation_v1"),
    (&["renewal", "renouvellement"], "renewal_v1"),
    (&["periodic safety", "psur"], "psur_v1"),
    (&["gmp", "good manufacturing"], "gmp_certificate_v1"),
    (&["label", "labelling", "leaflet", "notice"], "labelling_v1"),
    (&["marketing authorisation", "marketing authorization", "amm"], "authorisation_v1"),
];

/// Suggest a schema for the document.
pub fn suggest(title: &str, graph: &SemanticGraph) -> String {
    let lowered = title.to_lowercase();
    for (keywords, schema) in ARCHETYPES {
        if keywords.iter().any(|k| lowered.contains(k)) {
            return schema.to_string();
        }
    }

    let has = |t: &str| graph.entities.get(t).is_some_and(|g| !g.items.is_empty());

    if has("Product") && (has("Active_Ingredient") || has("Dosage")) {
        "product_composition_v1".to_string()
    } else if has("Authority") || has("Procedure") {
        "regulatory_procedure_v1".to_string()
    } else {
        "generic_document_v1".to_string()
    }
}
