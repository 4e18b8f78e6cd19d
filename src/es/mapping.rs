use serde_json::{json, Value};

/// Field paths (dotted, through `properties`) and the type the live mapping
/// must report for them.
pub const EXPECTED_FIELD_TYPES: &[(&str, &str)] = &[
    ("address_parts", "nested"),
    ("centroid.coordinates", "geo_point"),
];

pub fn index_settings_and_mappings() -> Value {
    // "myanmar_kytea_analyzer" is registered by the Myanmar analysis plugin,
    // so it is referenced directly without a custom definition.
    json!({
        "settings": {
            "index.max_ngram_diff": 99,
            "index.mapping.total_fields.limit": 100000,
            "analysis": {
                "analyzer": {
                    "myanmar_ngram": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "my_ngram"]
                    }
                },
                "filter": {
                    "my_ngram": {
                        "type": "ngram",
                        "min_gram": 4,
                        "max_gram": 9
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "names": {
                    "properties": {
                        "name": myanmar_text(json!({ "ngram": ngram_subfield() })),
                        "name:my": myanmar_text(json!({ "ngram": ngram_subfield() })),
                        "name:en": { "type": "text" }
                    }
                },
                "address_parts": {
                    "type": "nested",
                    "properties": {
                        "name": {
                            "properties": {
                                "name:my": myanmar_text(json!({
                                    "keyword": { "type": "keyword", "ignore_above": 256 },
                                    "ngram": ngram_subfield()
                                }))
                            }
                        },
                        "rank": { "type": "integer" }
                    }
                },
                "centroid": {
                    "properties": {
                        "coordinates": { "type": "geo_point" },
                        "type": { "type": "keyword" }
                    }
                }
            }
        }
    })
}

fn myanmar_text(fields: Value) -> Value {
    json!({
        "type": "text",
        "analyzer": "myanmar_kytea_analyzer",
        "search_analyzer": "myanmar_kytea_analyzer",
        "fields": fields
    })
}

fn ngram_subfield() -> Value {
    json!({
        "type": "text",
        "analyzer": "myanmar_ngram",
        "search_analyzer": "myanmar_ngram"
    })
}

/// Looks up the `type` of a dotted field path inside a `properties` tree.
pub fn field_type<'a>(properties: &'a Value, path: &str) -> Option<&'a str> {
    let mut node = properties;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let field = node.get(segment)?;
        if segments.peek().is_none() {
            return field.get("type").and_then(Value::as_str);
        }
        node = field.get("properties")?;
    }
    None
}

/// Compares the `properties` of a live mapping against `EXPECTED_FIELD_TYPES`
/// and returns one message per mismatch.
pub fn mapping_mismatches(properties: &Value) -> Vec<String> {
    EXPECTED_FIELD_TYPES
        .iter()
        .filter_map(|(path, expected)| match field_type(properties, path) {
            Some(actual) if actual == *expected => None,
            actual => Some(format!(
                "{path}.type expected {expected}, got {}",
                actual.unwrap_or("none")
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_pipeline_uses_ngram_filter() {
        let body = index_settings_and_mappings();
        let analysis = &body["settings"]["analysis"];

        assert_eq!(
            analysis["analyzer"]["myanmar_ngram"]["filter"],
            json!(["lowercase", "my_ngram"])
        );
        assert_eq!(analysis["filter"]["my_ngram"]["type"], "ngram");
        assert_eq!(analysis["filter"]["my_ngram"]["min_gram"], 4);
        assert_eq!(analysis["filter"]["my_ngram"]["max_gram"], 9);
        // max_gram - min_gram must stay within the index limit
        assert!(body["settings"]["index.max_ngram_diff"].as_i64().unwrap() >= 5);
    }

    #[test]
    fn definition_satisfies_its_own_expectations() {
        let body = index_settings_and_mappings();
        assert!(mapping_mismatches(&body["mappings"]["properties"]).is_empty());
    }

    #[test]
    fn name_fields_carry_ngram_subfield() {
        let body = index_settings_and_mappings();
        let names = &body["mappings"]["properties"]["names"]["properties"];

        for field in ["name", "name:my"] {
            assert_eq!(names[field]["analyzer"], "myanmar_kytea_analyzer");
            assert_eq!(names[field]["fields"]["ngram"]["analyzer"], "myanmar_ngram");
        }
        assert_eq!(names["name:en"], json!({ "type": "text" }));
    }

    #[test]
    fn field_type_walks_nested_properties() {
        let body = index_settings_and_mappings();
        let props = &body["mappings"]["properties"];

        assert_eq!(field_type(props, "address_parts.rank"), Some("integer"));
        assert_eq!(field_type(props, "centroid.type"), Some("keyword"));
        assert_eq!(field_type(props, "centroid.missing"), None);
    }

    #[test]
    fn mismatches_report_wrong_types() {
        let live = json!({
            "address_parts": { "type": "object" },
            "centroid": { "type": "geo_point" }
        });

        let mismatches = mapping_mismatches(&live);
        assert_eq!(
            mismatches,
            vec![
                "address_parts.type expected nested, got object".to_string(),
                "centroid.coordinates.type expected geo_point, got none".to_string(),
            ]
        );
    }
}
