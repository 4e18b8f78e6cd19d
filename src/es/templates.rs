use serde_json::{json, Map, Value};

use crate::error::ProvisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Number,
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateParam {
    pub name: &'static str,
    pub kind: ParamKind,
}

const SEARCH_PARAMS: &[TemplateParam] = &[
    TemplateParam {
        name: "keyword",
        kind: ParamKind::Text,
    },
    TemplateParam {
        name: "size",
        kind: ParamKind::Number,
    },
];

/// Boosts address components by their administrative rank.
const RANK_SCORE_SCRIPT: &str = "Math.pow(2, doc['address_parts.rank'].value / 5)";

const NAME_FIELDS: [&str; 2] = ["names.name:my.ngram", "names.name.ngram"];

#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub name: &'static str,
    pub params: &'static [TemplateParam],
    query: Value,
}

impl QueryTemplate {
    pub fn new(name: &'static str, params: &'static [TemplateParam], query: Value) -> Self {
        Self {
            name,
            params,
            query,
        }
    }

    /// Mustache source as stored by Elasticsearch. Numeric parameters are left
    /// unquoted so they render as JSON numbers.
    pub fn source(&self) -> Result<String, ProvisionError> {
        let mut source = serde_json::to_string(&self.query)?;
        for param in self.params.iter().filter(|p| p.kind == ParamKind::Number) {
            let quoted = format!("\"{{{{{}}}}}\"", param.name);
            let bare = format!("{{{{{}}}}}", param.name);
            source = source.replace(&quoted, &bare);
        }
        Ok(source)
    }

    /// Body for `PUT _scripts/<name>`.
    pub fn stored_script(&self) -> Result<Value, ProvisionError> {
        Ok(json!({
            "script": {
                "lang": "mustache",
                "source": self.source()?
            }
        }))
    }

    /// Substitutes `{{param}}` placeholders the way the search client's
    /// mustache renderer does and parses the result.
    pub fn render(&self, values: &Map<String, Value>) -> Result<Value, ProvisionError> {
        let source = self.source()?;
        let mut rendered = String::with_capacity(source.len());
        let mut rest = source.as_str();

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                ProvisionError::Template(format!("{}: unterminated placeholder", self.name))
            })?;
            let key = after[..end].trim();
            let value = values.get(key).ok_or_else(|| {
                ProvisionError::Template(format!("{}: missing value for '{key}'", self.name))
            })?;
            rendered.push_str(&placeholder_text(value)?);
            rest = &after[end + 2..];
        }
        rendered.push_str(rest);

        serde_json::from_str(&rendered).map_err(|e| {
            ProvisionError::Template(format!("{}: rendered query is not JSON: {e}", self.name))
        })
    }

    /// Checks that every declared parameter is used and that a sample
    /// rendering produces a JSON document.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        let source = self.source()?;
        for param in self.params {
            let placeholder = format!("{{{{{}}}}}", param.name);
            if !source.contains(&placeholder) {
                return Err(ProvisionError::Template(format!(
                    "{}: parameter '{}' is declared but never used",
                    self.name, param.name
                )));
            }
            if param.kind == ParamKind::Number && source.contains(&format!("\"{placeholder}\"")) {
                return Err(ProvisionError::Template(format!(
                    "{}: numeric parameter '{}' is quoted",
                    self.name, param.name
                )));
            }
        }
        self.render(&sample_params())?;
        Ok(())
    }
}

/// Values used for dry runs and startup validation.
pub fn sample_params() -> Map<String, Value> {
    let mut values = Map::new();
    values.insert("keyword".into(), json!("yangon"));
    values.insert("size".into(), json!(5));
    values
}

fn placeholder_text(value: &Value) -> Result<String, ProvisionError> {
    match value {
        // Escaped string contents, without the surrounding quotes
        Value::String(s) => {
            let encoded = serde_json::to_string(s)?;
            Ok(encoded[1..encoded.len() - 1].to_string())
        }
        other => Ok(serde_json::to_string(other)?),
    }
}

pub fn all_templates() -> Vec<QueryTemplate> {
    vec![
        address_places_search(),
        name_search(),
        universal_name_address_search(),
    ]
}

fn rank_scored_address_query() -> Value {
    json!({
        "nested": {
            "path": "address_parts",
            "query": {
                "function_score": {
                    "query": {
                        "match": {
                            "address_parts.name.name:my": { "query": "{{keyword}}" }
                        }
                    },
                    "functions": [{
                        "script_score": {
                            "script": { "source": RANK_SCORE_SCRIPT }
                        }
                    }],
                    "boost_mode": "multiply"
                }
            },
            "score_mode": "avg",
            "inner_hits": { "size": 3 }
        }
    })
}

fn name_multi_match() -> Value {
    json!({
        "multi_match": {
            "fields": NAME_FIELDS,
            "query": "{{keyword}}"
        }
    })
}

pub fn address_places_search() -> QueryTemplate {
    QueryTemplate::new(
        "address_places_search",
        SEARCH_PARAMS,
        json!({
            "query": rank_scored_address_query(),
            "sort": ["_score"],
            "size": "{{size}}"
        }),
    )
}

pub fn name_search() -> QueryTemplate {
    QueryTemplate::new(
        "name_search",
        SEARCH_PARAMS,
        json!({
            "query": name_multi_match(),
            "size": "{{size}}"
        }),
    )
}

pub fn universal_name_address_search() -> QueryTemplate {
    QueryTemplate::new(
        "universal_name_address_search",
        SEARCH_PARAMS,
        json!({
            "query": {
                "bool": {
                    "should": [name_multi_match(), rank_scored_address_query()]
                }
            },
            "sort": ["_score"],
            "size": "{{size}}"
        }),
    )
}
