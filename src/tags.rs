//! Tag matching rules.
//!
//! A [`TagQuerySpec`] maps tag keys to a [`TagRule`]. Specs are built once
//! (from JSON, TOML or command-line arguments) and then evaluated against the
//! tags of every candidate object.
//!
//! Matching is a logical OR across keys: an object matches as soon as one
//! requested key is present and satisfies its rule.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Rule applied to the value of a single tag key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRule {
    /// Key presence is enough. Both `true` and `null` in a spec map here.
    Any,
    /// Value must be one of the set.
    OneOf(BTreeSet<String>),
    /// Value must equal this string.
    Exact(String),
}

impl TagRule {
    /// Evaluate the rule against the value of a key already known to be present.
    pub fn matches(&self, observed: &str) -> bool {
        match self {
            TagRule::Any => true,
            TagRule::OneOf(values) => values.contains(observed),
            TagRule::Exact(value) => value == observed,
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagRule::OneOf(values.into_iter().map(Into::into).collect())
    }
}

/// Read access to an object's tags.
pub trait TagSource {
    fn tag(&self, key: &str) -> Option<&str>;
}

impl TagSource for osmpbfreader::Tags {
    fn tag(&self, key: &str) -> Option<&str> {
        self.get(key).map(|v| v.as_str())
    }
}

impl TagSource for BTreeMap<String, String> {
    fn tag(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl TagSource for HashMap<String, String> {
    fn tag(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Requested tag keys and their rules, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Option<RawRule>>")]
pub struct TagQuerySpec {
    rules: Vec<(String, TagRule)>,
}

impl TagQuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for `key`.
    pub fn insert(&mut self, key: impl Into<String>, rule: TagRule) {
        let key = key.into();
        match self.rules.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = rule,
            None => self.rules.push((key, rule)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, rule: TagRule) -> Self {
        self.insert(key, rule);
        self
    }

    /// Parse a JSON object such as `{"amenity": ["school", "hospital"], "shop": true}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Option<RawRule>> = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Combine an optional JSON object with `key=value` rules; later rules
    /// replace earlier ones for the same key.
    pub fn from_args<S: AsRef<str>>(json: Option<&str>, rules: &[S]) -> Result<Self> {
        let mut spec = match json {
            Some(json) => Self::from_json(json)?,
            None => Self::new(),
        };
        for rule in rules {
            let (key, rule) = parse_rule(rule.as_ref())?;
            spec.insert(key, rule);
        }
        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagRule)> {
        self.rules.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(k, _)| k.as_str())
    }

    /// True when any requested key is present and satisfies its rule.
    /// An empty spec matches everything.
    pub fn feature_matches<T: TagSource + ?Sized>(&self, tags: &T) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        self.rules.iter().any(|(key, rule)| match tags.tag(key) {
            Some(value) => rule.matches(value),
            None => false,
        })
    }
}

impl FromStr for TagQuerySpec {
    type Err = Error;

    /// Parse rules separated by `;`, e.g. `amenity=school,hospital;shop`.
    fn from_str(s: &str) -> Result<Self> {
        let mut spec = TagQuerySpec::new();
        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, rule) = parse_rule(part)?;
            spec.insert(key, rule);
        }
        Ok(spec)
    }
}

/// Command-line form of a single rule: `key`, `key=*`, `key=value` or `key=a,b,c`.
pub fn parse_rule(arg: &str) -> Result<(String, TagRule)> {
    let (key, values) = match arg.split_once('=') {
        Some((k, v)) => (k.trim(), Some(v.trim())),
        None => (arg.trim(), None),
    };
    if key.is_empty() {
        return Err(Error::InvalidTagSpec {
            key: arg.to_string(),
            reason: "empty tag key".to_string(),
        });
    }

    let rule = match values {
        None | Some("*") => TagRule::Any,
        Some(v) => {
            let values: Vec<&str> = v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
            match values.as_slice() {
                [] => TagRule::Any,
                [single] => TagRule::Exact(single.to_string()),
                many => TagRule::one_of(many.iter().copied()),
            }
        }
    };
    Ok((key.to_string(), rule))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Flag(bool),
    Many(Vec<Scalar>),
    One(Scalar),
}

impl TryFrom<BTreeMap<String, Option<RawRule>>> for TagQuerySpec {
    type Error = Error;

    fn try_from(raw: BTreeMap<String, Option<RawRule>>) -> Result<Self> {
        let mut spec = TagQuerySpec::new();
        for (key, raw_rule) in raw {
            let rule = match raw_rule {
                None | Some(RawRule::Flag(true)) => TagRule::Any,
                Some(RawRule::Flag(false)) => {
                    return Err(Error::InvalidTagSpec {
                        key,
                        reason: "`false` is not a valid rule; omit the key instead".to_string(),
                    })
                }
                Some(RawRule::Many(values)) => {
                    TagRule::OneOf(values.into_iter().map(Scalar::into_string).collect())
                }
                Some(RawRule::One(value)) => TagRule::Exact(value.into_string()),
            };
            spec.insert(key, rule);
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rule_matching() {
        assert!(TagRule::Any.matches("anything"));
        assert!(TagRule::one_of(["school", "hospital"]).matches("school"));
        assert!(!TagRule::one_of(["school", "hospital"]).matches("bar"));
        assert!(TagRule::Exact("yes".into()).matches("yes"));
        assert!(!TagRule::Exact("yes".into()).matches("Yes"));
    }

    #[test]
    fn test_one_of_spec() {
        let spec = TagQuerySpec::new().with("amenity", TagRule::one_of(["school", "hospital"]));
        assert!(spec.feature_matches(&tags(&[("amenity", "school")])));
        assert!(!spec.feature_matches(&tags(&[("amenity", "shop")])));
        assert!(!spec.feature_matches(&tags(&[("shop", "yes")])));
    }

    #[test]
    fn test_match_any_across_keys() {
        let spec = TagQuerySpec::new()
            .with("amenity", TagRule::one_of(["school"]))
            .with("shop", TagRule::Any);
        assert!(spec.feature_matches(&tags(&[("amenity", "shop"), ("shop", "yes")])));
        assert!(spec.feature_matches(&tags(&[("amenity", "bar"), ("shop", "yes")])));
        assert!(!spec.feature_matches(&tags(&[("amenity", "bar")])));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let spec = TagQuerySpec::new().with("Amenity", TagRule::Any);
        assert!(!spec.feature_matches(&tags(&[("amenity", "school")])));
    }

    #[test]
    fn test_empty_spec_matches_everything() {
        assert!(TagQuerySpec::new().feature_matches(&tags(&[("highway", "primary")])));
    }

    #[test]
    fn test_osm_tags_source() {
        let mut osm = osmpbfreader::Tags::new();
        osm.insert("amenity".into(), "hospital".into());
        let spec = TagQuerySpec::new().with("amenity", TagRule::Exact("hospital".into()));
        assert!(spec.feature_matches(&osm));
    }

    #[test]
    fn test_from_json() {
        let spec = TagQuerySpec::from_json(
            r#"{"amenity": ["school", "hospital"], "shop": true, "office": null,
                "level": 2, "name": "Gare"}"#,
        )
        .unwrap();
        let rules: BTreeMap<&str, &TagRule> = spec.iter().collect();
        assert_eq!(rules["amenity"], &TagRule::one_of(["school", "hospital"]));
        assert_eq!(rules["shop"], &TagRule::Any);
        assert_eq!(rules["office"], &TagRule::Any);
        assert_eq!(rules["level"], &TagRule::Exact("2".into()));
        assert_eq!(rules["name"], &TagRule::Exact("Gare".into()));
    }

    #[test]
    fn test_from_json_rejects_false() {
        let err = TagQuerySpec::from_json(r#"{"amenity": ["school"], "shop": false}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidTagSpec { ref key, .. } if key == "shop"));

        let err = TagQuerySpec::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            tags: TagQuerySpec,
        }
        let w: Wrapper = toml::from_str(
            r#"
            [tags]
            amenity = ["school", "hospital"]
            shop = true
            "#,
        )
        .unwrap();
        assert_eq!(w.tags.len(), 2);
    }

    #[test]
    fn test_cli_form() {
        let spec: TagQuerySpec = "amenity=school,hospital; shop ;tourism=museum".parse().unwrap();
        let rules: Vec<(&str, &TagRule)> = spec.iter().collect();
        assert_eq!(rules[0], ("amenity", &TagRule::one_of(["school", "hospital"])));
        assert_eq!(rules[1], ("shop", &TagRule::Any));
        assert_eq!(rules[2], ("tourism", &TagRule::Exact("museum".into())));
        assert!("=school".parse::<TagQuerySpec>().is_err());
    }

    #[test]
    fn test_from_args_overrides_json() {
        let spec = TagQuerySpec::from_args(
            Some(r#"{"amenity": ["school"], "shop": null}"#),
            &["amenity=hospital", "leisure"],
        )
        .unwrap();
        let rules: Vec<(&str, &TagRule)> = spec.iter().collect();
        assert_eq!(rules.len(), 3);
        assert!(rules.contains(&("amenity", &TagRule::Exact("hospital".into()))));
        assert!(rules.contains(&("leisure", &TagRule::Any)));
    }
}
