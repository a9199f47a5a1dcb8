use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::codec::{
    SpecificationCodec, as_object, required, required_as, required_positive, required_str,
};
use crate::error::DeserializationError;

/// How a flowlet reacts when processing an input fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePolicy {
    /// Re-deliver the input.
    Retry,
    /// Drop the input and move on.
    Ignore,
}

impl FailurePolicy {
    const NAMES: &'static [(&'static str, FailurePolicy)] = &[
        ("RETRY", FailurePolicy::Retry),
        ("IGNORE", FailurePolicy::Ignore),
    ];

    /// The serialized name of this policy.
    pub fn name(self) -> &'static str {
        match self {
            FailurePolicy::Retry => "RETRY",
            FailurePolicy::Ignore => "IGNORE",
        }
    }

    /// Looks up a policy by its exact serialized name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, policy)| *policy)
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Container sizing requested for each flowlet instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpecification {
    #[serde(rename = "virtualCores")]
    pub virtual_cores: u32,
    #[serde(rename = "memoryMB")]
    pub memory_mb: u32,
}

/// Declarative description of a single flowlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowletSpecification {
    pub class_name: String,
    pub name: String,
    pub description: String,
    pub failure_policy: FailurePolicy,
    pub properties: BTreeMap<String, String>,
    pub resources: ResourceSpecification,
    pub max_instances: u32,
}

impl SpecificationCodec for FlowletSpecification {
    fn to_value(&self) -> Value {
        json!({
            "className": self.class_name,
            "name": self.name,
            "description": self.description,
            "failurePolicy": self.failure_policy.name(),
            "properties": self.properties,
            "resources": self.resources,
            "maxInstances": self.max_instances,
        })
    }

    fn from_value(value: &Value) -> Result<Self, DeserializationError> {
        let obj = as_object(value, "<flowlet>")?;

        let class_name = required_str(obj, "className")?;
        let name = required_str(obj, "name")?;
        let description = required_str(obj, "description")?;

        let policy_name = required(obj, "failurePolicy")?
            .as_str()
            .ok_or_else(|| DeserializationError::new("failurePolicy", "expected a string"))?;
        let failure_policy = FailurePolicy::from_name(policy_name).ok_or_else(|| {
            DeserializationError::new(
                "failurePolicy",
                format!("unknown failure policy {policy_name:?}"),
            )
        })?;

        let properties = required_as::<BTreeMap<String, String>>(obj, "properties")?;
        let resources = required_as::<ResourceSpecification>(obj, "resources")?;
        let max_instances = required_positive(obj, "maxInstances")?;

        Ok(Self {
            class_name,
            name,
            description,
            failure_policy,
            properties,
            resources,
            max_instances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlowletSpecification {
        let mut properties = BTreeMap::new();
        properties.insert("window".to_string(), "10s".to_string());
        properties.insert("threshold".to_string(), "".to_string());
        properties.insert("label with spaces".to_string(), "ünïcode".to_string());
        FlowletSpecification {
            class_name: "com.acme.flow.Counter".into(),
            name: "counter".into(),
            description: "Counts packets per source".into(),
            failure_policy: FailurePolicy::Ignore,
            properties,
            resources: ResourceSpecification {
                virtual_cores: 2,
                memory_mb: 1024,
            },
            max_instances: 8,
        }
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let spec = sample();
        let decoded = FlowletSpecification::from_json(&spec.to_json()).unwrap();
        assert_eq!(decoded, spec);
        assert_eq!(decoded.failure_policy, FailurePolicy::Ignore);
        assert_eq!(decoded.properties.len(), 3);
    }

    #[test]
    fn serialized_keys_and_policy_name() {
        let value = sample().to_value();
        assert_eq!(value["className"], "com.acme.flow.Counter");
        assert_eq!(value["failurePolicy"], "IGNORE");
        assert_eq!(value["resources"]["memoryMB"], 1024);
        assert_eq!(value["resources"]["virtualCores"], 2);
        assert_eq!(value["maxInstances"], 8);
        assert_eq!(value["properties"]["window"], "10s");
    }

    #[test]
    fn each_missing_key_is_rejected() {
        let keys = [
            "className",
            "name",
            "description",
            "failurePolicy",
            "properties",
            "resources",
            "maxInstances",
        ];
        for key in keys {
            let mut value = sample().to_value();
            value.as_object_mut().unwrap().remove(key);
            let err = FlowletSpecification::from_value(&value).unwrap_err();
            assert_eq!(err.field, key, "removing {key}");
        }
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let mut value = sample().to_value();
        value["failurePolicy"] = json!("RESTART");
        let err = FlowletSpecification::from_value(&value).unwrap_err();
        assert_eq!(err.field, "failurePolicy");
        assert!(err.reason.contains("RESTART"));
    }

    #[test]
    fn name_table_matches_names() {
        for (name, policy) in FailurePolicy::NAMES {
            assert_eq!(policy.name(), *name);
        }
    }

    #[test]
    fn policy_names_are_case_sensitive() {
        assert_eq!(FailurePolicy::from_name("RETRY"), Some(FailurePolicy::Retry));
        assert_eq!(FailurePolicy::from_name("retry"), None);
        assert_eq!(FailurePolicy::Ignore.to_string(), "IGNORE");
    }

    #[test]
    fn non_positive_max_instances_is_rejected() {
        let mut value = sample().to_value();
        value["maxInstances"] = json!(0);
        let err = FlowletSpecification::from_value(&value).unwrap_err();
        assert_eq!(err.field, "maxInstances");
    }

    #[test]
    fn non_string_property_value_is_rejected() {
        let mut value = sample().to_value();
        value["properties"] = json!({ "window": 10 });
        let err = FlowletSpecification::from_value(&value).unwrap_err();
        assert_eq!(err.field, "properties");
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut value = sample().to_value();
        value["owner"] = json!("ops");
        assert_eq!(FlowletSpecification::from_value(&value).unwrap(), sample());
    }

    #[test]
    fn malformed_text_is_a_deserialization_error() {
        let err = FlowletSpecification::from_json("{ not json").unwrap_err();
        assert_eq!(err.field, "<document>");
    }
}
