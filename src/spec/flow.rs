//! The outer flow document stored in a program bundle.
//!
//! A flow names its flowlets, how many instances of each to start, and the
//! directed connections between them. Flowlet entries are decoded with the
//! flowlet codec; their errors are reported with the full key path, e.g.
//! `flowlets.counter.flowletSpec.name`.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use super::codec::{
    SpecificationCodec, as_object, nested, required, required_positive, required_str,
};
use super::flowlet::FlowletSpecification;
use crate::error::DeserializationError;

/// A flowlet placed in a flow with its configured instance count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowletDefinition {
    pub flowlet_spec: FlowletSpecification,
    pub instances: u32,
}

/// A directed edge from one flowlet's output to another's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowletConnection {
    pub source_name: String,
    pub target_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSpecification {
    pub class_name: String,
    pub name: String,
    pub description: String,
    pub flowlets: BTreeMap<String, FlowletDefinition>,
    pub connections: Vec<FlowletConnection>,
}

impl FlowletDefinition {
    fn to_value(&self) -> Value {
        json!({
            "flowletSpec": self.flowlet_spec.to_value(),
            "instances": self.instances,
        })
    }

    fn from_value(value: &Value) -> Result<Self, DeserializationError> {
        let obj = as_object(value, "<flowlet definition>")?;
        let flowlet_spec = FlowletSpecification::from_value(required(obj, "flowletSpec")?)
            .map_err(|e| nested("flowletSpec", e))?;
        let instances = required_positive(obj, "instances")?;
        if instances > flowlet_spec.max_instances {
            return Err(DeserializationError::new(
                "instances",
                format!(
                    "{instances} exceeds maxInstances {}",
                    flowlet_spec.max_instances
                ),
            ));
        }
        Ok(Self {
            flowlet_spec,
            instances,
        })
    }
}

impl SpecificationCodec for FlowSpecification {
    fn to_value(&self) -> Value {
        let flowlets: Map<String, Value> = self
            .flowlets
            .iter()
            .map(|(name, def)| (name.clone(), def.to_value()))
            .collect();
        let connections: Vec<Value> = self
            .connections
            .iter()
            .map(|c| json!({ "sourceName": c.source_name, "targetName": c.target_name }))
            .collect();
        json!({
            "className": self.class_name,
            "name": self.name,
            "description": self.description,
            "flowlets": flowlets,
            "connections": connections,
        })
    }

    fn from_value(value: &Value) -> Result<Self, DeserializationError> {
        let obj = as_object(value, "<flow>")?;

        let class_name = required_str(obj, "className")?;
        let name = required_str(obj, "name")?;
        let description = required_str(obj, "description")?;

        let mut flowlets = BTreeMap::new();
        for (key, entry) in as_object(required(obj, "flowlets")?, "flowlets")? {
            let def = FlowletDefinition::from_value(entry)
                .map_err(|e| nested(&format!("flowlets.{key}"), e))?;
            flowlets.insert(key.clone(), def);
        }

        let raw_connections = required(obj, "connections")?
            .as_array()
            .ok_or_else(|| DeserializationError::new("connections", "expected an array"))?;
        let mut connections = Vec::with_capacity(raw_connections.len());
        for (i, entry) in raw_connections.iter().enumerate() {
            let path = format!("connections[{i}]");
            let conn = as_object(entry, &path)?;
            let source_name =
                required_str(conn, "sourceName").map_err(|e| nested(&path, e))?;
            let target_name =
                required_str(conn, "targetName").map_err(|e| nested(&path, e))?;
            for endpoint in [&source_name, &target_name] {
                if !flowlets.contains_key(endpoint) {
                    return Err(DeserializationError::new(
                        path,
                        format!("unknown flowlet {endpoint:?}"),
                    ));
                }
            }
            connections.push(FlowletConnection {
                source_name,
                target_name,
            });
        }

        Ok(Self {
            class_name,
            name,
            description,
            flowlets,
            connections,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::flow;
    use super::*;

    #[test]
    fn roundtrip() {
        let spec = flow();
        assert_eq!(FlowSpecification::from_json(&spec.to_json()).unwrap(), spec);
    }

    #[test]
    fn nested_flowlet_error_has_full_path() {
        let mut value = flow().to_value();
        value["flowlets"]["counter"]["flowletSpec"]
            .as_object_mut()
            .unwrap()
            .remove("name");
        let err = FlowSpecification::from_value(&value).unwrap_err();
        assert_eq!(err.field, "flowlets.counter.flowletSpec.name");
    }

    #[test]
    fn connection_to_unknown_flowlet_is_rejected() {
        let mut value = flow().to_value();
        value["connections"][0]["targetName"] = json!("sink");
        let err = FlowSpecification::from_value(&value).unwrap_err();
        assert_eq!(err.field, "connections[0]");
        assert!(err.reason.contains("sink"));
    }

    #[test]
    fn instances_above_max_are_rejected() {
        let mut value = flow().to_value();
        value["flowlets"]["reader"]["instances"] = json!(5);
        let err = FlowSpecification::from_value(&value).unwrap_err();
        assert_eq!(err.field, "flowlets.reader.instances");
    }

    #[test]
    fn missing_connections_is_rejected() {
        let mut value = flow().to_value();
        value.as_object_mut().unwrap().remove("connections");
        let err = FlowSpecification::from_value(&value).unwrap_err();
        assert_eq!(err.field, "connections");
    }
}
