//! Service and target types shared across the planner.
//!
//! Both are a name plus an ordered list of string properties, exactly as
//! the upstream model parser hands them over. Nothing here interprets the
//! property values; strategies and the port allocator decide what a
//! property means.

use serde::{Deserialize, Serialize};

/// A named string property attached to a service or a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A deployable service from the services model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// A machine from the infrastructure model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// Lookup helpers common to services and targets.
///
/// The first property with a matching name is authoritative; later
/// duplicates are ignored.
pub trait Properties {
    fn name(&self) -> &str;
    fn properties(&self) -> &[Property];

    fn property(&self, name: &str) -> Option<&str> {
        self.properties()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Parse the property as an integer. Unparseable values count as missing.
    fn numeric_property(&self, name: &str) -> Option<i64> {
        self.property(name).and_then(|v| v.trim().parse().ok())
    }
}

impl Properties for Service {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &[Property] {
        &self.properties
    }
}

impl Properties for Target {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &[Property] {
        &self.properties
    }
}

impl Service {
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

impl Target {
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

/// Find a service by name in the services model.
pub fn find_service<'a>(services: &'a [Service], name: &str) -> Option<&'a Service> {
    services.iter().find(|s| s.name == name)
}
