//! Read-only resources addressed by URI
//!
//! A resource is either registered under a fixed URI or matched by a URI
//! template such as `todos://{filter}`. Exact URIs win over templates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{not_found, McpResult};
use crate::registry::RegistryError;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

impl ResourceContents {
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: text.into(),
        }
    }

    pub fn json(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("application/json".to_string()),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDescriptor {
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Produces the contents of a resource.
///
/// `vars` holds the template variables bound while matching; it is empty for
/// fixed URIs.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn read(&self, uri: &str, vars: HashMap<String, String>)
        -> McpResult<Vec<ResourceContents>>;
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// Level-1 URI template: literal text with `{name}` placeholders.
///
/// A variable matches one or more characters up to the next literal and
/// never spans a `/`.
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::Invalid {
            kind: "resource template",
            name: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| invalid("unclosed `{`"))?;
            let name = &rest[open + 1..close];
            if name.is_empty() {
                return Err(invalid("empty variable name"));
            }
            if matches!(segments.last(), Some(Segment::Variable(_))) {
                return Err(invalid("adjacent variables"));
            }
            segments.push(Segment::Variable(name.to_string()));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut vars = HashMap::new();
        let mut rest = uri;
        let mut segments = self.segments.iter().peekable();

        while let Some(segment) = segments.next() {
            match segment {
                Segment::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str())?;
                }
                Segment::Variable(name) => {
                    let end = match segments.peek() {
                        Some(Segment::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let value = &rest[..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    vars.insert(name.clone(), value.to_string());
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(vars)
    }
}

struct FixedResource {
    descriptor: ResourceDescriptor,
    reader: Arc<dyn ResourceReader>,
}

struct TemplateResource {
    descriptor: ResourceTemplateDescriptor,
    template: UriTemplate,
    reader: Arc<dyn ResourceReader>,
}

#[derive(Default)]
pub struct ResourceRegistry {
    resources: Vec<FixedResource>,
    templates: Vec<TemplateResource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(
        &mut self,
        descriptor: ResourceDescriptor,
        reader: Arc<dyn ResourceReader>,
    ) -> Result<(), RegistryError> {
        if self.resources.iter().any(|r| r.descriptor.uri == descriptor.uri) {
            return Err(RegistryError::Duplicate {
                kind: "resource",
                name: descriptor.uri,
            });
        }
        self.resources.push(FixedResource { descriptor, reader });
        Ok(())
    }

    pub fn register_template(
        &mut self,
        descriptor: ResourceTemplateDescriptor,
        reader: Arc<dyn ResourceReader>,
    ) -> Result<(), RegistryError> {
        if self
            .templates
            .iter()
            .any(|t| t.descriptor.uri_template == descriptor.uri_template)
        {
            return Err(RegistryError::Duplicate {
                kind: "resource template",
                name: descriptor.uri_template,
            });
        }
        let template = UriTemplate::parse(&descriptor.uri_template)?;
        self.templates.push(TemplateResource {
            descriptor,
            template,
            reader,
        });
        Ok(())
    }

    pub fn list(&self) -> Vec<ResourceDescriptor> {
        self.resources.iter().map(|r| r.descriptor.clone()).collect()
    }

    pub fn list_templates(&self) -> Vec<ResourceTemplateDescriptor> {
        self.templates.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub async fn read(&self, uri: &str) -> McpResult<Vec<ResourceContents>> {
        if let Some(resource) = self.resources.iter().find(|r| r.descriptor.uri == uri) {
            return resource.reader.read(uri, HashMap::new()).await;
        }
        for entry in &self.templates {
            if let Some(vars) = entry.template.matches(uri) {
                return entry.reader.read(uri, vars).await;
            }
        }
        Err(not_found(format!("Resource not found: {}", uri)))
    }
}
