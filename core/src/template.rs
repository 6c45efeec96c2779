use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata of a template object. Only the fields the index looks at are
/// kept; everything else in the source manifest is dropped on decode.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// A VM template as published by the cluster.
///
/// Labels and annotations are ordered maps, so iterating them is
/// deterministic (ascending by key).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Template {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub metadata: ObjectMeta,
}

impl Template {
    pub const KIND: &'static str = "Template";

    pub fn builder(name: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(name)
    }

    /// Stable identity used as the index key.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    /// Objects without an explicit kind are assumed to be templates.
    pub fn is_template_kind(&self) -> bool {
        self.kind.as_deref().is_none_or(|kind| kind == Self::KIND)
    }
}

#[derive(Clone, Debug)]
pub struct TemplateBuilder {
    template: Template,
}

impl TemplateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            template: Template {
                api_version: Some("template.openshift.io/v1".to_string()),
                kind: Some(Template::KIND.to_string()),
                metadata: ObjectMeta {
                    name: name.into(),
                    ..Default::default()
                },
            },
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.template.metadata.namespace = Some(namespace.into());
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.template
            .metadata
            .labels
            .insert(key.into(), value.into());
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.template
            .metadata
            .annotations
            .insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Template {
        self.template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_openshift_template_json() {
        let raw = r#"{
            "apiVersion": "template.openshift.io/v1",
            "kind": "Template",
            "metadata": {
                "name": "fedora28-generic-tiny",
                "namespace": "openshift",
                "labels": {"os.template.cnv.io/fedora28": "true"},
                "annotations": {"iconClass": "icon-fedora"}
            },
            "objects": [{"kind": "VirtualMachine"}],
            "parameters": []
        }"#;
        let template: Template = serde_json::from_str(raw).unwrap();
        assert_eq!(template.name(), "fedora28-generic-tiny");
        assert_eq!(template.namespace(), Some("openshift"));
        assert_eq!(template.annotation("iconClass"), Some("icon-fedora"));
        assert_eq!(
            template.labels().get("os.template.cnv.io/fedora28"),
            Some(&"true".to_string())
        );
        assert!(template.is_template_kind());
    }

    #[test]
    fn missing_kind_counts_as_template() {
        let template: Template = serde_json::from_str(r#"{"metadata": {"name": "t"}}"#).unwrap();
        assert!(template.is_template_kind());

        let other: Template =
            serde_json::from_str(r#"{"kind": "ConfigMap", "metadata": {"name": "c"}}"#).unwrap();
        assert!(!other.is_template_kind());
    }
}
