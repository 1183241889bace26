use crate::assets;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SIGNATURES: &str = "signatures.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SignatureList {
    #[serde(default)]
    pub procedures: Vec<String>,
    #[serde(default)]
    pub script_jobs: JobSignatures,
    #[serde(default)]
    pub script_nodes: NodeSignatures,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct JobSignatures {
    #[serde(default)]
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct NodeSignatures {
    #[serde(default)]
    pub infected_marker: Option<String>,
    #[serde(default)]
    pub dropped_files: Vec<String>,
    #[serde(default)]
    pub body_rules: Vec<BodyRule>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BodyRule {
    pub node: String,
    pub markers: Vec<String>,
}

impl BodyRule {
    pub fn matches(&self, node: &str, body: &str) -> bool {
        node.contains(&self.node) && self.markers.iter().any(|m| body.contains(m.as_str()))
    }
}

impl SignatureList {
    pub fn builtin() -> Result<Self> {
        let content = assets::text(DEFAULT_SIGNATURES)?;
        Self::parse(&content).context("Bundled signature list is invalid")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn is_listed_procedure(&self, name: &str) -> bool {
        self.procedures.iter().any(|p| p == name)
    }

    pub fn job_matches(&self, listing: &str) -> bool {
        self.script_jobs.markers.iter().any(|m| listing.contains(m.as_str()))
    }

    pub fn is_infected_node(&self, node: &str) -> bool {
        self.script_nodes
            .infected_marker
            .as_deref()
            .is_some_and(|marker| !marker.is_empty() && node.contains(marker))
    }
}
