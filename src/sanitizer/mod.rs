pub mod signatures;

pub use signatures::SignatureList;

use crate::config::FrameworkConfig;
use crate::host::{CleanupCommand, SceneHost};
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static JOB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*:").expect("job id pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    ProcedureEntered(String),
    AfterSceneRead,
    BeforeSave,
    BeforeExport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub procedures_overridden: usize,
    pub jobs_scheduled: usize,
    pub nodes_deleted: usize,
    pub nodes_scheduled: usize,
    pub files_removed: usize,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.procedures_overridden += other.procedures_overridden;
        self.jobs_scheduled += other.jobs_scheduled;
        self.nodes_deleted += other.nodes_deleted;
        self.nodes_scheduled += other.nodes_scheduled;
        self.files_removed += other.files_removed;
    }

    pub fn is_clean(&self) -> bool {
        *self == SweepReport::default()
    }
}

pub struct Sanitizer {
    signatures: SignatureList,
}

impl Sanitizer {
    pub fn new(signatures: SignatureList) -> Self {
        Self { signatures }
    }

    pub fn from_config(config: &FrameworkConfig) -> Result<Self> {
        Ok(Self::new(SignatureList::load(config.signatures.as_deref())?))
    }

    pub fn signatures(&self) -> &SignatureList {
        &self.signatures
    }

    pub fn handle_event(&self, event: &SceneEvent, scene: &mut dyn SceneHost) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        match event {
            SceneEvent::ProcedureEntered(name) if !self.signatures.is_listed_procedure(name) => {
                return Ok(report);
            }
            SceneEvent::ProcedureEntered(_) | SceneEvent::AfterSceneRead => {
                report.procedures_overridden = self.override_procedures(scene)?;
                report.jobs_scheduled = self.kill_script_jobs(scene)?;
                report.merge(self.purge_script_nodes(scene)?);
            }
            SceneEvent::BeforeSave | SceneEvent::BeforeExport => {
                report.jobs_scheduled = self.kill_script_jobs(scene)?;
                report.merge(self.purge_script_nodes(scene)?);
            }
        }

        if !report.is_clean() {
            log::info!("Scene sweep after {:?}: {:?}", event, report);
        }
        Ok(report)
    }

    pub fn override_procedures(&self, scene: &mut dyn SceneHost) -> Result<usize> {
        let mut overridden = 0;
        for name in &self.signatures.procedures {
            if scene.procedure_defined(name) {
                scene.define_empty_procedure(name)?;
                overridden += 1;
            }
        }
        if overridden > 0 {
            log::info!("Overrode {} injected procedure(s)", overridden);
        }
        Ok(overridden)
    }

    pub fn kill_script_jobs(&self, scene: &mut dyn SceneHost) -> Result<usize> {
        let mut scheduled = 0;
        for listing in scene.script_jobs()? {
            if !self.signatures.job_matches(&listing) {
                continue;
            }
            match parse_job_id(&listing) {
                Some(id) => {
                    scene.defer(CleanupCommand::KillScriptJob(id));
                    scheduled += 1;
                }
                None => log::warn!("Could not read job id from listing: {}", listing),
            }
        }
        Ok(scheduled)
    }

    pub fn purge_script_nodes(&self, scene: &mut dyn SceneHost) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for node in scene.script_nodes()? {
            if self.signatures.is_infected_node(&node) {
                match delete_now(scene, &node) {
                    Ok(()) => {
                        log::info!("Deleted infected script node: {}", node);
                        report.nodes_deleted += 1;
                    }
                    Err(e) => log::warn!("Failed to delete script node {}: {:#}", node, e),
                }
                if let Some(dir) = scene.user_scripts_dir() {
                    report.files_removed += self.remove_dropped_files(&dir);
                }
                continue;
            }

            let body = match scene.script_node_body(&node) {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Failed to read script node {}: {:#}", node, e);
                    continue;
                }
            };

            let matched = self
                .signatures
                .script_nodes
                .body_rules
                .iter()
                .any(|rule| rule.matches(&node, &body));
            if !matched {
                continue;
            }

            if let Err(e) = scene.set_script_node_body(&node, "") {
                log::warn!("Failed to clear script node {}: {:#}", node, e);
                continue;
            }
            scene.defer(CleanupCommand::DeleteScriptNode(node.clone()));
            log::info!("Cleared payload from script node: {}", node);
            report.nodes_scheduled += 1;
        }

        Ok(report)
    }

    /// Runs a deferred cleanup. Returns `false` if the target is already gone.
    pub fn execute(&self, command: &CleanupCommand, scene: &mut dyn SceneHost) -> Result<bool> {
        match command {
            CleanupCommand::DeleteScriptNode(node) => {
                if !scene.node_exists(node) {
                    return Ok(false);
                }
                scene.delete_node(node)?;
                log::info!("Deleted script node: {}", node);
            }
            CleanupCommand::KillScriptJob(id) => {
                if !scene.script_job_exists(*id) {
                    return Ok(false);
                }
                scene.kill_script_job(*id)?;
                log::info!("Killed script job: {}", id);
            }
        }
        Ok(true)
    }

    fn remove_dropped_files(&self, dir: &Path) -> usize {
        let mut removed = 0;
        for name in &self.signatures.script_nodes.dropped_files {
            let path = dir.join(name);
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Removed dropped file: {:?}", path);
                    removed += 1;
                }
                Err(e) => log::warn!("Failed to remove {:?}: {}", path, e),
            }
        }
        removed
    }
}

fn delete_now(scene: &mut dyn SceneHost, node: &str) -> Result<()> {
    scene.unlock_node(node)?;
    scene.delete_node(node)
}

fn parse_job_id(listing: &str) -> Option<u32> {
    JOB_ID
        .captures(listing)
        .and_then(|caps| caps[1].parse().ok())
}
