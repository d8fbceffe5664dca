use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classify::{DefectRule, default_rules};
use crate::report::{ChecklistItem, default_checklist};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub project: ProjectSpec,
    pub compiler: CompilerSpec,
    pub artifact: ArtifactSpec,
    pub bindgen: BindgenSpec,
    pub rules: Vec<DefectRule>,
    pub checklist: Vec<ChecklistItem>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            project: ProjectSpec::default(),
            compiler: CompilerSpec::default(),
            artifact: ArtifactSpec::default(),
            bindgen: BindgenSpec::default(),
            rules: default_rules(),
            checklist: default_checklist(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSpec {
    pub name: String,
    pub root: PathBuf,
    /// Cargo output root, relative to `root` unless absolute.
    pub target_dir: PathBuf,
}

impl Default for ProjectSpec {
    fn default() -> Self {
        Self {
            name: "basic".to_string(),
            root: PathBuf::from("."),
            target_dir: PathBuf::from("../target"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSpec {
    pub program: String,
    pub target: String,
    pub profile: String,
    pub flags: String,
    pub flags_env: String,
}

impl Default for CompilerSpec {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            target: "wasm32-unknown-unknown".to_string(),
            profile: "release".to_string(),
            flags: "-C target-feature=-multivalue,-reference-types".to_string(),
            flags_env: "RUSTFLAGS".to_string(),
        }
    }
}

impl CompilerSpec {
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--target".to_string(),
            self.target.clone(),
        ];
        match self.profile.as_str() {
            "dev" | "debug" => {}
            "release" => args.push("--release".to_string()),
            other => {
                args.push("--profile".to_string());
                args.push(other.to_string());
            }
        }
        args
    }

    pub fn flags_var(&self) -> Option<(&str, &str)> {
        if self.flags.is_empty() || self.flags_env.is_empty() {
            None
        } else {
            Some((self.flags_env.as_str(), self.flags.as_str()))
        }
    }

    pub fn profile_dir(&self) -> &str {
        match self.profile.as_str() {
            "dev" | "debug" => "debug",
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSpec {
    pub extension: String,
}

impl Default for ArtifactSpec {
    fn default() -> Self {
        Self {
            extension: "wasm".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BindgenSpec {
    pub program: String,
    pub target: String,
    pub out_dir: PathBuf,
    pub extra_args: Vec<String>,
}

impl Default for BindgenSpec {
    fn default() -> Self {
        Self {
            program: "wasm-bindgen".to_string(),
            target: "web".to_string(),
            out_dir: PathBuf::from("pkg"),
            extra_args: vec!["--no-typescript".to_string()],
        }
    }
}

impl BindgenSpec {
    pub fn build_args(&self, artifact: &Path) -> Vec<String> {
        let mut args = vec![
            "--target".to_string(),
            self.target.clone(),
            "--out-dir".to_string(),
            self.out_dir.to_string_lossy().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(artifact.to_string_lossy().to_string());
        args
    }
}

impl HarnessConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: HarnessConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML: {}", path.display()))?;

        if config.project.root.is_relative()
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            config.project.root = parent.join(&config.project.root);
        }

        Ok(config)
    }

    pub fn save(&self, destination: &Path) -> Result<()> {
        let rendered = serde_yaml::to_string(self)?;
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(destination, rendered)
            .with_context(|| format!("Failed to write config: {}", destination.display()))?;
        Ok(())
    }

    pub fn project_root(&self) -> &Path {
        &self.project.root
    }

    /// Cargo replaces dashes in the crate name with underscores.
    pub fn artifact_file_name(&self) -> String {
        format!(
            "{}.{}",
            self.project.name.replace('-', "_"),
            self.artifact.extension
        )
    }

    pub fn artifact_relative_path(&self) -> PathBuf {
        self.project
            .target_dir
            .join(&self.compiler.target)
            .join(self.compiler.profile_dir())
            .join(self.artifact_file_name())
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.project.root.join(self.artifact_relative_path())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.project.root.join(&self.bindgen.out_dir)
    }
}
