#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use buildcheck::config::HarnessConfig;
use buildcheck::executor::{CommandExecutor, CommandOutput, CommandSpec};
use tempfile::TempDir;

struct FakeResponse {
    output: CommandOutput,
    writes: Vec<(PathBuf, Vec<u8>)>,
}

#[derive(Default)]
pub struct FakeExecutor {
    responses: HashMap<String, FakeResponse>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, program: &str, exit_code: i32, output: &str) -> Self {
        self.responses.insert(
            program.to_string(),
            FakeResponse {
                output: CommandOutput::new(exit_code, output),
                writes: Vec::new(),
            },
        );
        self
    }

    pub fn writes(mut self, program: &str, path: impl AsRef<Path>, contents: &[u8]) -> Self {
        if let Some(response) = self.responses.get_mut(program) {
            response
                .writes
                .push((path.as_ref().to_path_buf(), contents.to_vec()));
        }
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|spec| spec.program.clone())
            .collect()
    }
}

impl CommandExecutor for FakeExecutor {
    fn execute(&self, spec: &CommandSpec) -> CommandOutput {
        self.calls.borrow_mut().push(spec.clone());
        let Some(response) = self.responses.get(&spec.program) else {
            return CommandOutput::new(
                -1,
                format!("Failed to start '{}': No such file or directory", spec.program),
            );
        };
        for (path, contents) in &response.writes {
            let target = spec.current_dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).expect("create fake output directory");
            }
            fs::write(&target, contents).expect("write fake output");
        }
        response.output.clone()
    }
}

pub struct Workspace {
    pub temp: TempDir,
    pub config: HarnessConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("basic");
        fs::create_dir_all(&root).expect("project root");
        let mut config = HarnessConfig::default();
        config.project.root = root;
        Self { temp, config }
    }

    pub fn artifact_relative(&self) -> PathBuf {
        self.config.artifact_relative_path()
    }

    pub fn write_artifact(&self, size: usize) {
        let path = self.config.artifact_path();
        fs::create_dir_all(path.parent().expect("artifact parent")).expect("artifact dir");
        fs::write(path, vec![0u8; size]).expect("artifact");
    }
}
