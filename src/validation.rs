use std::collections::HashSet;

use serde::Serialize;

use crate::config::HarnessConfig;

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

pub fn validate_config(config: &HarnessConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    let required = [
        ("project.name", config.project.name.as_str()),
        ("compiler.program", config.compiler.program.as_str()),
        ("compiler.target", config.compiler.target.as_str()),
        ("compiler.profile", config.compiler.profile.as_str()),
        ("artifact.extension", config.artifact.extension.as_str()),
        ("bindgen.program", config.bindgen.program.as_str()),
        ("bindgen.target", config.bindgen.target.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            report.errors.push(format!("{field} cannot be empty"));
        }
    }

    if config.bindgen.out_dir.as_os_str().is_empty() {
        report
            .errors
            .push("bindgen.out_dir cannot be empty".into());
    }

    if config.compiler.flags.is_empty() != config.compiler.flags_env.is_empty() {
        report.warnings.push(
            "compiler.flags and compiler.flags_env must both be set for flags to be passed".into(),
        );
    }

    if !config.project.root.is_dir() {
        report.warnings.push(format!(
            "Project root '{}' does not exist; the compiler cannot be started there",
            config.project.root.display()
        ));
    }

    report.merge(validate_rules(config));
    report
}

fn validate_rules(config: &HarnessConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen = HashSet::new();
    for (idx, rule) in config.rules.iter().enumerate() {
        if rule.pattern.is_empty() {
            report
                .errors
                .push(format!("Rule {} has an empty pattern", idx + 1));
            continue;
        }
        if rule.tag.trim().is_empty() {
            report
                .errors
                .push(format!("Rule {} ('{}') has an empty tag", idx + 1, rule.pattern));
        }
        if !seen.insert(rule.pattern.as_str()) {
            report.warnings.push(format!(
                "Rule {} repeats pattern '{}' and will never match",
                idx + 1,
                rule.pattern
            ));
        }
    }
    report
}
