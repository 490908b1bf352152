use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::error::PromptError;

/// Value substituted for any placeholder without a usable variable.
pub const FALLBACK_VALUE: &str = "Not specified";

/// Upper bound on stages probed when loading a prompt directory.
const MAX_STAGES: usize = 2;

/// A system instruction paired with the prompt template for one model call.
///
/// Built once and then only read; the builder methods consume `self`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptSpec {
    system_instruction: String,
    prompt_template: String,
    template_variables: HashMap<String, String>,
}

impl PromptSpec {
    pub fn new(system_instruction: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            prompt_template: prompt_template.into(),
            template_variables: HashMap::new(),
        }
    }

    /// Reads the instruction and template from two text files.
    pub fn from_files(
        system_instruction_path: impl AsRef<Path>,
        prompt_path: impl AsRef<Path>,
    ) -> Result<Self, PromptError> {
        Ok(Self::new(
            read_prompt_file(system_instruction_path.as_ref())?,
            read_prompt_file(prompt_path.as_ref())?,
        ))
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_variables.insert(name.into(), value.into());
        self
    }

    pub fn with_variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.template_variables
            .extend(variables.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn prompt_template(&self) -> &str {
        &self.prompt_template
    }

    pub fn template_variables(&self) -> &HashMap<String, String> {
        &self.template_variables
    }

    /// The prompt text with every placeholder resolved.
    pub fn resolve_prompt(&self) -> String {
        resolve_template(&self.prompt_template, &self.template_variables)
    }
}

/// Substitutes `{name}` placeholders from `variables`.
///
/// Missing or blank variables become [`FALLBACK_VALUE`]. `{{` and `}}` emit a
/// literal brace. Braces around anything that is not an identifier are copied
/// through, so JSON snippets in a template survive untouched.
pub fn resolve_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find(['{', '}']) {
        resolved.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if let Some(after) = tail.strip_prefix("{{") {
            resolved.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix("}}") {
            resolved.push('}');
            rest = after;
            continue;
        }

        if let Some(inner) = tail.strip_prefix('{') {
            if let Some(end) = inner.find('}') {
                let name = &inner[..end];
                if is_identifier(name) {
                    let value = variables
                        .get(name)
                        .map(String::as_str)
                        .filter(|value| !value.trim().is_empty())
                        .unwrap_or(FALLBACK_VALUE);
                    resolved.push_str(value);
                    rest = &inner[end + 1..];
                    continue;
                }
            }
        }

        // lone brace, both '{' and '}' are one byte
        resolved.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    resolved.push_str(rest);
    resolved
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn read_prompt_file(path: &Path) -> Result<String, PromptError> {
    std::fs::read_to_string(path).map_err(|source| PromptError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// The ordered prompt stages served by one deployment.
///
/// A prompt directory holds `system_instructions{N}.txt` and `prompt{N}.txt`
/// for each 1-based stage `N`. Stage 1 must exist; later stages are picked up
/// while both of their files are present.
#[derive(Clone, Debug)]
pub struct PromptSet {
    stages: Vec<PromptSpec>,
}

impl PromptSet {
    pub fn new(stages: Vec<PromptSpec>) -> Self {
        Self { stages }
    }

    pub fn load(dir: impl AsRef<Path>) -> Result<Self, PromptError> {
        let dir = dir.as_ref();
        let mut stages = Vec::new();

        for n in 1..=MAX_STAGES {
            let (system_path, prompt_path) = stage_paths(dir, n);
            if n > 1 && !(system_path.is_file() && prompt_path.is_file()) {
                break;
            }
            stages.push(PromptSpec::from_files(&system_path, &prompt_path)?);
        }

        log::debug!("Loaded {} prompt stage(s) from {}", stages.len(), dir.display());
        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[PromptSpec] {
        &self.stages
    }

    /// Copies of every stage carrying `variables` for template resolution.
    pub fn bind(&self, variables: &HashMap<String, String>) -> Vec<PromptSpec> {
        self.stages
            .iter()
            .map(|stage| stage.clone().with_variables(variables.clone()))
            .collect()
    }
}

fn stage_paths(dir: &Path, n: usize) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("system_instructions{n}.txt")),
        dir.join(format!("prompt{n}.txt")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unresolved_placeholders_use_fallback() {
        let spec = PromptSpec::new("sys", "Vehicle: {vehicle_type}, Date: {date}");
        assert_eq!(
            spec.resolve_prompt(),
            "Vehicle: Not specified, Date: Not specified"
        );
    }

    #[test]
    fn resolves_known_variables_and_blank_ones_fall_back() {
        let resolved = resolve_template(
            "{vehicle_type} at {time} on {date}",
            &vars(&[("vehicle_type", "truck"), ("time", "  "), ("date", "2025-06-01")]),
        );
        assert_eq!(resolved, "truck at Not specified on 2025-06-01");
    }

    #[test]
    fn json_braces_and_escapes_pass_through() {
        let template = r#"Return {"activity": "parking"} for {{vehicle_type}} = {vehicle_type}"#;
        let resolved = resolve_template(template, &vars(&[("vehicle_type", "car")]));
        assert_eq!(
            resolved,
            r#"Return {"activity": "parking"} for {vehicle_type} = car"#
        );
    }

    #[test]
    fn unterminated_brace_is_kept() {
        assert_eq!(resolve_template("open { and } close {", &HashMap::new()), "open { and } close {");
    }

    #[test]
    fn loads_one_or_two_stages_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("system_instructions1.txt"), "sys1").unwrap();
        std::fs::write(dir.path().join("prompt1.txt"), "p1").unwrap();

        let set = PromptSet::load(dir.path()).unwrap();
        assert_eq!(set.len(), 1);

        std::fs::write(dir.path().join("system_instructions2.txt"), "sys2").unwrap();
        std::fs::write(dir.path().join("prompt2.txt"), "vehicle {vehicle_type}").unwrap();

        let set = PromptSet::load(dir.path()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.stages()[1].system_instruction(), "sys2");

        let bound = set.bind(&vars(&[("vehicle_type", "bus")]));
        assert_eq!(bound[0].resolve_prompt(), "p1");
        assert_eq!(bound[1].resolve_prompt(), "vehicle bus");
    }

    #[test]
    fn missing_first_stage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, PromptError::Read { .. }));
    }
}
