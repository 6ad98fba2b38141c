use crate::error::{Result, SkillsyncError};
use crate::frontmatter::{self, Frontmatter};
use crate::platform::Platform;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Model name aliases
// ---------------------------------------------------------------------------

/// Claude model aliases to full identifiers, for vscode-family targets.
const MODEL_TO_FULL: &[(&str, &str)] = &[
    ("haiku", "claude-haiku-3-5"),
    ("sonnet", "claude-sonnet-4-5"),
    ("opus", "claude-opus-4-5"),
];

/// Full identifiers (including legacy spellings) back to Claude aliases.
const MODEL_TO_SHORT: &[(&str, &str)] = &[
    ("claude-haiku-3-5", "haiku"),
    ("claude-sonnet-4-5", "sonnet"),
    ("claude-opus-4-5", "opus"),
    ("claude-3-5-haiku", "haiku"),
    ("claude-3-5-sonnet", "sonnet"),
];

/// Tool allowlist injected when a vscode-family target has none.
const DEFAULT_VSCODE_TOOLS: &[&str] = &["read", "edit", "shell", "search"];

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

// ---------------------------------------------------------------------------
// Subagent call syntax
// ---------------------------------------------------------------------------

fn claude_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"Task\(subagent_type="([^"]+)"(?:,\s*prompt="([^"]*)")?\)"#)
            .expect("claude call pattern")
    })
}

fn vscode_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"#runSubagent\s+([A-Za-z0-9_./:-]+)(?:[ \t]+"([^"]*)")?"#)
            .expect("vscode call pattern")
    })
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One direction of format conversion: a frontmatter field mapping plus a
/// body syntax rewrite. Pure data transformations, no I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Same format family; content passes through the split/serialize cycle
    /// unchanged in meaning.
    Identity,
    /// Claude format to the vscode family: explicit tool allowlist, full
    /// model identifiers, `#runSubagent` call syntax.
    ToVscode,
    /// Vscode family to Claude: strip the tool allowlist, short model
    /// aliases, `Task(subagent_type=…)` call syntax.
    ToClaude,
}

impl Strategy {
    fn transform_frontmatter(self, mut fm: Frontmatter) -> Frontmatter {
        match self {
            Strategy::Identity => fm,
            Strategy::ToVscode => {
                if !frontmatter::has_key(&fm, "tools") {
                    let tools: Vec<serde_yaml::Value> = DEFAULT_VSCODE_TOOLS
                        .iter()
                        .map(|t| serde_yaml::Value::String(t.to_string()))
                        .collect();
                    fm.insert("tools".into(), serde_yaml::Value::Sequence(tools));
                }
                remap_model(&mut fm, MODEL_TO_FULL);
                fm
            }
            Strategy::ToClaude => {
                fm.remove("tools");
                remap_model(&mut fm, MODEL_TO_SHORT);
                fm
            }
        }
    }

    fn transform_body(self, body: &str) -> String {
        match self {
            Strategy::Identity => body.to_string(),
            Strategy::ToVscode => claude_call_re()
                .replace_all(body, |caps: &Captures<'_>| match caps.get(2) {
                    Some(prompt) => format!("#runSubagent {} \"{}\"", &caps[1], prompt.as_str()),
                    None => format!("#runSubagent {}", &caps[1]),
                })
                .into_owned(),
            Strategy::ToClaude => vscode_call_re()
                .replace_all(body, |caps: &Captures<'_>| match caps.get(2) {
                    Some(prompt) => format!(
                        "Task(subagent_type=\"{}\", prompt=\"{}\")",
                        &caps[1],
                        prompt.as_str()
                    ),
                    None => format!("Task(subagent_type=\"{}\")", &caps[1]),
                })
                .into_owned(),
        }
    }

    /// Whether a target of this strategy requires frontmatter even when the
    /// source had none.
    fn synthesizes_frontmatter(self) -> bool {
        self == Strategy::ToVscode
    }
}

fn remap_model(fm: &mut Frontmatter, table: &'static [(&'static str, &'static str)]) {
    let mapped = fm
        .get("model")
        .and_then(|v| v.as_str())
        .and_then(|model| lookup(table, model));
    if let Some(model) = mapped {
        fm.insert("model".into(), serde_yaml::Value::String(model.to_string()));
    }
}

// ---------------------------------------------------------------------------
// TransformEngine
// ---------------------------------------------------------------------------

/// Converts item content between platform formats. The (source, target) →
/// strategy table is fixed at construction; an unregistered pair fails
/// loudly rather than passing content through with the wrong format.
pub struct TransformEngine {
    strategies: HashMap<(Platform, Platform), Strategy>,
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformEngine {
    pub fn new() -> Self {
        use Platform::*;
        let mut strategies = HashMap::new();

        // The vscode family shares one format.
        let family = [Vscode, VscodeInsiders, Copilot];
        for source in family {
            for target in family {
                if source != target {
                    strategies.insert((source, target), Strategy::Identity);
                }
            }
        }

        // Codex consumes the claude format (name-keyed markdown).
        strategies.insert((Claude, Codex), Strategy::Identity);
        strategies.insert((Codex, Claude), Strategy::Identity);

        for target in family {
            strategies.insert((Claude, target), Strategy::ToVscode);
            strategies.insert((target, Claude), Strategy::ToClaude);
        }

        Self { strategies }
    }

    /// Transform content from one platform format to another.
    ///
    /// Same source and target is the identity: the exact input comes back,
    /// no parsing, no side effects.
    pub fn transform(&self, content: &str, source: Platform, target: Platform) -> Result<String> {
        if source == target {
            return Ok(content.to_string());
        }

        let strategy = self.strategies.get(&(source, target)).copied().ok_or(
            SkillsyncError::UnsupportedTransform {
                from: source.to_string(),
                target: target.to_string(),
            },
        )?;

        let (fm, body) = frontmatter::parse_lenient(content);
        if fm.is_empty() && !strategy.synthesizes_frontmatter() {
            // Nothing to rewrite in the header; convert the body alone.
            return Ok(strategy.transform_body(body));
        }

        let fm = strategy.transform_frontmatter(fm);
        let body = strategy.transform_body(body);
        Ok(frontmatter::serialize(&fm, &body))
    }

    /// Best-effort detection of the platform format of content. Used to
    /// infer an item's source format when discovery did not tag one.
    pub fn detect_platform(&self, content: &str) -> Option<Platform> {
        let (fm, body) = frontmatter::parse_lenient(content);

        if frontmatter::has_key(&fm, "tools") || raw_frontmatter_mentions(content, "tools:") {
            return Some(Platform::Vscode);
        }
        if body.contains("Task(subagent_type=") {
            return Some(Platform::Claude);
        }
        if body.contains("#runSubagent") {
            return Some(Platform::Vscode);
        }
        if frontmatter::has_key(&fm, "name") {
            return Some(Platform::Claude);
        }
        None
    }
}

/// Check the raw frontmatter block for a literal field mention, catching
/// blocks whose YAML does not parse.
fn raw_frontmatter_mentions(content: &str, needle: &str) -> bool {
    if !content.starts_with("---") {
        return false;
    }
    match content[3..].find("---") {
        Some(close) => content[3..3 + close].contains(needle),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::{get_str, parse_strict};

    const CLAUDE_AGENT: &str = "---\nname: analyst\ndescription: digs\nmodel: sonnet\n---\n\nUse Task(subagent_type=\"helper\", prompt=\"dig deeper\") when stuck.\n";

    #[test]
    fn same_platform_is_exact_identity() {
        let engine = TransformEngine::new();
        for p in Platform::all() {
            assert_eq!(
                engine.transform(CLAUDE_AGENT, *p, *p).unwrap(),
                CLAUDE_AGENT
            );
        }
    }

    #[test]
    fn claude_to_vscode_injects_default_tools() {
        let engine = TransformEngine::new();
        let out = engine
            .transform(CLAUDE_AGENT, Platform::Claude, Platform::Vscode)
            .unwrap();
        let (fm, _) = parse_strict(&out).unwrap();
        let tools = fm
            .get("tools")
            .and_then(|v| v.as_sequence())
            .unwrap();
        assert_eq!(tools.len(), 4);
        assert!(out.contains("tools:"));
    }

    #[test]
    fn claude_to_vscode_preserves_existing_tools() {
        let engine = TransformEngine::new();
        let content = "---\nname: a\ntools:\n- read\n---\nbody\n";
        let out = engine
            .transform(content, Platform::Claude, Platform::Copilot)
            .unwrap();
        let (fm, _) = parse_strict(&out).unwrap();
        let tools = fm
            .get("tools")
            .and_then(|v| v.as_sequence())
            .unwrap();
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn model_alias_mapped_both_directions() {
        let engine = TransformEngine::new();
        let out = engine
            .transform(CLAUDE_AGENT, Platform::Claude, Platform::Vscode)
            .unwrap();
        let (fm, _) = parse_strict(&out).unwrap();
        assert_eq!(get_str(&fm, "model"), Some("claude-sonnet-4-5"));

        let back = engine
            .transform(&out, Platform::Vscode, Platform::Claude)
            .unwrap();
        let (fm, _) = parse_strict(&back).unwrap();
        assert_eq!(get_str(&fm, "model"), Some("sonnet"));
        assert!(!frontmatter::has_key(&fm, "tools"));
    }

    #[test]
    fn legacy_model_names_map_to_aliases() {
        let engine = TransformEngine::new();
        let content = "---\nname: a\nmodel: claude-3-5-sonnet\ntools:\n- read\n---\nbody\n";
        let out = engine
            .transform(content, Platform::Vscode, Platform::Claude)
            .unwrap();
        let (fm, _) = parse_strict(&out).unwrap();
        assert_eq!(get_str(&fm, "model"), Some("sonnet"));
    }

    #[test]
    fn subagent_call_syntax_rewritten_with_prompt_preserved() {
        let engine = TransformEngine::new();
        let out = engine
            .transform(CLAUDE_AGENT, Platform::Claude, Platform::Vscode)
            .unwrap();
        assert!(out.contains("#runSubagent helper \"dig deeper\""));
        assert!(!out.contains("Task(subagent_type="));

        let back = engine
            .transform(&out, Platform::Vscode, Platform::Claude)
            .unwrap();
        assert!(back.contains("Task(subagent_type=\"helper\", prompt=\"dig deeper\")"));
    }

    #[test]
    fn subagent_call_without_prompt() {
        let engine = TransformEngine::new();
        let out = engine
            .transform(
                "---\nname: a\n---\nCall Task(subagent_type=\"scout\") first.\n",
                Platform::Claude,
                Platform::Vscode,
            )
            .unwrap();
        assert!(out.contains("#runSubagent scout first."));
    }

    #[test]
    fn missing_frontmatter_synthesized_for_vscode_target() {
        let engine = TransformEngine::new();
        let out = engine
            .transform("Just a body.\n", Platform::Claude, Platform::Vscode)
            .unwrap();
        assert!(out.starts_with("---\n"));
        assert!(out.contains("tools:"));
        assert!(out.contains("Just a body."));
    }

    #[test]
    fn missing_frontmatter_passes_body_to_claude_target() {
        let engine = TransformEngine::new();
        let out = engine
            .transform("Call #runSubagent scout now.\n", Platform::Vscode, Platform::Claude)
            .unwrap();
        assert!(!out.starts_with("---"));
        assert!(out.contains("Task(subagent_type=\"scout\")"));
    }

    #[test]
    fn unregistered_pair_fails_loudly() {
        let engine = TransformEngine::new();
        let err = engine
            .transform("x", Platform::Codex, Platform::Vscode)
            .unwrap_err();
        assert!(matches!(err, SkillsyncError::UnsupportedTransform { .. }));
    }

    #[test]
    fn vscode_family_is_identity() {
        let engine = TransformEngine::new();
        let content = "---\nname: a\ntools:\n- read\n---\nbody\n";
        let out = engine
            .transform(content, Platform::Vscode, Platform::VscodeInsiders)
            .unwrap();
        let (fm, body) = parse_strict(&out).unwrap();
        assert!(frontmatter::has_key(&fm, "tools"));
        assert_eq!(body, "body\n");
    }

    #[test]
    fn detect_platform_rules() {
        let engine = TransformEngine::new();
        assert_eq!(
            engine.detect_platform("---\ntools:\n- read\n---\nx"),
            Some(Platform::Vscode)
        );
        assert_eq!(
            engine.detect_platform("---\nname: a\n---\nTask(subagent_type=\"x\")"),
            Some(Platform::Claude)
        );
        assert_eq!(
            engine.detect_platform("no frontmatter, uses #runSubagent scout"),
            Some(Platform::Vscode)
        );
        assert_eq!(
            engine.detect_platform("---\nname: a\n---\nplain"),
            Some(Platform::Claude)
        );
        assert_eq!(engine.detect_platform("plain text"), None);
    }
}
