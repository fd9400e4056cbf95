//! Ant project descriptor (`build.xml`) synthesis.
//!
//! Source trees checked out without a `build.xml` get a minimal one that
//! loads the SDK's Ant tasks. The document is generated in memory only;
//! the build step decides when it touches disk.

use crate::config::Config;
use crate::target::Target;
use std::path::Path;

pub const DESCRIPTOR_FILE: &str = "build.xml";

const DEFAULT_TASK: &str = "help";
const ANT_LIBS_ID: &str = "android.antlibs";
const ANT_LIBS_DIR: &str = "${sdk.dir}/tools/lib";
const ANT_LIB_JARS: [&str; 3] = ["anttasks.jar", "sdklib.jar", "androidprefs.jar"];
const SETUP_TASK_NAME: &str = "setup";
const SETUP_TASK_CLASS: &str = "com.android.ant.SetupTask";
const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// In-memory form of a generated `build.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: String,
    pub default_task: String,
    pub properties: Vec<Property>,
    pub classpath_id: String,
    pub classpath: Vec<String>,
    pub task_name: String,
    pub task_class: String,
}

impl ProjectDescriptor {
    pub fn for_target(target: Target, config: &Config) -> Self {
        let mut properties = Vec::with_capacity(3);
        if target == Target::Tests {
            properties.push(Property::new(
                "tested.project.dir",
                config.app_dir().display().to_string(),
            ));
        }
        properties.push(Property::new("target", config.platform_target.as_str()));
        properties.push(Property::new(
            "sdk.dir",
            config.sdk_dir.display().to_string(),
        ));

        Self {
            name: config.project_name(target),
            default_task: DEFAULT_TASK.to_string(),
            properties,
            classpath_id: ANT_LIBS_ID.to_string(),
            classpath: ANT_LIB_JARS
                .iter()
                .map(|jar| format!("{ANT_LIBS_DIR}/{jar}"))
                .collect(),
            task_name: SETUP_TASK_NAME.to_string(),
            task_class: SETUP_TASK_CLASS.to_string(),
        }
    }

    /// Render as a UTF-8 XML document indented by two spaces.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        open_tag(
            &mut out,
            0,
            "project",
            &[("name", self.name.as_str()), ("default", self.default_task.as_str())],
        );
        for p in &self.properties {
            empty_tag(
                &mut out,
                1,
                "property",
                &[("name", p.name.as_str()), ("value", p.value.as_str())],
            );
        }

        open_tag(&mut out, 1, "path", &[("id", self.classpath_id.as_str())]);
        for entry in &self.classpath {
            empty_tag(&mut out, 2, "pathelement", &[("path", entry.as_str())]);
        }
        close_tag(&mut out, 1, "path");

        empty_tag(
            &mut out,
            1,
            "taskdef",
            &[
                ("name", self.task_name.as_str()),
                ("classname", self.task_class.as_str()),
                ("classpathref", self.classpath_id.as_str()),
            ],
        );
        empty_tag(&mut out, 1, &self.task_name, &[]);
        close_tag(&mut out, 0, "project");
        out
    }
}

/// Outcome of [`ensure_descriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorState {
    /// A descriptor is already on disk and must be left alone.
    Existing,
    /// No descriptor on disk; the caller should write this content and remove it later.
    Synthesized(String),
}

impl DescriptorState {
    pub fn created(&self) -> bool {
        matches!(self, Self::Synthesized(_))
    }
}

/// Decide whether `dir` needs a temporary descriptor for `target`.
pub fn ensure_descriptor(dir: &Path, target: Target, config: &Config) -> DescriptorState {
    if dir.join(DESCRIPTOR_FILE).exists() {
        DescriptorState::Existing
    } else {
        DescriptorState::Synthesized(ProjectDescriptor::for_target(target, config).to_xml())
    }
}

fn open_tag(out: &mut String, depth: usize, name: &str, attrs: &[(&str, &str)]) {
    start(out, depth, name, attrs);
    out.push_str(">\n");
}

fn empty_tag(out: &mut String, depth: usize, name: &str, attrs: &[(&str, &str)]) {
    start(out, depth, name, attrs);
    out.push_str("/>\n");
}

fn close_tag(out: &mut String, depth: usize, name: &str) {
    out.push_str(&INDENT.repeat(depth));
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn start(out: &mut String, depth: usize, name: &str, attrs: &[(&str, &str)]) {
    out.push_str(&INDENT.repeat(depth));
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
