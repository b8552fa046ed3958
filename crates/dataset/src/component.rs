use std::fmt;

/// The closed set of component kinds a snapshot may carry, mapping each to
/// its canonical filename — the link name it takes inside the root node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Dataset,
    Commit,
    Meta,
    Structure,
    Stats,
    Transform,
    Viz,
    Readme,
    TransformScript,
    VizScript,
    RenderedViz,
    ReadmeScript,
    Body,
}

impl Component {
    /// Canonical filename within a snapshot directory. The body filename
    /// takes its suffix from the structure's declared format.
    pub fn filename(&self, body_format: &str) -> String {
        match self {
            Component::Dataset => "dataset.json".to_string(),
            Component::Commit => "commit.json".to_string(),
            Component::Meta => "meta.json".to_string(),
            Component::Structure => "structure.json".to_string(),
            Component::Stats => "stats.json".to_string(),
            Component::Transform => "transform.json".to_string(),
            Component::Viz => "viz.json".to_string(),
            Component::Readme => "readme.json".to_string(),
            Component::TransformScript => "transform_script".to_string(),
            Component::VizScript => "viz_script".to_string(),
            Component::RenderedViz => "rendered.html".to_string(),
            Component::ReadmeScript => "readme_script.md".to_string(),
            Component::Body => format!("body.{body_format}"),
        }
    }

    /// Resolve a short component tag, as used in drop lists.
    pub fn from_tag(tag: &str) -> Option<Component> {
        match tag {
            "md" => Some(Component::Meta),
            "st" => Some(Component::Structure),
            "bd" => Some(Component::Body),
            "sa" => Some(Component::Stats),
            "rm" => Some(Component::Readme),
            "vz" => Some(Component::Viz),
            "tf" => Some(Component::Transform),
            _ => None,
        }
    }

    /// The short tag for droppable components, if this component has one.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Component::Meta => Some("md"),
            Component::Structure => Some("st"),
            Component::Body => Some("bd"),
            Component::Stats => Some("sa"),
            Component::Readme => Some("rm"),
            Component::Viz => Some("vz"),
            Component::Transform => Some("tf"),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Dataset => "dataset",
            Component::Commit => "commit",
            Component::Meta => "meta",
            Component::Structure => "structure",
            Component::Stats => "stats",
            Component::Transform => "transform",
            Component::Viz => "viz",
            Component::Readme => "readme",
            Component::TransformScript => "transform script",
            Component::VizScript => "viz script",
            Component::RenderedViz => "rendered viz",
            Component::ReadmeScript => "readme script",
            Component::Body => "body",
        };
        f.write_str(name)
    }
}
