//! Fragments - the renderable units of a view
//!
//! A fragment is either a bare template reference or a named frame. Frames
//! carry a stable id that a client can ask for with the `turbo-frame` header;
//! bare templates only ever appear as part of a full page.

/// One renderable unit of output
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// A template rendered as-is
    Template(String),
    /// A template wrapped in a `<turbo-frame>` with a client-addressable id
    Frame {
        /// Frame id, unique within one view
        id: String,
        /// Template rendered inside the frame
        template: String,
    },
}

impl Fragment {
    /// Create a bare template reference
    #[must_use]
    pub fn template(name: impl Into<String>) -> Self {
        Self::Template(name.into())
    }

    /// Create a named frame
    #[must_use]
    pub fn frame(id: impl Into<String>, template: impl Into<String>) -> Self {
        Self::Frame {
            id: id.into(),
            template: template.into(),
        }
    }

    /// Whether this fragment is a frame
    #[must_use]
    pub fn is_frame(&self) -> bool {
        matches!(self, Self::Frame { .. })
    }

    /// The template this fragment renders
    #[must_use]
    pub fn view_id(&self) -> &str {
        match self {
            Self::Template(name) => name,
            Self::Frame { template, .. } => template,
        }
    }

    /// The frame id, if this fragment is a frame
    #[must_use]
    pub fn frame_id(&self) -> Option<&str> {
        match self {
            Self::Template(_) => None,
            Self::Frame { id, .. } => Some(id),
        }
    }
}

impl From<&str> for Fragment {
    fn from(name: &str) -> Self {
        Self::Template(name.to_string())
    }
}

impl From<String> for Fragment {
    fn from(name: String) -> Self {
        Self::Template(name)
    }
}

/// Shorthand for [`Fragment::frame`]
#[must_use]
pub fn frame(id: impl Into<String>, template: impl Into<String>) -> Fragment {
    Fragment::frame(id, template)
}

/// Wrap rendered content in a `<turbo-frame>` container
#[must_use]
pub fn wrap_in_frame(id: &str, content: &str) -> String {
    format!("<turbo-frame id=\"{id}\">\n{content}\n</turbo-frame>")
}

/// Wrap rendered content in a `<turbo-stream>` action envelope
#[must_use]
pub fn wrap_in_stream(target: &str, action: &str, content: &str) -> String {
    format!(
        "<turbo-stream target=\"{target}\" action=\"{action}\"><template>{content}</template></turbo-stream>"
    )
}

/// Body of the frame returned when a requested frame is not in the view
#[must_use]
pub fn frame_not_found_body(id: &str) -> String {
    format!("<p>Requested frame \"{id}\" was not produced by the server.</p>")
}
