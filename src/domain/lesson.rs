use serde::{Deserialize, Serialize};

/// A lesson discovered in a classroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Section titles from the course root down to this lesson.
    pub path: Vec<String>,
}

impl Lesson {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            path: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }
}

/// Community (group) a classroom belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// URL slug, e.g. `my-group`.
    pub slug: String,
    /// Course segment following `/classroom/`.
    pub course: String,
    /// Display name read from the page title; falls back to the slug.
    pub name: String,
}

impl Community {
    /// Directory name used under the output root: `Name (slug)`.
    pub fn folder_name(&self) -> String {
        if self.name.is_empty() || self.name == self.slug {
            self.slug.clone()
        } else {
            format!("{} ({})", self.name, self.slug)
        }
    }
}

/// A hyperlink found in the lesson body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

/// Text, links and images read from a lesson page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonContent {
    pub title: String,
    pub body: String,
    pub resources: Option<String>,
    pub examples: Option<String>,
    pub links: Vec<Link>,
    pub images: Vec<String>,
}

impl LessonContent {
    /// Split raw page text into body, `RESOURCES:` and `EXAMPLES:` parts.
    pub fn split_sections(text: &str) -> (String, Option<String>, Option<String>) {
        let (before_examples, examples) = match text.split_once("EXAMPLES:") {
            Some((head, tail)) => (head, Some(tail.trim().to_string())),
            None => (text, None),
        };
        let (body, resources) = match before_examples.split_once("RESOURCES:") {
            Some((head, tail)) => (head, Some(tail.trim().to_string())),
            None => (before_examples, None),
        };
        (
            body.trim().to_string(),
            resources.filter(|r| !r.is_empty()),
            examples.filter(|e| !e.is_empty()),
        )
    }
}
