//! Everything about a lesson page that is not its video: finding lessons,
//! reading their text, writing them to disk, and signing in.

pub mod content;
pub mod discovery;
pub mod login;
pub mod writer;

pub use content::{extract_content, ContentExtractor};
pub use discovery::{community_from_url, community_name_from_title, discover_lessons, single_lesson_id};
pub use login::{login, Credentials};
pub use writer::{sanitize_filename, LessonWriter, OutputDirs};
