pub mod lesson;
pub mod platform;
pub mod video;

pub use lesson::{Community, Lesson, LessonContent, Link};
pub use platform::Platform;
pub use video::{CanonicalVideoRef, Locality, ResolvedVideo, VideoCandidate};
