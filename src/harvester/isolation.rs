use crate::config::IsolationSettings;

/// Why a lesson gets a fresh browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationReason {
    EarlyLesson,
    Periodic,
    Keyword,
    SharedLimit,
}

/// Decides whether a lesson runs in a new browser or the shared one.
#[derive(Debug, Clone)]
pub struct IsolationPolicy {
    settings: IsolationSettings,
    keywords: Vec<Vec<String>>,
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl IsolationPolicy {
    pub fn new(settings: IsolationSettings) -> Self {
        let keywords = settings
            .problematic_keywords
            .iter()
            .map(|k| words(k))
            .filter(|k| !k.is_empty())
            .collect();
        Self { settings, keywords }
    }

    /// `index` is 1-based. `lessons_on_shared` counts lessons processed on
    /// the current browser since it was created.
    pub fn reason(
        &self,
        index: usize,
        title: &str,
        lessons_on_shared: usize,
    ) -> Option<IsolationReason> {
        let s = &self.settings;
        if !s.enabled {
            return None;
        }
        if index <= s.early_lessons {
            return Some(IsolationReason::EarlyLesson);
        }
        if s.frequency > 0 && index % s.frequency == 0 {
            return Some(IsolationReason::Periodic);
        }
        let title_words = words(title);
        if self
            .keywords
            .iter()
            .any(|k| title_words.windows(k.len()).any(|w| w == k.as_slice()))
        {
            return Some(IsolationReason::Keyword);
        }
        if lessons_on_shared >= s.max_shared_lessons {
            return Some(IsolationReason::SharedLimit);
        }
        None
    }

    pub fn should_isolate(&self, index: usize, title: &str, lessons_on_shared: usize) -> bool {
        self.reason(index, title, lessons_on_shared).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> IsolationPolicy {
        IsolationPolicy::new(IsolationSettings::default())
    }

    #[test]
    fn test_early_lessons_isolated() {
        let p = policy();
        for i in 1..=3 {
            assert_eq!(p.reason(i, "Pricing", 0), Some(IsolationReason::EarlyLesson));
        }
        assert!(!p.should_isolate(4, "Pricing", 0));
    }

    #[test]
    fn test_periodic_isolation() {
        let p = policy();
        assert_eq!(p.reason(5, "Pricing", 0), Some(IsolationReason::Periodic));
        assert_eq!(p.reason(10, "Pricing", 0), Some(IsolationReason::Periodic));
        assert!(!p.should_isolate(7, "Pricing", 0));
    }

    #[test]
    fn test_keyword_whole_word() {
        let p = policy();
        assert_eq!(p.reason(7, "Welcome to the course", 0), Some(IsolationReason::Keyword));
        assert_eq!(p.reason(7, "Getting   Started: Tools", 0), Some(IsolationReason::Keyword));
        assert!(!p.should_isolate(7, "Welcomed guests", 0));
        assert!(!p.should_isolate(7, "Getting paid, started late", 0));
    }

    #[test]
    fn test_shared_limit() {
        let p = policy();
        assert_eq!(p.reason(7, "Pricing", 10), Some(IsolationReason::SharedLimit));
        assert!(!p.should_isolate(7, "Pricing", 9));
    }

    #[test]
    fn test_disabled() {
        let p = IsolationPolicy::new(IsolationSettings {
            enabled: false,
            ..Default::default()
        });
        assert!(!p.should_isolate(1, "Welcome", 100));
    }

    #[test]
    fn test_zero_frequency_ignored() {
        let p = IsolationPolicy::new(IsolationSettings {
            frequency: 0,
            ..Default::default()
        });
        assert!(!p.should_isolate(20, "Pricing", 0));
    }
}
