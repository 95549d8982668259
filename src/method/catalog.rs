//! Registry of timer methods keyed by id

use std::collections::HashMap;

use crate::error::TimerError;

use super::TimerMethod;

/// Immutable registry of timer methods
///
/// Insertion order is preserved for display; lookups go through an id index.
#[derive(Debug, Clone)]
pub struct MethodCatalog {
    methods: Vec<TimerMethod>,
    index: HashMap<String, usize>,
}

impl MethodCatalog {
    /// Build a catalog, validating every method and rejecting duplicate ids
    pub fn new(methods: Vec<TimerMethod>) -> Result<Self, TimerError> {
        let mut index = HashMap::with_capacity(methods.len());
        for (position, method) in methods.iter().enumerate() {
            method.validate()?;
            if index.insert(method.id.clone(), position).is_some() {
                return Err(TimerError::invalid_method(&method.id, "duplicate id"));
            }
        }
        Ok(Self { methods, index })
    }

    /// The planner's built-in methods
    pub fn builtin() -> Self {
        let methods = vec![
            TimerMethod::standard("pomodoro", "Pomodoro", 25 * 60, 5 * 60)
                .with_description("25 minutes of focus, 5 minutes of rest"),
            TimerMethod::standard("52-17", "52-17", 52 * 60, 17 * 60)
                .with_description("52 minutes of work, 17 minutes of rest"),
            TimerMethod::standard("ultradian", "Ultradian rhythm", 90 * 60, 20 * 60)
                .with_description("90 minutes of deep focus, 20 minutes of rest"),
            TimerMethod::standard("elr", "Explore-Learn-Review", 70 * 60, 15 * 60)
                .with_description("20 minutes exploring, 40 learning, 10 reviewing"),
            TimerMethod::exam("exam", "Past exam practice", 20, 100)
                .with_description("Fixed time per question")
                .customizable(),
            TimerMethod::standard("custom", "Custom", 45 * 60, 15 * 60)
                .with_description("Pick your own work and break lengths")
                .customizable(),
        ];

        let index = methods
            .iter()
            .enumerate()
            .map(|(position, method)| (method.id.clone(), position))
            .collect();

        Self { methods, index }
    }

    /// Merge additional methods, replacing any existing method with the same id
    pub fn with_methods(self, extra: Vec<TimerMethod>) -> Result<Self, TimerError> {
        let mut methods = self.methods;
        for method in extra {
            method.validate()?;
            match methods.iter().position(|m| m.id == method.id) {
                Some(position) => methods[position] = method,
                None => methods.push(method),
            }
        }
        Self::new(methods)
    }

    /// Look up a method by id
    pub fn get(&self, id: &str) -> Result<&TimerMethod, TimerError> {
        self.index
            .get(id)
            .map(|&position| &self.methods[position])
            .ok_or_else(|| TimerError::NotFound(id.to_string()))
    }

    /// All methods in display order
    pub fn methods(&self) -> impl Iterator<Item = &TimerMethod> {
        self.methods.iter()
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the catalog has no methods
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Default for MethodCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = MethodCatalog::builtin();
        assert_eq!(catalog.len(), 6);
        for method in catalog.methods() {
            assert!(method.validate().is_ok(), "{} is invalid", method.id);
        }
    }

    #[test]
    fn test_get_pomodoro() {
        let catalog = MethodCatalog::builtin();
        let pomodoro = catalog.get("pomodoro").unwrap();
        assert_eq!(pomodoro.work_duration_secs, 1500);
        assert_eq!(pomodoro.break_duration_secs, 300);
        assert!(!pomodoro.is_customizable);

        let exam = catalog.get("exam").unwrap();
        assert!(exam.is_exam_mode);
        assert_eq!(exam.question_count, 100);
        assert!(exam.is_customizable);
    }

    #[test]
    fn test_get_unknown_id() {
        let catalog = MethodCatalog::builtin();
        assert_eq!(
            catalog.get("missing").unwrap_err(),
            TimerError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = MethodCatalog::new(vec![
            TimerMethod::standard("a", "A", 60, 60),
            TimerMethod::standard("a", "A again", 120, 60),
        ]);
        assert!(matches!(result, Err(TimerError::InvalidMethod { .. })));
    }

    #[test]
    fn test_new_rejects_invalid_method() {
        let result = MethodCatalog::new(vec![TimerMethod::standard("zero", "Zero", 0, 60)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fixture_catalog() {
        let catalog = MethodCatalog::new(vec![TimerMethod::standard("quick", "Quick", 10, 5)])
            .unwrap();
        assert_eq!(catalog.get("quick").unwrap().work_duration_secs, 10);
        assert!(catalog.get("pomodoro").is_err());
    }

    #[test]
    fn test_with_methods_replaces_and_appends() {
        let catalog = MethodCatalog::builtin()
            .with_methods(vec![
                TimerMethod::standard("pomodoro", "Long pomodoro", 50 * 60, 10 * 60),
                TimerMethod::standard("sprint", "Sprint", 10 * 60, 2 * 60),
            ])
            .unwrap();

        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.get("pomodoro").unwrap().work_duration_secs, 50 * 60);
        assert_eq!(catalog.get("sprint").unwrap().break_duration_secs, 2 * 60);
        assert_eq!(catalog.methods().next().unwrap().id, "pomodoro");
    }
}
