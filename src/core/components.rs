use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// 閉區間 `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// 模板中的替換鍵，例如 `GUM_CONTENT`
    pub placeholder: String,
}

impl Component {
    pub fn new(name: &str, min: f64, max: f64, placeholder: &str) -> Self {
        Self {
            name: name.to_string(),
            min,
            max,
            placeholder: placeholder.to_string(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.min, self.max)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentSetError {
    #[error("component '{name}' has invalid bounds [{min}, {max}]")]
    InvalidBounds { name: String, min: f64, max: f64 },

    #[error("duplicate component name '{0}'")]
    DuplicateName(String),

    #[error("duplicate placeholder '{0}'")]
    DuplicatePlaceholder(String),

    #[error("component name and placeholder must not be empty")]
    EmptyIdentifier,

    #[error("at least one bounded component is required")]
    NoBoundedComponents,
}

/// 成分配置表：一個自由成分（直接抽樣）加上依宣告順序排列的受限成分。
///
/// 宣告順序會影響分配器的最後微調，因此以 `Vec` 保存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSet {
    pub free: Component,
    pub bounded: Vec<Component>,
}

impl Default for ComponentSet {
    fn default() -> Self {
        Self {
            free: Component::new("gum", 80.10, 89.95, "GUM_CONTENT"),
            bounded: vec![
                Component::new("fat", 0.45, 0.55, "FAT"),
                Component::new("air", 2.90, 3.10, "AIR"),
                Component::new("ash", 0.45, 0.55, "ASH_CONTENT"),
                Component::new("protein", 2.45, 2.55, "PROTEIN"),
            ],
        }
    }
}

impl ComponentSet {
    pub fn validate(&self) -> Result<(), ComponentSetError> {
        if self.bounded.is_empty() {
            return Err(ComponentSetError::NoBoundedComponents);
        }

        let mut names = HashSet::new();
        let mut placeholders = HashSet::new();

        for component in self.iter() {
            if component.name.trim().is_empty() || component.placeholder.trim().is_empty() {
                return Err(ComponentSetError::EmptyIdentifier);
            }
            if !component.bounds().is_valid() {
                return Err(ComponentSetError::InvalidBounds {
                    name: component.name.clone(),
                    min: component.min,
                    max: component.max,
                });
            }
            if !names.insert(component.name.as_str()) {
                return Err(ComponentSetError::DuplicateName(component.name.clone()));
            }
            if !placeholders.insert(component.placeholder.as_str()) {
                return Err(ComponentSetError::DuplicatePlaceholder(
                    component.placeholder.clone(),
                ));
            }
        }

        Ok(())
    }

    /// 自由成分在前，其後為受限成分
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        std::iter::once(&self.free).chain(self.bounded.iter())
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.iter().find(|c| c.name == name)
    }

    /// 受限成分的總和範圍 (Σmin, Σmax)
    pub fn bounded_span(&self) -> (f64, f64) {
        self.bounded
            .iter()
            .fold((0.0, 0.0), |(lo, hi), c| (lo + c.min, hi + c.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_is_valid() {
        let set = ComponentSet::default();
        assert!(set.validate().is_ok());
        assert_eq!(set.free.name, "gum");
        let names: Vec<&str> = set.bounded.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["fat", "air", "ash", "protein"]);
    }

    #[test]
    fn test_bounded_span() {
        let (lo, hi) = ComponentSet::default().bounded_span();
        assert!((lo - 6.25).abs() < 1e-9);
        assert!((hi - 6.75).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut set = ComponentSet::default();
        set.bounded[1].min = 5.0;
        assert!(matches!(
            set.validate(),
            Err(ComponentSetError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut set = ComponentSet::default();
        set.bounded[0].name = "air".to_string();
        assert_eq!(
            set.validate(),
            Err(ComponentSetError::DuplicateName("air".to_string()))
        );

        let mut set = ComponentSet::default();
        set.bounded[0].placeholder = "GUM_CONTENT".to_string();
        assert_eq!(
            set.validate(),
            Err(ComponentSetError::DuplicatePlaceholder("GUM_CONTENT".to_string()))
        );
    }

    #[test]
    fn test_rejects_empty_bounded_list() {
        let mut set = ComponentSet::default();
        set.bounded.clear();
        assert_eq!(set.validate(), Err(ComponentSetError::NoBoundedComponents));
    }

    #[test]
    fn test_midpoint_and_contains() {
        let b = Bounds::new(2.90, 3.10);
        assert!((b.midpoint() - 3.0).abs() < 1e-12);
        assert!(b.contains(2.90));
        assert!(b.contains(3.10));
        assert!(!b.contains(3.11));
    }
}
