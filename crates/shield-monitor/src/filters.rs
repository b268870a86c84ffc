//! Visual filter composition.

/// Filters the actuator knows how to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualFilter {
    ToneDown,
    Blur,
    Grayscale,
}

impl VisualFilter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tone-down" => Some(Self::ToneDown),
            "blur" => Some(Self::Blur),
            "grayscale" => Some(Self::Grayscale),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ToneDown => "tone-down",
            Self::Blur => "blur",
            Self::Grayscale => "grayscale",
        }
    }

    /// CSS filter functions for this filter.
    pub fn css(self) -> &'static str {
        match self {
            Self::ToneDown => "brightness(0.8) contrast(0.9) saturate(0.7)",
            Self::Blur => "blur(2px)",
            Self::Grayscale => "grayscale(0.5)",
        }
    }
}

/// A composed filter expression and the names that contributed to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterComposition {
    pub expression: String,
    pub applied: Vec<String>,
}

/// Compose names in order into one expression.
///
/// Unknown names are skipped; a repeated name contributes once.
pub fn compose<S: AsRef<str>>(names: &[S]) -> FilterComposition {
    let mut filters: Vec<VisualFilter> = Vec::new();
    for name in names {
        match VisualFilter::from_name(name.as_ref()) {
            Some(filter) if !filters.contains(&filter) => filters.push(filter),
            Some(_) => {}
            None => tracing::debug!(filter = name.as_ref(), "skipping unknown filter"),
        }
    }

    FilterComposition {
        expression: filters
            .iter()
            .map(|f| f.css())
            .collect::<Vec<_>>()
            .join(" "),
        applied: filters.iter().map(|f| f.name().to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_down_then_blur() {
        let composed = compose(&["tone-down", "blur"]);
        assert_eq!(
            composed.expression,
            "brightness(0.8) contrast(0.9) saturate(0.7) blur(2px)"
        );
        assert_eq!(composed.applied, vec!["tone-down", "blur"]);
    }

    #[test]
    fn order_follows_input() {
        let composed = compose(&["grayscale", "tone-down"]);
        assert_eq!(
            composed.expression,
            "grayscale(0.5) brightness(0.8) contrast(0.9) saturate(0.7)"
        );
    }

    #[test]
    fn unknown_filter_is_skipped() {
        let composed = compose(&["tone-down", "sparkle"]);
        assert_eq!(
            composed.expression,
            "brightness(0.8) contrast(0.9) saturate(0.7)"
        );
        assert_eq!(composed.applied, vec!["tone-down"]);
    }

    #[test]
    fn no_trailing_or_doubled_separators() {
        let composed = compose(&["sparkle", "blur", "glitter", "grayscale"]);
        assert_eq!(composed.expression, "blur(2px) grayscale(0.5)");
        assert!(!composed.expression.ends_with(' '));
        assert!(!composed.expression.contains("  "));
    }

    #[test]
    fn empty_and_all_unknown_compose_to_nothing() {
        let none: [&str; 0] = [];
        assert_eq!(compose(&none), FilterComposition::default());
        assert_eq!(compose(&["sparkle"]).expression, "");
    }

    #[test]
    fn repeated_name_contributes_once() {
        let composed = compose(&["blur", "blur"]);
        assert_eq!(composed.expression, "blur(2px)");
        assert_eq!(composed.applied, vec!["blur"]);
    }

    #[test]
    fn names_roundtrip() {
        for f in [VisualFilter::ToneDown, VisualFilter::Blur, VisualFilter::Grayscale] {
            assert_eq!(VisualFilter::from_name(f.name()), Some(f));
        }
    }
}
