//! Alignment between the published label catalog and the classifier's
//! internal class ordering.
//!
//! A fitted classifier exposes its own ordered class list, which is not
//! guaranteed to match the catalog's order — or even its membership, if
//! the classifier observed a different label set than the catalog was
//! computed from. Alignment is rebuilt from an explicit lookup on every
//! call; the two sequences are never assumed isomorphic.

use std::collections::HashMap;

/// Map a probability vector (aligned to `classes`) onto the catalog.
///
/// Returns one `(label, probability)` pair per catalog label, in catalog
/// order. Labels absent from `classes` get probability `0.0`, so the
/// result always covers the full published label set; it may therefore
/// not sum to 1.
pub fn align_to_catalog(
    catalog: &[String],
    classes: &[String],
    probabilities: &[f32],
) -> Vec<(String, f32)> {
    let position: HashMap<&str, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, class)| (class.as_str(), i))
        .collect();

    catalog
        .iter()
        .map(|label| {
            let p = position
                .get(label.as_str())
                .and_then(|&i| probabilities.get(i))
                .copied()
                .unwrap_or(0.0);
            (label.clone(), p)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_order_passes_through() {
        let catalog = strings(&["a", "b", "c"]);
        let aligned = align_to_catalog(&catalog, &catalog, &[0.2, 0.5, 0.3]);
        assert_eq!(
            aligned,
            vec![
                ("a".to_string(), 0.2),
                ("b".to_string(), 0.5),
                ("c".to_string(), 0.3),
            ]
        );
    }

    #[test]
    fn reordered_classes_are_looked_up() {
        let catalog = strings(&["a", "b", "c"]);
        let classes = strings(&["c", "a", "b"]);
        let aligned = align_to_catalog(&catalog, &classes, &[0.3, 0.2, 0.5]);
        assert_eq!(
            aligned,
            vec![
                ("a".to_string(), 0.2),
                ("b".to_string(), 0.5),
                ("c".to_string(), 0.3),
            ]
        );
    }

    #[test]
    fn missing_class_defaults_to_zero() {
        // Catalog computed from raw samples, but the fitted classifier only
        // observed two of the three labels.
        let catalog = strings(&["a", "b", "c"]);
        let classes = strings(&["a", "c"]);
        let aligned = align_to_catalog(&catalog, &classes, &[0.9, 0.1]);
        assert_eq!(
            aligned,
            vec![
                ("a".to_string(), 0.9),
                ("b".to_string(), 0.0),
                ("c".to_string(), 0.1),
            ]
        );
    }

    #[test]
    fn classes_outside_catalog_are_dropped() {
        let catalog = strings(&["a", "b"]);
        let classes = strings(&["a", "b", "z"]);
        let aligned = align_to_catalog(&catalog, &classes, &[0.5, 0.4, 0.1]);
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[0], ("a".to_string(), 0.5));
        assert_eq!(aligned[1], ("b".to_string(), 0.4));
    }

    #[test]
    fn short_probability_vector_is_tolerated() {
        let catalog = strings(&["a", "b"]);
        let classes = strings(&["a", "b"]);
        let aligned = align_to_catalog(&catalog, &classes, &[0.7]);
        assert_eq!(aligned[0].1, 0.7);
        assert_eq!(aligned[1].1, 0.0);
    }

    #[test]
    fn empty_catalog_yields_empty_result() {
        let aligned = align_to_catalog(&[], &strings(&["a"]), &[1.0]);
        assert!(aligned.is_empty());
    }
}
