//! Menu item name matching.

/// Loose match between a menu candidate and what the user asked for:
/// either string contains the other, ignoring case and surrounding
/// whitespace. Short search terms match many items and abbreviations
/// never match their expansion ("BEC Sandwich" vs "bacon sandwich").
pub fn item_matches(candidate: &str, search: &str) -> bool {
    let candidate = candidate.trim().to_lowercase();
    let search = search.trim().to_lowercase();
    if candidate.is_empty() || search.is_empty() {
        return false;
    }
    candidate.contains(&search) || search.contains(&candidate)
}

/// The first non-empty line of an element's text, used as its name.
pub fn display_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_matches_either_direction() {
        assert!(item_matches("Bacon, Egg & Cheese Sandwich", "bacon, egg"));
        assert!(item_matches("Latte", "large latte please"));
        assert!(item_matches("  EVERYTHING BAGEL ", "everything bagel"));
    }

    #[test]
    fn it_requires_full_containment() {
        // Semantically close, but neither string contains the other
        assert!(!item_matches("Bacon, Egg & Cheese Sandwich", "bacon sandwich"));
        assert!(!item_matches("BEC Sandwich", "bacon sandwich"));
    }

    #[test]
    fn it_overmatches_short_terms() {
        assert!(item_matches("Egg White Omelette", "egg"));
        assert!(item_matches("Bacon, Egg & Cheese Sandwich", "egg"));
    }

    #[test]
    fn it_never_matches_blank_strings() {
        assert!(!item_matches("", "bagel"));
        assert!(!item_matches("Bagel", "   "));
    }

    #[test]
    fn it_uses_the_first_line_as_the_name() {
        assert_eq!(
            display_name("\n  Plain Bagel \n$2.50\nFreshly baked"),
            Some("Plain Bagel".to_string())
        );
        assert_eq!(display_name("  \n "), None);
    }
}
