use std::collections::HashSet;

use crate::emoji::{strip_colons, EmojiCatalog};
use crate::settings::Settings;

const SCREENSHOT_PREFIXES: [&str; 2] = ["screenshot-", "screen-shot-"];

/// Drop everything the reports should never mention. Runs after the
/// vote tally (votes may land on emojis the skip list hides from the
/// weekly lists) and leaves the catalog sorted newest first.
pub fn apply(settings: &Settings, catalog: &mut EmojiCatalog) {
    catalog.sort_by_created_desc();

    let skip: HashSet<String> = settings
        .lists
        .skip_emojis
        .iter()
        .map(|name| strip_colons(name))
        .collect();
    if !skip.is_empty() {
        catalog.retain(|e| !skip.contains(&e.name));
    }

    if settings.features.screenshot_filter {
        catalog.retain(|e| !SCREENSHOT_PREFIXES.iter().any(|p| e.name.starts_with(p)));
    }

    if settings.features.bulk_duplicate_filter {
        catalog.retain(|e| !is_bulk_duplicate(&e.name));
    }

    if settings.features.strict_unique {
        // catalog is newest first, so the first occurrence wins
        let mut seen = HashSet::new();
        catalog.retain(|e| seen.insert(collapse_name(&e.name)));
    }
}

/// Bulk uploads of the same image arrive as "name-2", "name-3" and so
/// on. Anything ending in "-<digits>" is treated as one of those.
fn is_bulk_duplicate(name: &str) -> bool {
    match name.rsplit_once('-') {
        Some((_, digits)) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn collapse_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::Emoji;

    fn emoji(name: &str, created: i64) -> Emoji {
        Emoji {
            name: name.to_string(),
            created,
            ..Emoji::default()
        }
    }

    fn catalog_of(emojis: Vec<Emoji>) -> EmojiCatalog {
        EmojiCatalog::new(emojis)
    }

    fn names(catalog: &EmojiCatalog) -> Vec<&str> {
        catalog.emojis().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_skip_list_matches_with_and_without_colons() {
        let mut settings = Settings::default();
        settings.lists.skip_emojis = vec![":frog:".to_string(), "other".to_string()];
        let mut catalog = catalog_of(vec![emoji("frog", 3), emoji("other", 2), emoji("keep", 1)]);

        apply(&settings, &mut catalog);

        assert_eq!(names(&catalog), vec!["keep"]);
    }

    #[test]
    fn test_screenshot_prefixes_dropped() {
        let settings = Settings::default();
        let mut catalog = catalog_of(vec![
            emoji("screenshot-2026-01-02", 4),
            emoji("screen-shot-thing", 3),
            emoji("screenshots", 2),
            emoji("normal", 1),
        ]);

        apply(&settings, &mut catalog);

        assert_eq!(names(&catalog), vec!["screenshots", "normal"]);
    }

    #[test]
    fn test_screenshot_filter_can_be_disabled() {
        let mut settings = Settings::default();
        settings.features.screenshot_filter = false;
        let mut catalog = catalog_of(vec![emoji("screenshot-keep", 2), emoji("normal", 1)]);

        apply(&settings, &mut catalog);

        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_bulk_duplicates_dropped_when_enabled() {
        let mut settings = Settings::default();
        settings.features.bulk_duplicate_filter = true;
        let mut catalog = catalog_of(vec![
            emoji("party-2", 5),
            emoji("party-12", 4),
            emoji("party", 3),
            emoji("v2", 2),
            emoji("cat-5000x", 1),
        ]);

        apply(&settings, &mut catalog);

        assert_eq!(names(&catalog), vec!["party", "v2", "cat-5000x"]);
    }

    #[test]
    fn test_bulk_duplicates_kept_by_default() {
        let settings = Settings::default();
        let mut catalog = catalog_of(vec![emoji("party-2", 2), emoji("party", 1)]);

        apply(&settings, &mut catalog);

        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_is_bulk_duplicate() {
        assert!(is_bulk_duplicate("party-2"));
        assert!(is_bulk_duplicate("party-123"));
        assert!(!is_bulk_duplicate("party"));
        assert!(!is_bulk_duplicate("party-"));
        assert!(!is_bulk_duplicate("party-2x"));
        assert!(!is_bulk_duplicate("v2"));
    }

    #[test]
    fn test_strict_unique_keeps_newest_variant() {
        let mut settings = Settings::default();
        settings.features.strict_unique = true;
        let mut catalog = catalog_of(vec![
            emoji("thumbs_up", 5),
            emoji("thumbs-up", 9),
            emoji("ThumbsUp", 1),
            emoji("unrelated", 3),
        ]);

        apply(&settings, &mut catalog);

        assert_eq!(names(&catalog), vec!["thumbs-up", "unrelated"]);
    }

    #[test]
    fn test_collapse_name() {
        assert_eq!(collapse_name("Thumbs_Up-2"), "thumbsup2");
        assert_eq!(collapse_name("plain"), "plain");
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut settings = Settings::default();
        settings.features.strict_unique = true;
        settings.features.bulk_duplicate_filter = true;
        settings.lists.skip_emojis = vec!["frog".to_string()];
        let mut catalog = catalog_of(vec![
            emoji("frog", 6),
            emoji("screenshot-x", 5),
            emoji("party-2", 4),
            emoji("thumbs_up", 3),
            emoji("thumbs-up", 2),
            emoji("keep", 1),
        ]);

        apply(&settings, &mut catalog);
        let first_pass = names(&catalog)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        apply(&settings, &mut catalog);

        assert_eq!(names(&catalog), first_pass);
        assert_eq!(names(&catalog), vec!["thumbs_up", "keep"]);
    }

    #[test]
    fn test_apply_sorts_newest_first() {
        let settings = Settings::default();
        let mut catalog = catalog_of(vec![emoji("old", 1), emoji("new", 9), emoji("mid", 5)]);

        apply(&settings, &mut catalog);

        assert_eq!(names(&catalog), vec!["new", "mid", "old"]);
    }
}
