use rand::seq::IndexedRandom;
use rand::Rng;

use crate::settings::MemeSettings;

/// Build the weekly meme-count sentence from this week's new emoji
/// names. Each configured group counts the names containing one of its
/// substrings and shows one matching emoji picked at random, or its
/// fallback emoji on a dry week. The group with the most uploads fronts
/// the sentence with its lead emoji.
///
/// Returns `None` when no groups are configured.
pub fn meme_sentence<R: Rng>(
    new_names: &[String],
    settings: &MemeSettings,
    rng: &mut R,
) -> Option<String> {
    let groups = &settings.groups;
    if groups.is_empty() {
        return None;
    }

    // a name counts toward every group it matches
    let matches: Vec<Vec<&str>> = groups
        .iter()
        .map(|group| {
            new_names
                .iter()
                .filter(|name| {
                    group
                        .substrings
                        .iter()
                        .any(|substring| name.contains(substring.as_str()))
                })
                .map(String::as_str)
                .collect()
        })
        .collect();

    let mut lead = settings.sad_lead.as_str();
    let mut most_matches = 0;
    for (group, found) in groups.iter().zip(&matches) {
        if found.len() > most_matches {
            most_matches = found.len();
            lead = group.lead_emoji.as_str();
        }
    }

    let mut segments: Vec<String> = Vec::new();
    for (group, found) in groups.iter().zip(&matches) {
        let example = match found.choose(rng) {
            Some(name) => (*name).to_string(),
            None => group.fallback.clone(),
        };
        segments.push(format!(
            "{} new *{}* emojis :{}:",
            found.len(),
            group.label,
            example
        ));
    }
    if segments.len() > 1 {
        if let Some(last) = segments.last_mut() {
            *last = format!("and {}", last);
        }
    }

    Some(format!(
        ":{}: There are {} this week!",
        lead,
        segments.join(", ")
    ))
}
