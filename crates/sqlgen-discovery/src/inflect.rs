//! English noun singularization

const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("oxen", "ox"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("vertices", "vertex"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("data", "datum"),
    ("analyses", "analysis"),
    ("crises", "crisis"),
    ("theses", "thesis"),
    ("diagnoses", "diagnosis"),
    ("lives", "life"),
    ("wives", "wife"),
    ("knives", "knife"),
    ("leaves", "leaf"),
    ("halves", "half"),
    ("shelves", "shelf"),
    ("wolves", "wolf"),
    ("thieves", "thief"),
    ("heroes", "hero"),
    ("potatoes", "potato"),
    ("tomatoes", "tomato"),
    ("echoes", "echo"),
    ("vetoes", "veto"),
];

/// Words whose plural and singular are the same
const UNINFLECTED: &[&str] = &[
    "sheep", "fish", "deer", "series", "species", "news", "information", "equipment",
    "aircraft", "staff", "inventory", "metadata",
];

/// Singulars ending in "ie", so "-ies" must not become "-y"
const IE_SINGULARS: &[&str] = &[
    "movie", "cookie", "tie", "pie", "lie", "die", "calorie", "rookie", "zombie", "brownie",
    "genie", "prairie", "selfie", "hoodie", "sortie", "goalie", "freebie", "smoothie",
];

const SIBILANT_ES: &[&str] = &["sses", "shes", "ches", "xes", "zzes"];

/// Singular form of a plural noun
///
/// Returns `None` when the word does not look like a plural (including words
/// that are already singular). The letter case of the input is carried over
/// position by position, so `"Rentals"` becomes `"Rental"`.
pub fn singular_noun(word: &str) -> Option<String> {
    if word.chars().count() < 3 || !word.chars().all(|c| c.is_alphabetic() || c == '-') {
        return None;
    }

    let lower = word.to_lowercase();

    // Compounds inflect on their last part
    if let Some((head, tail)) = lower.rsplit_once('-') {
        let tail_singular = singular_lower(tail)?;
        return Some(restore_case(word, &format!("{}-{}", head, tail_singular)));
    }

    singular_lower(&lower).map(|singular| restore_case(word, &singular))
}

fn singular_lower(lower: &str) -> Option<String> {
    if UNINFLECTED.contains(&lower) {
        return None;
    }
    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return Some((*singular).to_string());
    }
    if lower.len() < 3 {
        return None;
    }

    if let Some(stem) = lower.strip_suffix("ies") {
        let with_ie = format!("{}ie", stem);
        if IE_SINGULARS.contains(&with_ie.as_str()) {
            return Some(with_ie);
        }
        if stem.len() > 1 {
            return Some(format!("{}y", stem));
        }
    }

    if SIBILANT_ES.iter().any(|suffix| lower.ends_with(suffix)) {
        return Some(lower[..lower.len() - 2].to_string());
    }

    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return None;
    }

    lower
        .strip_suffix('s')
        .filter(|stem| stem.len() > 1)
        .map(str::to_string)
}

fn restore_case(original: &str, singular: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return singular.to_uppercase();
    }

    let mut original_chars = original.chars();
    singular
        .chars()
        .map(|c| match original_chars.next() {
            Some(o) if o.is_uppercase() => c.to_uppercase().next().unwrap_or(c),
            _ => c,
        })
        .collect()
}
