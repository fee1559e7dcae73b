//! List filtering and sorting.
//!
//! A pure projection from a raw collection to what a list view shows.
//! Filter predicates are ANDed together; the language predicate is an OR
//! across the selected catalog entries. Sorting applies each requested
//! key as a separate stable sort in a fixed order, so when several keys
//! are active the last one applied dominates the visible order — this
//! mirrors the behavior of the system it replaces.

use crate::core::models::ServerRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    None,
    Ascending,
    Descending,
}

/// One selectable language filter: a display label plus the keywords that
/// identify it inside a server's free-form language field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageFilter {
    pub label: String,
    pub keywords: Vec<String>,
}

impl LanguageFilter {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, language: &str) -> bool {
        let language = language.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| language.contains(&keyword.to_lowercase()))
    }
}

/// Built-in catalog of selectable language filters.
pub fn language_catalog() -> Vec<LanguageFilter> {
    vec![
        LanguageFilter::new("English", &["english", "en"]),
        LanguageFilter::new("Spanish", &["spanish", "espanol", "español", "es"]),
        LanguageFilter::new("Portuguese", &["portuguese", "portugues", "português", "pt", "br"]),
        LanguageFilter::new("Russian", &["russian", "russkiy", "русский", "ru"]),
        LanguageFilter::new("Romanian", &["romanian", "romana", "română", "ro"]),
        LanguageFilter::new("German", &["german", "deutsch", "de"]),
        LanguageFilter::new("French", &["french", "francais", "français", "fr"]),
        LanguageFilter::new("Turkish", &["turkish", "turkce", "türkçe", "tr"]),
        LanguageFilter::new("Indonesian", &["indonesian", "indonesia", "id"]),
        LanguageFilter::new("Vietnamese", &["vietnamese", "viet", "vn"]),
    ]
}

/// What the user typed and toggled in the list header.
#[derive(Debug, Clone, Default)]
pub struct SearchData {
    pub query: String,
    pub omp_only: bool,
    pub non_empty: bool,
    pub unpassworded: bool,
    pub languages: Vec<LanguageFilter>,
    pub sort_ping: SortOrder,
    pub sort_player: SortOrder,
    pub sort_name: SortOrder,
    pub sort_mode: SortOrder,
}

/// Derive the visible list for one collection.
pub fn project(records: &[ServerRecord], search: &SearchData) -> Vec<ServerRecord> {
    let query = search.query.to_lowercase();

    let mut out: Vec<ServerRecord> = records
        .iter()
        .filter(|server| keep(server, search, &query))
        .cloned()
        .collect();

    // Sequential stable sorts in declared order; with several keys active
    // the later ones re-order within (and across) the earlier ones, so
    // the last non-none key wins the primary order.
    sort_by(&mut out, search.sort_ping, |a, b| a.ping.cmp(&b.ping));
    sort_by(&mut out, search.sort_player, |a, b| {
        a.player_count.cmp(&b.player_count)
    });
    sort_by(&mut out, search.sort_name, |a, b| {
        a.hostname.to_uppercase().cmp(&b.hostname.to_uppercase())
    });
    sort_by(&mut out, search.sort_mode, |a, b| {
        a.game_mode.to_uppercase().cmp(&b.game_mode.to_uppercase())
    });

    out
}

fn keep(server: &ServerRecord, search: &SearchData, query: &str) -> bool {
    if !query.is_empty()
        && !server.hostname.to_lowercase().contains(query)
        && !server.game_mode.to_lowercase().contains(query)
    {
        return false;
    }

    if search.omp_only && !server.using_omp {
        return false;
    }

    if search.non_empty && server.player_count == 0 {
        return false;
    }

    if search.unpassworded && server.has_password {
        return false;
    }

    if !search.languages.is_empty()
        && !search
            .languages
            .iter()
            .any(|filter| filter.matches(&server.language))
    {
        return false;
    }

    true
}

fn sort_by<F>(records: &mut [ServerRecord], order: SortOrder, compare: F)
where
    F: Fn(&ServerRecord, &ServerRecord) -> std::cmp::Ordering,
{
    match order {
        SortOrder::None => {}
        SortOrder::Ascending => records.sort_by(|a, b| compare(a, b)),
        SortOrder::Descending => records.sort_by(|a, b| compare(b, a)),
    }
}
