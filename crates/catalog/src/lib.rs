//! Zestraw catalog: deterministic filter → sort → paginate over a listing.
//!
//! The pipeline is pure: identical listing + `FilterState` always produce
//! the identical page. Stages run in a fixed order and each stage narrows
//! the previous stage's survivors; per-stage counts are reported for the
//! `--explain` view.

#![forbid(unsafe_code)]

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use zestraw_core::{Product, Supplier};

/// Listing page size. An engine constant, not user-configurable.
pub const PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Recently joined: keep listing order.
    #[default]
    Latest,
    /// Sustainability rating, highest first.
    Rating,
    PriceLow,
    PriceHigh,
}

impl SortKey {
    /// Lenient parse for UI-driven input; unknown keys fall back to the
    /// default order instead of failing.
    pub fn parse(s: &str) -> Self {
        match s {
            "rating" => Self::Rating,
            "price-low" => Self::PriceLow,
            "price-high" => Self::PriceHigh,
            "latest" => Self::Latest,
            other => {
                debug!(key = other, "unknown sort key; using default order");
                Self::Latest
            }
        }
    }
}

/// Current marketplace filter selection. Every filter mutation resets the
/// page to 1; changing the sort order keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub search: String,
    pub locations: Vec<String>,
    pub min_moq: u32,
    pub verified_only: bool,
    pub sort: SortKey,
    pub page: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            locations: Vec::new(),
            min_moq: 0,
            verified_only: false,
            sort: SortKey::default(),
            page: 1,
        }
    }
}

impl FilterState {
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Add the location when absent, drop it when present.
    pub fn toggle_location(&mut self, location: &str) {
        match self.locations.iter().position(|l| l == location) {
            Some(idx) => {
                self.locations.remove(idx);
            }
            None => self.locations.push(location.to_string()),
        }
        self.page = 1;
    }

    pub fn set_min_moq(&mut self, min_moq: u32) {
        self.min_moq = min_moq;
        self.page = 1;
    }

    pub fn set_verified_only(&mut self, verified_only: bool) {
        self.verified_only = verified_only;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Restore every field to its default and go back to page 1.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Survivor counts per pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterDebugInfo {
    pub total: usize,
    pub after_text: usize,
    pub after_locations: usize,
    pub after_moq: usize,
    pub after_verified: usize,
}

/// One displayed page plus listing-wide counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub entries: Vec<Supplier>,
    /// Matches across all pages.
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

pub fn total_pages(matches: usize) -> usize {
    matches.div_ceil(PAGE_SIZE).max(1)
}

/// Clamp a 1-based page into `[1, total_pages(matches)]`.
pub fn clamp_page(page: usize, matches: usize) -> usize {
    page.clamp(1, total_pages(matches))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Run the full pipeline. Pure: no I/O, no hidden state.
pub fn query(entries: &[Supplier], filter: &FilterState) -> (ListingPage, FilterDebugInfo) {
    let started = std::time::Instant::now();
    let total = entries.len();
    let mut survivors: Vec<&Supplier> = entries.iter().collect();

    // Free text: substring match against name, category, location.
    if !filter.search.is_empty() {
        let q = filter.search.to_lowercase();
        survivors.retain(|s| {
            contains_ci(&s.name, &q) || contains_ci(&s.category, &q) || contains_ci(&s.location, &q)
        });
    }
    let after_text = survivors.len();

    // Locations: OR across the selection and across state/location fields.
    if !filter.locations.is_empty() {
        let wanted: Vec<String> = filter.locations.iter().map(|l| l.to_lowercase()).collect();
        survivors.retain(|s| {
            wanted
                .iter()
                .any(|loc| contains_ci(&s.state, loc) || contains_ci(&s.location, loc))
        });
    }
    let after_locations = survivors.len();

    // MOQ threshold; 0 passes everything through.
    if filter.min_moq > 0 {
        survivors.retain(|s| s.moq >= filter.min_moq);
    }
    let after_moq = survivors.len();

    // Verified: asymmetric on purpose; `false` applies no restriction.
    if filter.verified_only {
        survivors.retain(|s| s.verified);
    }
    let after_verified = survivors.len();

    // Stable sort; ties keep their relative listing order.
    match filter.sort {
        SortKey::Latest => {}
        SortKey::Rating => {
            survivors.sort_by(|a, b| b.sustainability_rating.cmp(&a.sustainability_rating))
        }
        SortKey::PriceLow => survivors.sort_by(|a, b| a.price_min.total_cmp(&b.price_min)),
        SortKey::PriceHigh => survivors.sort_by(|a, b| b.price_min.total_cmp(&a.price_min)),
    }

    let matches = survivors.len();
    let page = clamp_page(filter.page, matches);
    let entries: Vec<Supplier> = survivors
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .cloned()
        .collect();

    metrics::counter!("catalog_queries_total", 1u64);
    metrics::histogram!("catalog_query_ms", started.elapsed().as_secs_f64() * 1_000.0);

    (
        ListingPage { entries, total: matches, page, total_pages: total_pages(matches) },
        FilterDebugInfo { total, after_text, after_locations, after_moq, after_verified },
    )
}

/// Distinct states in first-seen order, for the location sidebar.
pub fn location_facets(entries: &[Supplier]) -> Vec<String> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut out = Vec::new();
    for s in entries {
        if seen.insert(s.state.as_str()) {
            out.push(s.state.clone());
        }
    }
    out
}

// ---- Shop-side product filter ----

/// Product grid filter: type match plus price range. The grid is never
/// re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopFilter {
    pub product_type: Option<String>,
    pub price_min: f64,
    pub price_max: f64,
}

impl Default for ShopFilter {
    fn default() -> Self {
        Self { product_type: None, price_min: 0.0, price_max: f64::MAX }
    }
}

pub fn filter_products(products: &[Product], filter: &ShopFilter) -> Vec<Product> {
    products
        .iter()
        .filter(|p| {
            if let Some(ty) = &filter.product_type {
                if p.product_type.as_deref() != Some(ty.as_str()) {
                    return false;
                }
            }
            p.price >= filter.price_min && p.price <= filter.price_max
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        id: u64,
        name: &str,
        category: &str,
        verified: bool,
        location: &str,
        state: &str,
        moq: u32,
        price_min: f64,
        rating: u32,
    ) -> Supplier {
        Supplier {
            id,
            name: name.to_string(),
            category: category.to_string(),
            verified,
            location: location.to_string(),
            state: state.to_string(),
            moq,
            unit: "Tons".to_string(),
            price_min,
            price_max: price_min + 400.0,
            price_unit: "Ton".to_string(),
            sustainability_rating: rating,
        }
    }

    fn listing() -> Vec<Supplier> {
        vec![
            entry(1, "GreenPulse Bio-Energy", "Power Plant", true, "Ludhiana", "Punjab", 50, 2400.0, 85),
            entry(2, "EverLeaf Paper Mills", "Paper Industry", true, "Karnal", "Haryana", 100, 3000.0, 92),
            entry(3, "Eco-Brick Solutions", "Construction", false, "Meerut", "Uttar Pradesh", 20, 2000.0, 65),
            entry(4, "AgroFuel Ltd.", "Ethanol Plant", true, "Bikaner", "Rajasthan", 200, 2600.0, 78),
            entry(5, "Sustaina-Box Co.", "Packaging", true, "Ambala", "Haryana", 10, 3200.0, 88),
            entry(6, "BioHarvest India", "Power Plant", true, "Amritsar", "Punjab", 75, 2100.0, 71),
        ]
    }

    fn ids(page: &ListingPage) -> Vec<u64> {
        page.entries.iter().map(|s| s.id).collect()
    }

    #[test]
    fn text_filter_matches_name_category_and_location() {
        let l = listing();
        let mut f = FilterState::default();
        f.set_search("paper");
        let (page, dbg) = query(&l, &f);
        assert_eq!(ids(&page), [2]);
        assert_eq!(dbg.after_text, 1);

        f.set_search("AMRIT");
        let (page, _) = query(&l, &f);
        assert_eq!(ids(&page), [6]);

        f.set_search("no such supplier");
        let (page, _) = query(&l, &f);
        assert!(page.entries.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn location_filter_ors_over_selection_and_fields() {
        let l = listing();
        let mut f = FilterState::default();
        f.toggle_location("Punjab");
        f.toggle_location("Rajasthan");
        let (page, dbg) = query(&l, &f);
        assert_eq!(ids(&page), [1, 4, 6]);
        assert_eq!(dbg.after_locations, 3);

        // City names match through the location field too.
        let mut f = FilterState::default();
        f.toggle_location("Karnal");
        let (page, _) = query(&l, &f);
        assert_eq!(ids(&page), [2]);
    }

    #[test]
    fn toggle_location_removes_on_second_call() {
        let mut f = FilterState::default();
        f.toggle_location("Punjab");
        f.toggle_location("Punjab");
        assert!(f.locations.is_empty());
    }

    #[test]
    fn moq_threshold_is_inclusive_and_zero_passes_all() {
        let l = listing();
        let mut f = FilterState::default();
        f.set_min_moq(75);
        let (page, dbg) = query(&l, &f);
        assert_eq!(ids(&page), [2, 4, 6]);
        assert_eq!(dbg.after_moq, 3);

        f.set_min_moq(0);
        let (page, _) = query(&l, &f);
        assert_eq!(page.total, 6);
    }

    #[test]
    fn verified_filter_is_asymmetric() {
        let l = listing();
        let mut f = FilterState::default();
        f.set_verified_only(true);
        let (page, dbg) = query(&l, &f);
        assert_eq!(page.total, 5);
        assert!(page.entries.iter().all(|s| s.verified));
        assert_eq!(dbg.after_verified, 5);

        // `false` means "no restriction", not "only unverified".
        f.set_verified_only(false);
        let (page, _) = query(&l, &f);
        assert_eq!(page.total, 6);
    }

    #[test]
    fn sort_keys_order_and_keep_ties_stable() {
        let l = listing();
        let mut f = FilterState::default();

        f.set_sort(SortKey::PriceLow);
        let (page, _) = query(&l, &f);
        assert_eq!(ids(&page), [3, 6, 1, 4, 2, 5]);

        f.set_sort(SortKey::PriceHigh);
        let (page, _) = query(&l, &f);
        assert_eq!(ids(&page), [5, 2, 4, 1, 6, 3]);

        f.set_sort(SortKey::Rating);
        let (page, _) = query(&l, &f);
        assert_eq!(ids(&page), [2, 5, 1, 4, 6, 3]);

        // Equal ratings keep listing order.
        let mut tied = listing();
        for s in tied.iter_mut() {
            s.sustainability_rating = 80;
        }
        f.set_sort(SortKey::Rating);
        let (page, _) = query(&tied, &f);
        assert_eq!(ids(&page), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn sort_key_parse_falls_back_to_default() {
        assert_eq!(SortKey::parse("price-low"), SortKey::PriceLow);
        assert_eq!(SortKey::parse("rating"), SortKey::Rating);
        assert_eq!(SortKey::parse("bogus"), SortKey::Latest);
    }

    #[test]
    fn facets_dedupe_in_first_seen_order() {
        assert_eq!(
            location_facets(&listing()),
            ["Punjab", "Haryana", "Uttar Pradesh", "Rajasthan"]
        );
    }

    #[test]
    fn shop_filter_by_type_and_price_range() {
        let products = zestraw_core::builtin::products();
        let f = ShopFilter { product_type: Some("Bowls".to_string()), ..Default::default() };
        let hits = filter_products(&products, &f);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| p.product_type.as_deref() == Some("Bowls")));

        let f = ShopFilter { price_min: 20.0, price_max: 30.0, ..Default::default() };
        let hits = filter_products(&products, &f);
        assert!(hits.iter().all(|p| (20.0..=30.0).contains(&p.price)));
        assert_eq!(hits.len(), 3);
    }
}
