//! Client-side filtering, sorting and pagination over already loaded listings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{Property, PropertyType, ValidationError};

/// User-selected listing filters. Empty dimensions match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilter {
    /// Inclusive lower price bound
    pub min_price: Option<u64>,
    /// Inclusive upper price bound
    pub max_price: Option<u64>,
    pub bedrooms: Vec<u32>,
    pub bathrooms: Vec<u32>,
    pub property_types: Vec<PropertyType>,
    /// Case-insensitive substrings of the address or city
    pub locations: Vec<String>,
    /// Case-insensitive free text over name, description, address and city
    pub search: Option<String>,
}

impl PropertyFilter {
    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.bedrooms.is_empty()
            && self.bathrooms.is_empty()
            && self.property_types.is_empty()
            && self.locations.iter().all(|l| l.trim().is_empty())
            && self.search_term().is_none()
    }

    pub fn with_price_range(mut self, min: u64, max: u64) -> Self {
        self.min_price = Some(min);
        self.max_price = Some(max);
        self
    }

    pub fn with_min_price(mut self, min: u64) -> Self {
        self.min_price = Some(min);
        self
    }

    pub fn with_max_price(mut self, max: u64) -> Self {
        self.max_price = Some(max);
        self
    }

    pub fn with_property_types(mut self, types: impl IntoIterator<Item = PropertyType>) -> Self {
        self.property_types = types.into_iter().collect();
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// The `(min, max)` price bounds, swapped when both are set out of order
    pub fn normalized_price_range(&self) -> (Option<u64>, Option<u64>) {
        match (self.min_price, self.max_price) {
            (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
            bounds => bounds,
        }
    }

    pub(crate) fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, property: &Property) -> bool {
        let (min, max) = self.normalized_price_range();
        if min.is_some_and(|min| property.price < min) || max.is_some_and(|max| property.price > max) {
            return false;
        }
        if !self.bedrooms.is_empty() && !self.bedrooms.contains(&property.bedrooms) {
            return false;
        }
        if !self.bathrooms.is_empty() && !self.bathrooms.contains(&property.bathrooms) {
            return false;
        }
        if !self.property_types.is_empty() {
            match property.property_type {
                Some(kind) if self.property_types.contains(&kind) => {}
                _ => return false,
            }
        }

        let locations: Vec<String> = self
            .locations
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        if !locations.is_empty() {
            let address = property.address.to_lowercase();
            let city = property.city.to_lowercase();
            if !locations
                .iter()
                .any(|l| address.contains(l.as_str()) || city.contains(l.as_str()))
            {
                return false;
            }
        }

        if let Some(term) = self.search_term() {
            let haystacks = [
                &property.name,
                &property.description,
                &property.address,
                &property.city,
            ];
            if !haystacks
                .iter()
                .any(|h| h.to_lowercase().contains(term.as_str()))
            {
                return false;
            }
        }

        true
    }
}

/// Properties passing `filter`, in their original order
pub fn apply_filters(items: &[Property], filter: &PropertyFilter) -> Vec<Property> {
    if filter.is_empty() {
        return items.to_vec();
    }
    items.iter().filter(|p| filter.matches(p)).cloned().collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    SizeDesc,
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "newest" => Ok(SortOrder::Newest),
            "price-asc" => Ok(SortOrder::PriceAsc),
            "price-desc" => Ok(SortOrder::PriceDesc),
            "size-desc" => Ok(SortOrder::SizeDesc),
            other => Err(ValidationError::Invalid {
                field: "sort",
                reason: format!("unknown sort order '{}'", other),
            }),
        }
    }
}

/// Stable sort; properties without a creation date go last for `Newest`
pub fn sort_properties(items: &mut [Property], order: SortOrder) {
    match order {
        SortOrder::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::PriceAsc => items.sort_by_key(|p| p.price),
        SortOrder::PriceDesc => items.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::SizeDesc => items.sort_by(|a, b| b.size_sqft.cmp(&a.size_sqft)),
    }
}

/// One page sliced out of an in-memory list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedResults<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> PaginatedResults<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1 && self.total_pages > 0
    }
}

/// Slice `items` into 1-based pages of `limit` items.
///
/// `total_pages` is `ceil(len / limit)`. Page 0 is read as page 1, pages past
/// the end are empty, and a zero limit yields no pages at all.
pub fn paginate_results<T: Clone>(items: &[T], page: usize, limit: usize) -> PaginatedResults<T> {
    let page = page.max(1);
    let total_items = items.len();
    if limit == 0 {
        return PaginatedResults {
            items: Vec::new(),
            page,
            limit,
            total_items,
            total_pages: 0,
        };
    }

    let total_pages = total_items.div_ceil(limit);
    let start = (page - 1).saturating_mul(limit).min(total_items);
    let end = start.saturating_add(limit).min(total_items);

    PaginatedResults {
        items: items[start..end].to_vec(),
        page,
        limit,
        total_items,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mock_properties;

    #[test]
    fn empty_filter_returns_input_unchanged() {
        let items = mock_properties();
        let filter = PropertyFilter::default();
        assert!(filter.is_empty());
        assert_eq!(apply_filters(&items, &filter), items);
    }

    #[test]
    fn whitespace_only_dimensions_count_as_unset() {
        let filter = PropertyFilter {
            search: Some("   ".into()),
            locations: vec![" ".into()],
            ..Default::default()
        };
        assert!(filter.is_empty());
    }

    #[test]
    fn price_range_is_inclusive_and_exact() {
        let items = mock_properties();
        let (min, max) = (2_500_000, 8_500_000);
        let filter = PropertyFilter::default().with_price_range(min, max);
        let result = apply_filters(&items, &filter);

        assert!(!result.is_empty());
        assert!(result.iter().all(|p| p.price >= min && p.price <= max));
        let excluded = items.iter().filter(|p| !result.contains(p));
        for p in excluded {
            assert!(p.price < min || p.price > max, "{} wrongly excluded", p.id);
        }
    }

    #[test]
    fn price_range_bounds_are_inclusive() {
        let items = mock_properties();
        let exact = items[0].price;
        let result = apply_filters(&items, &PropertyFilter::default().with_price_range(exact, exact));
        assert!(result.iter().any(|p| p.id == items[0].id));
    }

    #[test]
    fn single_price_bound_leaves_the_other_side_open() {
        let items = mock_properties();
        let floor = apply_filters(&items, &PropertyFilter::default().with_min_price(8_000_000));
        assert!(!floor.is_empty());
        assert!(floor.iter().all(|p| p.price >= 8_000_000));

        let ceiling = apply_filters(&items, &PropertyFilter::default().with_max_price(2_000_000));
        assert!(!ceiling.is_empty());
        assert!(ceiling.iter().all(|p| p.price <= 2_000_000));
    }

    #[test]
    fn inverted_price_range_is_normalized() {
        let items = mock_properties();
        let forward = apply_filters(&items, &PropertyFilter::default().with_price_range(1_000_000, 5_000_000));
        let inverted = apply_filters(&items, &PropertyFilter::default().with_price_range(5_000_000, 1_000_000));
        assert_eq!(forward, inverted);
    }

    #[test]
    fn dimensions_combine_with_and() {
        let items = mock_properties();
        let filter = PropertyFilter {
            bedrooms: vec![3, 4],
            locations: vec!["MIAMI".into()],
            ..Default::default()
        };
        let result = apply_filters(&items, &filter);
        assert!(!result.is_empty());
        for p in &result {
            assert!(p.bedrooms == 3 || p.bedrooms == 4);
            assert!(
                p.city.to_lowercase().contains("miami") || p.address.to_lowercase().contains("miami")
            );
        }
    }

    #[test]
    fn search_is_case_insensitive_over_text_fields() {
        let items = mock_properties();
        let result = apply_filters(&items, &PropertyFilter::default().with_search("OCEAN"));
        assert!(!result.is_empty());
        assert!(result.iter().all(|p| {
            [&p.name, &p.description, &p.address, &p.city]
                .iter()
                .any(|h| h.to_lowercase().contains("ocean"))
        }));
    }

    #[test]
    fn untyped_properties_fail_a_type_filter() {
        let mut items = mock_properties();
        items[0].property_type = None;
        let filter = PropertyFilter::default().with_property_types(PropertyType::ALL);
        let result = apply_filters(&items, &filter);
        assert_eq!(result.len(), items.len() - 1);
    }

    #[test]
    fn sorts_by_price() {
        let mut items = mock_properties();
        sort_properties(&mut items, SortOrder::PriceAsc);
        assert!(items.windows(2).all(|w| w[0].price <= w[1].price));
        sort_properties(&mut items, SortOrder::PriceDesc);
        assert!(items.windows(2).all(|w| w[0].price >= w[1].price));
    }

    #[test]
    fn pagination_covers_every_item_once_in_order() {
        let items: Vec<u32> = (0..23).collect();
        let limit = 5;
        let first = paginate_results(&items, 1, limit);
        assert_eq!(first.total_pages, 5);
        assert_eq!(first.total_items, 23);

        let rebuilt: Vec<u32> = (1..=first.total_pages)
            .flat_map(|page| paginate_results(&items, page, limit).items)
            .collect();
        assert_eq!(rebuilt, items);
    }

    #[test]
    fn pagination_edges() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(paginate_results(&items, 0, 4).items, vec![0, 1, 2, 3]);
        assert!(paginate_results(&items, 9, 4).items.is_empty());
        assert_eq!(paginate_results(&items, 1, 0).total_pages, 0);
        assert_eq!(paginate_results::<u32>(&[], 1, 4).total_pages, 0);

        let last = paginate_results(&items, 3, 4);
        assert_eq!(last.items, vec![8, 9]);
        assert!(!last.has_next());
        assert!(last.has_previous());
    }
}
