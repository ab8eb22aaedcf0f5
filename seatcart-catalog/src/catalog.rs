use crate::offering::{Offering, OfferingId, OfferingRecord};
use seatcart_shared::ErrorKind;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Offerings available in one region, in display order.
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    region: String,
    offerings: Vec<Offering>,
    index: HashMap<OfferingId, usize>,
}

/// Case-insensitive, with the raw text breaking ties so the order is total.
fn display_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

impl CourseCatalog {
    pub fn empty(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            offerings: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Keep the offerings located in `region`, sorted by course name and then branch.
    pub fn for_region<I>(region: impl Into<String>, offerings: I) -> Self
    where
        I: IntoIterator<Item = Offering>,
    {
        let region = region.into();
        let mut offerings: Vec<Offering> = offerings
            .into_iter()
            .filter(|o| o.region == region)
            .collect();

        offerings.sort_by(|a, b| {
            display_order(&a.course_name, &b.course_name).then_with(|| display_order(&a.branch, &b.branch))
        });

        let index = offerings
            .iter()
            .enumerate()
            .map(|(i, o)| (o.id.clone(), i))
            .collect();

        Self { region, offerings, index }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn get(&self, id: &OfferingId) -> Option<&Offering> {
        self.index.get(id).map(|&i| &self.offerings[i])
    }

    /// Display position of an offering, used to order snapshots.
    pub fn position(&self, id: &OfferingId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Offering> {
        self.offerings.iter()
    }

    pub fn len(&self) -> usize {
        self.offerings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offerings.is_empty()
    }

    /// Apply a remaining-seat count observed after someone else booked seats.
    /// Counts only ever go down while a session is open.
    pub fn record_remaining(&mut self, id: &OfferingId, remaining: u32) -> Result<(), CatalogError> {
        let position = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        let offering = &mut self.offerings[position];

        if remaining > offering.remaining_seats {
            return Err(CatalogError::RemainingIncreased {
                id: id.to_string(),
                current: offering.remaining_seats,
                reported: remaining,
            });
        }

        offering.remaining_seats = remaining;
        Ok(())
    }
}

/// Parse the course service response into offerings.
///
/// Anything other than a list of well-formed records counts as a failed fetch.
pub fn parse_offerings(response: serde_json::Value) -> Result<Vec<Offering>, CatalogError> {
    let serde_json::Value::Array(items) = response else {
        return Err(CatalogError::Malformed("expected a list of offerings".to_string()));
    };

    let mut seen = HashMap::with_capacity(items.len());
    let mut offerings = Vec::with_capacity(items.len());

    for (position, item) in items.into_iter().enumerate() {
        let record: OfferingRecord = serde_json::from_value(item)
            .map_err(|e| CatalogError::Malformed(format!("offering #{}: {}", position, e)))?;
        let offering = Offering::try_from(record).map_err(CatalogError::Malformed)?;

        if seen.insert(offering.id.clone(), position).is_some() {
            return Err(CatalogError::Malformed(format!("duplicate offering id {}", offering.id)));
        }
        offerings.push(offering);
    }

    Ok(offerings)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Offering not found: {0}")]
    NotFound(String),

    #[error("Malformed catalog response: {0}")]
    Malformed(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Remaining seats for {id} cannot grow from {current} to {reported}")]
    RemainingIncreased {
        id: String,
        current: u32,
        reported: u32,
    },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound(_) | CatalogError::RemainingIncreased { .. } => ErrorKind::Validation,
            CatalogError::Malformed(_) | CatalogError::Unavailable(_) => ErrorKind::External,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!([
            {"id": 1, "course_name": "M.Tech", "branch": "Robotics", "total_seats": 30, "left_seats": 30, "price_per_seat": "1999.99"},
            {"id": 2, "course_name": "B.Tech", "branch": "Mechanical Engineering", "total_seats": 80, "left_seats": 12, "price_per_seat": "1299.99"},
            {"id": 3, "course_name": "B.Tech", "branch": "Civil Engineering", "total_seats": 70, "left_seats": 0, "price_per_seat": "1199.99"},
            {"id": 4, "course_name": "ITI", "branch": "Welder", "total_seats": 30, "left_seats": 30, "price_per_seat": "399.99", "city": "Bhopal"}
        ])
    }

    #[test]
    fn test_region_filter_and_order() {
        let offerings = parse_offerings(sample()).unwrap();
        let catalog = CourseCatalog::for_region("Jabalpur", offerings);

        assert_eq!(catalog.len(), 3);
        let branches: Vec<&str> = catalog.iter().map(|o| o.branch.as_str()).collect();
        assert_eq!(branches, vec!["Civil Engineering", "Mechanical Engineering", "Robotics"]);
        assert_eq!(catalog.position(&OfferingId::from("1")), Some(2));
        assert!(catalog.get(&OfferingId::from("4")).is_none());
    }

    #[test]
    fn test_order_ignores_case() {
        let offerings = parse_offerings(json!([
            {"id": 1, "course_name": "MBA", "branch": "Finance", "total_seats": 10, "left_seats": 10, "price_per_seat": "10.00"},
            {"id": 2, "course_name": "b.tech", "branch": "Civil", "total_seats": 10, "left_seats": 10, "price_per_seat": "10.00"},
            {"id": 3, "course_name": "B.Tech", "branch": "Civil", "total_seats": 10, "left_seats": 10, "price_per_seat": "10.00"}
        ]))
        .unwrap();
        let catalog = CourseCatalog::for_region("Jabalpur", offerings);

        let ids: Vec<String> = catalog.iter().map(|o| o.id.to_string()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(
            parse_offerings(json!({"message": "Internal error"})),
            Err(CatalogError::Malformed(_))
        ));
        assert!(matches!(
            parse_offerings(json!([{"id": 1, "branch": "Fitter"}])),
            Err(CatalogError::Malformed(_))
        ));

        let duplicated = json!([
            {"id": 1, "course_name": "ITI", "branch": "Fitter", "total_seats": 1, "left_seats": 1, "price_per_seat": "1.00"},
            {"id": 1, "course_name": "ITI", "branch": "Turner", "total_seats": 1, "left_seats": 1, "price_per_seat": "1.00"}
        ]);
        let err = parse_offerings(duplicated).unwrap_err();
        assert_eq!(err, CatalogError::Malformed("duplicate offering id 1".to_string()));
    }

    #[test]
    fn test_remaining_only_decreases() {
        let mut catalog = CourseCatalog::for_region("Jabalpur", parse_offerings(sample()).unwrap());
        let id = OfferingId::from("2");

        catalog.record_remaining(&id, 10).unwrap();
        assert_eq!(catalog.get(&id).unwrap().remaining_seats, 10);

        let err = catalog.record_remaining(&id, 11).unwrap_err();
        assert!(matches!(err, CatalogError::RemainingIncreased { current: 10, reported: 11, .. }));

        assert!(matches!(
            catalog.record_remaining(&OfferingId::from("99"), 0),
            Err(CatalogError::NotFound(_))
        ));
    }
}
