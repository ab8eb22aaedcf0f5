use crate::offering::Offering;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seat totals for one region, shown on the region picker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionAvailability {
    pub total_seats: u64,
    pub available_seats: u64,
    pub offerings: usize,
}

impl RegionAvailability {
    /// Share of seats already taken, in whole percent.
    pub fn utilization_percent(&self) -> u8 {
        if self.total_seats == 0 {
            return 0;
        }
        let taken = self.total_seats.saturating_sub(self.available_seats);
        // taken <= total, so the quotient is at most 100
        ((taken * 100) / self.total_seats) as u8
    }
}

/// Group offerings by region and add up their seats.
pub fn summarize_by_region<'a, I>(offerings: I) -> BTreeMap<String, RegionAvailability>
where
    I: IntoIterator<Item = &'a Offering>,
{
    let mut summary: BTreeMap<String, RegionAvailability> = BTreeMap::new();

    for offering in offerings {
        let entry = summary.entry(offering.region.clone()).or_default();
        entry.total_seats += u64::from(offering.total_seats);
        entry.available_seats += u64::from(offering.remaining_seats);
        entry.offerings += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_offerings;

    #[test]
    fn test_summary_per_region() {
        let offerings = parse_offerings(serde_json::json!([
            {"id": 1, "course_name": "ITI", "branch": "Fitter", "total_seats": 35, "left_seats": 20, "price_per_seat": "429.99"},
            {"id": 2, "course_name": "ITI", "branch": "Welder", "total_seats": 30, "left_seats": 30, "price_per_seat": "399.99"},
            {"id": 3, "course_name": "ITI", "branch": "Plumber", "total_seats": 40, "left_seats": 10, "price_per_seat": "399.99", "city": "Bhopal"}
        ]))
        .unwrap();

        let summary = summarize_by_region(&offerings);

        assert_eq!(summary.len(), 2);
        let jabalpur = &summary["Jabalpur"];
        assert_eq!(jabalpur.total_seats, 65);
        assert_eq!(jabalpur.available_seats, 50);
        assert_eq!(jabalpur.offerings, 2);
        assert_eq!(summary["Bhopal"].utilization_percent(), 75);
        assert_eq!(RegionAvailability::default().utilization_percent(), 0);
    }
}
