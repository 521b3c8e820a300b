// src/pipeline/aggregate.rs
use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::extractors::indicators::{Indicator, IndicatorRecord};

/// One entity's headline figures rolled up to a single fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub entity_name: String,
    pub fiscal_year: i32,
    pub revenue: Option<i64>,
    pub operating_income: Option<i64>,
    pub ordinary_income: Option<i64>,
    pub net_income: Option<i64>,
}

/// Groups indicator records by (entity, year of submission date) and takes
/// the maximum of each headline figure across the group — the same
/// consolidated-wins heuristic the extractor applies within one document,
/// here applied across filings (e.g. an original and its correction both
/// landing in the same year).
///
/// A group whose records carry no usable indicator still emits a row, so
/// year continuity survives into presentation.
pub fn aggregate_trends(records: &[IndicatorRecord]) -> Vec<TrendRecord> {
    let mut groups: BTreeMap<(String, i32), Vec<&IndicatorRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.entity_name.clone(), record.date.year()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((entity_name, fiscal_year), group)| TrendRecord {
            entity_name,
            fiscal_year,
            revenue: max_of(&group, Indicator::NetSales),
            operating_income: max_of(&group, Indicator::OperatingIncome),
            ordinary_income: max_of(&group, Indicator::OrdinaryIncome),
            net_income: max_of(&group, Indicator::NetIncome),
        })
        .collect()
}

fn max_of(group: &[&IndicatorRecord], indicator: Indicator) -> Option<i64> {
    group
        .iter()
        .filter_map(|r| r.values.get(&indicator).map(|v| v.raw))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::indicators::{format_value, IndicatorValue};
    use chrono::NaiveDate;

    fn rec(entity: &str, doc_id: &str, date: &str, values: &[(Indicator, i64)]) -> IndicatorRecord {
        IndicatorRecord {
            entity_name: entity.to_string(),
            doc_id: doc_id.to_string(),
            date: date.parse::<NaiveDate>().unwrap(),
            fiscal_period_end: None,
            values: values
                .iter()
                .map(|&(i, raw)| (i, IndicatorValue { raw, display: format_value(raw) }))
                .collect(),
        }
    }

    #[test]
    fn groups_by_entity_and_year_taking_the_maximum() {
        let records = vec![
            rec("トヨタ", "S1", "2023-06-23", &[(Indicator::NetSales, 100), (Indicator::NetIncome, 10)]),
            rec("トヨタ", "S2", "2023-09-01", &[(Indicator::NetSales, 500)]),
            rec("トヨタ", "S3", "2022-06-24", &[(Indicator::NetSales, 300)]),
            rec("ホンダ", "S4", "2023-06-23", &[(Indicator::NetSales, 200)]),
        ];

        let trends = aggregate_trends(&records);
        assert_eq!(trends.len(), 3);

        let toyota_2023 = trends
            .iter()
            .find(|t| t.entity_name == "トヨタ" && t.fiscal_year == 2023)
            .unwrap();
        assert_eq!(toyota_2023.revenue, Some(500));
        assert_eq!(toyota_2023.net_income, Some(10));
        assert_eq!(toyota_2023.operating_income, None);
    }

    #[test]
    fn group_without_indicators_still_emits_a_row() {
        let records = vec![rec("トヨタ", "S1", "2021-06-25", &[])];
        let trends = aggregate_trends(&records);
        assert_eq!(
            trends,
            vec![TrendRecord {
                entity_name: "トヨタ".to_string(),
                fiscal_year: 2021,
                revenue: None,
                operating_income: None,
                ordinary_income: None,
                net_income: None,
            }]
        );
    }

    #[test]
    fn output_is_ordered_by_entity_then_year() {
        let records = vec![
            rec("ホンダ", "S1", "2023-06-23", &[(Indicator::NetSales, 1)]),
            rec("トヨタ", "S2", "2023-06-23", &[(Indicator::NetSales, 1)]),
            rec("トヨタ", "S3", "2022-06-24", &[(Indicator::NetSales, 1)]),
        ];
        let trends = aggregate_trends(&records);
        let keys: Vec<(&str, i32)> = trends
            .iter()
            .map(|t| (t.entity_name.as_str(), t.fiscal_year))
            .collect();
        assert_eq!(keys, vec![("トヨタ", 2022), ("トヨタ", 2023), ("ホンダ", 2023)]);
    }

    #[test]
    fn aggregation_ignores_arrival_order() {
        let mut records = vec![
            rec("トヨタ", "S1", "2023-06-23", &[(Indicator::NetSales, 100)]),
            rec("トヨタ", "S2", "2023-06-26", &[(Indicator::NetSales, 500)]),
        ];
        let forward = aggregate_trends(&records);
        records.reverse();
        let backward = aggregate_trends(&records);
        assert_eq!(forward, backward);
    }
}
