//! SQL text for the two aggregate queries the pipeline issues.
//!
//! Result columns are aliased so the CSV the store returns deserializes
//! straight into the row types in [`crate::model`].

use serde::Deserialize;

/// BNF code prefixes selecting the drug classes under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BnfSelection {
    pub include_prefixes: Vec<String>,
    pub exclude_prefixes: Vec<String>,
}

impl Default for BnfSelection {
    fn default() -> Self {
        Self {
            // antidepressants, opioid analgesics, antipsychotics
            include_prefixes: vec![
                "0403".to_string(),
                "0407010".to_string(),
                "0402".to_string(),
            ],
            exclude_prefixes: vec!["0407010B0".to_string()],
        }
    }
}

/// Monthly items and cost per (region, chemical), restricted to the selected
/// BNF prefixes and to CCG-type organisations.
pub fn prescribing_sql(bnf: &BnfSelection) -> String {
    let includes = if bnf.include_prefixes.is_empty() {
        "TRUE".to_string()
    } else {
        bnf.include_prefixes
            .iter()
            .map(|p| format!("rx.bnf_code LIKE '{p}%'"))
            .collect::<Vec<_>>()
            .join(" OR ")
    };
    let excludes = if bnf.exclude_prefixes.is_empty() {
        "TRUE".to_string()
    } else {
        bnf.exclude_prefixes
            .iter()
            .map(|p| format!("rx.bnf_code NOT LIKE '{p}%'"))
            .collect::<Vec<_>>()
            .join(" AND ")
    };

    format!(
        r#"WITH bnf_tab AS (
  SELECT DISTINCT chemical, chemical_code
  FROM hscic.bnf )
SELECT
  rx.month AS month,
  rx.pct AS region_id,
  SUBSTR(rx.bnf_code, 1, 9) AS chemical_code,
  chemical AS chemical_name,
  SUM(items) AS total_items,
  SUM(actual_cost) AS total_cost
FROM hscic.normalised_prescribing_standard AS rx
LEFT JOIN bnf_tab
  ON chemical_code = SUBSTR(rx.bnf_code, 1, 9)
JOIN hscic.ccgs AS ccgs
  ON rx.pct = ccgs.code
WHERE ({includes})
  AND ({excludes})
  AND ccgs.org_type = 'CCG'
GROUP BY month, region_id, chemical_code, chemical_name
ORDER BY month"#
    )
}

/// Registered list size per (region, month) from practice statistics.
pub fn list_size_sql() -> String {
    r#"SELECT
  month,
  pct_id AS region_id,
  SUM(total_list_size) AS list_size
FROM hscic.practice_statistics
GROUP BY month, region_id
ORDER BY month, region_id"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prescribing_sql_carries_selected_prefixes() {
        let sql = prescribing_sql(&BnfSelection::default());
        assert!(sql.contains("rx.bnf_code LIKE '0403%'"));
        assert!(sql.contains("rx.bnf_code LIKE '0407010%'"));
        assert!(sql.contains("rx.bnf_code LIKE '0402%'"));
        assert!(sql.contains("rx.bnf_code NOT LIKE '0407010B0%'"));
        assert!(sql.contains("ccgs.org_type = 'CCG'"));
    }

    #[test]
    fn result_columns_match_row_types() {
        let sql = prescribing_sql(&BnfSelection::default());
        for alias in [
            "AS region_id",
            "AS chemical_code",
            "AS chemical_name",
            "AS total_items",
            "AS total_cost",
        ] {
            assert!(sql.contains(alias), "missing alias {alias:?}");
        }
        assert!(list_size_sql().contains("AS list_size"));
    }
}
