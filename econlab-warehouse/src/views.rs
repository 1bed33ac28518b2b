//! Warehouse schema and analytic views.
//!
//! Table DDL is fixed. The two pivot views depend on which indicators are
//! configured, so their column lists are generated.

use rusqlite::Connection;

pub const SCHEMA: &str = r#"
CREATE TABLE economic_indicators (
    country_name   TEXT NOT NULL,
    country_code   TEXT NOT NULL,
    indicator_code TEXT NOT NULL,
    indicator_name TEXT NOT NULL,
    year           INTEGER NOT NULL,
    value          REAL,
    PRIMARY KEY (indicator_code, year)
);

CREATE INDEX idx_economic_indicators_year ON economic_indicators(year);
CREATE INDEX idx_economic_indicators_name ON economic_indicators(indicator_name);

CREATE TABLE dim_indicators (
    indicator_code TEXT PRIMARY KEY,
    indicator_name TEXT NOT NULL,
    category       TEXT NOT NULL,
    unit           TEXT NOT NULL,
    description    TEXT NOT NULL,
    is_derived     INTEGER NOT NULL
);

CREATE TABLE indicator_summary (
    indicator_code  TEXT PRIMARY KEY,
    indicator_name  TEXT NOT NULL,
    record_count    INTEGER NOT NULL,
    min_year        INTEGER NOT NULL,
    max_year        INTEGER NOT NULL,
    mean_value      REAL NOT NULL,
    std_value       REAL,
    min_value       REAL NOT NULL,
    max_value       REAL NOT NULL,
    trend_slope     REAL,
    trend_intercept REAL
);
"#;

const LATEST_VIEW: &str = r#"
CREATE VIEW v_latest_indicators AS
WITH ranked AS (
    SELECT
        indicator_code,
        indicator_name,
        year,
        value,
        LAG(value) OVER (PARTITION BY indicator_code ORDER BY year) AS previous_value,
        ROW_NUMBER() OVER (PARTITION BY indicator_code ORDER BY year DESC) AS recency
    FROM economic_indicators
)
SELECT
    indicator_code,
    indicator_name,
    year,
    value,
    previous_value,
    value - previous_value AS change
FROM ranked
WHERE recency = 1;
"#;

/// One pivoted column: rows with `indicator_code` become column `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotColumn {
    pub indicator_code: String,
    pub alias: String,
}

/// Quote a string literal for SQL.
pub fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote an identifier for SQL.
pub fn sql_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// `CREATE VIEW` pivoting `columns` by year. With no columns the view still
/// lists every year present in the fact table.
pub fn pivot_view_sql(view: &str, columns: &[PivotColumn]) -> String {
    if columns.is_empty() {
        return format!(
            "CREATE VIEW {} AS\nSELECT DISTINCT year\nFROM economic_indicators\nORDER BY year;\n",
            sql_ident(view)
        );
    }

    let selects: Vec<String> = columns
        .iter()
        .map(|c| {
            format!(
                "    MAX(CASE WHEN indicator_code = {} THEN value END) AS {}",
                sql_literal(&c.indicator_code),
                sql_ident(&c.alias)
            )
        })
        .collect();
    let codes: Vec<String> = columns.iter().map(|c| sql_literal(&c.indicator_code)).collect();

    format!(
        "CREATE VIEW {} AS\nSELECT\n    year,\n{}\nFROM economic_indicators\nWHERE indicator_code IN ({})\nGROUP BY year\nORDER BY year;\n",
        sql_ident(view),
        selects.join(",\n"),
        codes.join(", ")
    )
}

/// Create the latest-value, structure and growth views.
pub fn create_views(
    conn: &Connection,
    structure: &[PivotColumn],
    growth: &[PivotColumn],
) -> Result<(), rusqlite::Error> {
    conn.execute_batch(LATEST_VIEW)?;
    conn.execute_batch(&pivot_view_sql("v_economic_structure", structure))?;
    conn.execute_batch(&pivot_view_sql("v_growth_trends", growth))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO economic_indicators VALUES
                ('Bangladesh','BGD','NV.AGR.TOTL.ZS','agriculture_pct_gdp',2000,24.0),
                ('Bangladesh','BGD','NV.AGR.TOTL.ZS','agriculture_pct_gdp',2001,23.5),
                ('Bangladesh','BGD','NV.AGR.TOTL.ZS','agriculture_pct_gdp',2002,22.0),
                ('Bangladesh','BGD','NV.IND.TOTL.ZS','industry_pct_gdp',2001,25.0);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(sql_literal("it's"), "'it''s'");
        assert_eq!(sql_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn latest_view_has_previous_value_and_change() {
        let conn = seeded();
        create_views(&conn, &[], &[]).unwrap();

        let (year, value, previous, change): (i32, f64, f64, f64) = conn
            .query_row(
                "SELECT year, value, previous_value, change FROM v_latest_indicators
                 WHERE indicator_code = 'NV.AGR.TOTL.ZS'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!((year, value, previous), (2002, 22.0, 23.5));
        assert!((change + 1.5).abs() < 1e-12);

        let single: Option<f64> = conn
            .query_row(
                "SELECT previous_value FROM v_latest_indicators WHERE indicator_code = 'NV.IND.TOTL.ZS'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(single, None);
    }

    #[test]
    fn structure_view_pivots_by_year() {
        let conn = seeded();
        let structure = vec![
            PivotColumn {
                indicator_code: "NV.AGR.TOTL.ZS".into(),
                alias: "agriculture_pct_gdp".into(),
            },
            PivotColumn {
                indicator_code: "NV.IND.TOTL.ZS".into(),
                alias: "industry_pct_gdp".into(),
            },
        ];
        create_views(&conn, &structure, &[]).unwrap();

        let rows: Vec<(i32, Option<f64>, Option<f64>)> = conn
            .prepare("SELECT year, agriculture_pct_gdp, industry_pct_gdp FROM v_economic_structure")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                (2000, Some(24.0), None),
                (2001, Some(23.5), Some(25.0)),
                (2002, Some(22.0), None),
            ]
        );

        let years: i64 = conn
            .query_row("SELECT COUNT(*) FROM v_growth_trends", [], |r| r.get(0))
            .unwrap();
        assert_eq!(years, 3);
    }
}
