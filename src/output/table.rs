//! Table output formatting

use tabled::{
    Table, Tabled,
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Format rows as a rounded table
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    format_table_or(data, "No results found.")
}

/// Format rows as a rounded table, or `empty` when there are none
pub fn format_table_or<T: Tabled>(data: &[T], empty: &str) -> String {
    if data.is_empty() {
        return empty.to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Two-column key/value table without a header row
pub fn format_properties(rows: &[(&str, String)]) -> String {
    let mut builder = Builder::default();
    for (key, value) in rows {
        builder.push_record([key.to_string(), value.clone()]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Tabled)]
    struct TestRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "SEVERITY")]
        severity: String,
    }

    #[test]
    fn test_format_table_empty() {
        let items: Vec<TestRow> = vec![];
        assert_eq!(format_table(&items), "No results found.");
        assert_eq!(format_table_or(&items, "Nothing archived."), "Nothing archived.");
    }

    #[test]
    fn test_format_table_rows_and_style() {
        let items = vec![
            TestRow {
                id: "F-1".to_string(),
                severity: "high".to_string(),
            },
            TestRow {
                id: "F-2".to_string(),
                severity: "low".to_string(),
            },
        ];

        let result = format_table(&items);

        assert!(result.contains("SEVERITY"));
        assert!(result.contains("F-1"));
        assert!(result.contains("F-2"));
        assert!(result.contains("╭"));
        assert!(result.contains("╰"));
    }

    #[test]
    fn test_format_properties() {
        let result = format_properties(&[("Target", "https://example.com".to_string())]);
        assert!(result.contains("Target"));
        assert!(result.contains("https://example.com"));
    }
}
