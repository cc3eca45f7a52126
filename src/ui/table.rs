use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Render label/count pairs, e.g. ingest diagnostics or per-table row counts.
pub fn counts_table(rows: &[(&str, usize)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, count) in rows {
        builder.add_row(label, count);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_renders_nothing() {
        assert_eq!(counts_table(&[]), "");
    }

    #[test]
    fn test_counts_table_lists_rows() {
        let table = counts_table(&[("files", 3), ("ast_nodes", 12)]);
        assert!(table.contains("Metric"));
        assert!(table.contains("ast_nodes"));
        assert!(table.contains("12"));
    }
}
