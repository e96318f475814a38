//! Grid rendering for the terminal (table, CSV, JSON)

use colored::Colorize;

use crate::error::{Result, UpError};
use crate::grid::Grid;

/// Output format enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns with a highlighted header (default)
    #[default]
    Table,

    /// RFC 4180 CSV, ready to paste into a spreadsheet
    Csv,

    /// Array of row arrays
    Json,
}

pub fn render(grid: &Grid, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(grid)),
        OutputFormat::Csv => render_csv(grid),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(grid)?),
    }
}

/// Columns padded to their widest cell; the first row is drawn as a header
pub fn render_table(grid: &Grid) -> String {
    let rows: Vec<Vec<String>> = grid
        .rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let mut widths = vec![0usize; grid.width()];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for (index, row) in rows.iter().enumerate() {
        let line = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let pad = widths[i].saturating_sub(cell.chars().count());
                format!("{}{}", cell, " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("  ");
        let line = line.trim_end();

        if index == 0 {
            if grid.is_error() {
                out.push_str(&line.red().bold().to_string());
            } else {
                out.push_str(&line.bold().to_string());
            }
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Rows of unequal length are padded so every record has the same width
pub fn render_csv(grid: &Grid) -> Result<String> {
    let width = grid.width();
    let mut writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(Vec::new());

    for row in grid.rows() {
        let mut record: Vec<String> = row.iter().map(ToString::to_string).collect();
        record.resize(width, String::new());
        writer.write_record(&record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| UpError::Io(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| UpError::Io(std::io::Error::other(e.to_string())))
}

fn csv_error(e: csv::Error) -> UpError {
    UpError::Io(std::io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    fn sample() -> Grid {
        let mut grid = Grid::with_header(&["Category ID", "Category Name"]);
        grid.push(vec![Cell::text("takeaway"), Cell::text("Takeaway, etc")]);
        grid.push(vec![Cell::text("all"), Cell::text("All")]);
        grid
    }

    #[test]
    fn csv_quotes_commas() {
        let csv = render_csv(&sample()).unwrap();
        assert_eq!(
            csv,
            "Category ID,Category Name\ntakeaway,\"Takeaway, etc\"\nall,All\n"
        );
    }

    #[test]
    fn csv_pads_ragged_rows() {
        let grid = Grid::from_rows(vec![
            vec![Cell::text("API Error")],
            vec![Cell::text("401"), Cell::text("Not Authorized"), Cell::text("bad")],
        ]);
        let csv = render_csv(&grid).unwrap();
        assert_eq!(csv, "API Error,,\n401,Not Authorized,bad\n");
    }

    #[test]
    fn table_aligns_columns() {
        colored::control::set_override(false);
        let table = render_table(&sample());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Category ID  Category Name");
        assert_eq!(lines[1], "takeaway     Takeaway, etc");
        assert_eq!(lines[2], "all          All");
    }

    #[test]
    fn json_is_array_of_arrays() {
        let json = render(&sample(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[1][0], "takeaway");
        assert_eq!(parsed.as_array().unwrap().len(), 3);
    }

    #[test]
    fn default_is_table() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }
}
