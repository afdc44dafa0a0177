use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashSet;

/// An ingested table. Every cell is kept as text; typing happens at plot time.
///
/// Rows are stored row-major. All rows have exactly `headers.len()` cells and
/// header names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(anyhow!("Duplicate column name '{}'", header));
            }
        }

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(anyhow!(
                    "Row {} has {} cells, expected {}",
                    row_idx + 1,
                    row.len(),
                    headers.len()
                ));
            }
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn cell_count(&self) -> usize {
        self.num_rows() * self.num_columns()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All values of a column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Replace every `,` with `.` in every cell.
    ///
    /// This fixes decimal-comma notation but is applied to all cells, numeric
    /// or not. Headers are left alone.
    pub fn normalize_decimal_commas(&mut self) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.contains(',') {
                *cell = cell.replace(',', ".");
            }
        }
    }

    pub fn preview(&self, max_rows: usize) -> Preview {
        Preview {
            columns: self.headers.clone(),
            rows: self.rows.iter().take(max_rows).cloned().collect(),
            total_rows: self.rows.len(),
        }
    }
}

/// First rows of a table plus its full column list, as shown after upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

/// Turn raw header cells into unique column names.
///
/// Blank names become `Unnamed: {i}`; repeats get `.1`, `.2`, ... appended.
pub fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (idx, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}
