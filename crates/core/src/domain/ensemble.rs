// Parameter ensembles and sweep result tables

use std::io;

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result as DomainResult};
use crate::error::{AppError, Result};

/// Header of the leading realization-name column in sweep input files
const REAL_NAME_COLUMN: &str = "real_name";

/// One labelled realization of the parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleRow {
    pub label: String,
    pub values: Vec<f64>,
}

/// A parameter ensemble: named columns, labelled rows of values, and an
/// optional pre-rendered control document written when the caller names no
/// control file of their own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterEnsemble {
    columns: Vec<String>,
    rows: Vec<EnsembleRow>,
    control: Option<String>,
}

impl ParameterEnsemble {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            control: None,
        }
    }

    /// Attach the control document serialized alongside the ensemble
    pub fn with_control(mut self, control: impl Into<String>) -> Self {
        self.control = Some(control.into());
        self
    }

    pub fn push_row(&mut self, label: impl Into<String>, values: Vec<f64>) -> DomainResult<()> {
        if values.len() != self.columns.len() {
            return Err(DomainError::ColumnCountMismatch {
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.rows.push(EnsembleRow {
            label: label.into(),
            values,
        });
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[EnsembleRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn control(&self) -> Option<&str> {
        self.control.as_deref()
    }

    /// Serialize to the row/column sweep input format: realization label
    /// first, then one column per parameter.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(REAL_NAME_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.label.clone());
            record.extend(row.values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Parse an ensemble from the same row/column format
    pub fn read_csv<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        if headers.is_empty() {
            return Err(AppError::Validation("ensemble file has no header".into()));
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut ensemble = Self::new(columns);

        for record in rdr.records() {
            let record = record?;
            let label = record
                .get(0)
                .ok_or_else(|| AppError::Validation("ensemble row has no label".into()))?
                .to_string();
            let values = record
                .iter()
                .skip(1)
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|_| {
                        AppError::Validation(format!(
                            "non-numeric parameter value {field:?} in row {label}"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            ensemble.push_row(label, values)?;
        }
        Ok(ensemble)
    }
}

/// Sweep output table: rows keyed by the leading run-index column, with
/// lowercased column names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SweepTable {
    /// Load a result table, lowercasing the column names
    pub fn read_csv<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.to_lowercase()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { columns, rows })
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by the value of its leading run-index column
    pub fn get(&self, key: &str) -> Option<&Vec<String>> {
        self.rows.iter().find(|row| row.first().map(String::as_str) == Some(key))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.columns.iter().position(|c| *c == wanted)
    }
}
