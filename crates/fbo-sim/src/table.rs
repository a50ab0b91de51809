//! Tabular view of a finished run.
//!
//! Vector fields with more than one component are flattened into `name_i`
//! component columns; single-component vectors and scalar fields keep the
//! plain field name. Fields that a variant does not produce are absent
//! from the table rather than null-filled.

use std::fs::File;
use std::path::Path;

use faer::{FaerMat, Mat};
use polars::prelude::*;

use fbo_algo::record::IterationRecord;

use crate::simulation::SimulationRun;
use crate::SimulationError;

impl SimulationRun {
    /// Flatten the trajectory into a `DataFrame` with a `t` index column
    /// and the record fields in order `u, y, phi, y_violation,
    /// z, nu_h, lamb_y, p, d`.
    pub fn to_dataframe(&self) -> Result<DataFrame, SimulationError> {
        let records = self.records();
        let mut columns: Vec<Series> = Vec::new();

        let t: Vec<u32> = (0..records.len() as u32).collect();
        columns.push(Series::new("t", t));

        columns.extend(vector_columns("u", records, |r| Some(&r.u)));
        columns.extend(vector_columns("y", records, |r| Some(&r.y)));
        columns.push(scalar_column("phi", records, |r| r.phi));
        columns.push(scalar_column("y_violation", records, |r| r.y_violation));
        columns.extend(vector_columns("z", records, |r| r.z.as_ref()));
        columns.extend(vector_columns("nu_h", records, |r| r.nu_h.as_ref()));
        columns.extend(vector_columns("lamb_y", records, |r| r.lamb_y.as_ref()));
        columns.extend(vector_columns("p", records, |r| r.p.as_ref()));
        if records.first().is_some_and(|r| r.d.is_some()) {
            columns.push(scalar_column("d", records, |r| {
                r.d.expect("d is annotated on every record or none")
            }));
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Persist the trajectory table as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<(), SimulationError> {
        let mut df = self.to_dataframe()?;
        let file = File::create(path)?;
        CsvWriter::new(file).finish(&mut df)?;
        Ok(())
    }
}

fn scalar_column(
    name: &str,
    records: &[IterationRecord],
    get: impl Fn(&IterationRecord) -> f64,
) -> Series {
    let values: Vec<f64> = records.iter().map(get).collect();
    Series::new(name, values)
}

fn vector_columns<'r>(
    name: &str,
    records: &'r [IterationRecord],
    get: impl Fn(&'r IterationRecord) -> Option<&'r Mat<f64>>,
) -> Vec<Series> {
    let dim = match records.first().and_then(&get) {
        Some(field) => field.nrows(),
        None => return Vec::new(),
    };
    (0..dim)
        .map(|i| {
            let values: Vec<f64> = records
                .iter()
                .map(|r| {
                    get(r)
                        .expect("field is carried by every record or none")
                        .read(i, 0)
                })
                .collect();
            if dim == 1 {
                Series::new(name, values)
            } else {
                Series::new(&format!("{name}_{i}"), values)
            }
        })
        .collect()
}
