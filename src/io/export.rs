//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header for CSV telemetry export.
const HEADER: &str = "timestep,time_s,supply_w,demand_w,storage_w,difference_w,\
                       satisfaction,velocity_mps,generator_force_n,friction_loss_j,\
                       efficiency_loss_j,carts_on_track,reserve_top,reserve_bottom";

/// Exports simulation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `results` - Complete simulation step results
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes simulation results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.timestep.to_string(),
            format!("{:.1}", r.time_s),
            format!("{:.3}", r.supply_w),
            format!("{:.3}", r.demand_w),
            format!("{:.3}", r.storage_w),
            format!("{:.3}", r.difference_w),
            format!("{:.6}", r.satisfaction),
            format!("{:.6}", r.velocity_mps),
            format!("{:.3}", r.generator_force_n),
            format!("{:.3}", r.friction_loss_j),
            format!("{:.3}", r.efficiency_loss_j),
            r.carts_on_track.to_string(),
            r.reserve_top.to_string(),
            r.reserve_bottom.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
