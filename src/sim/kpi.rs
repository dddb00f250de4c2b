//! Post-hoc KPI computation from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

const J_PER_KWH: f64 = 3.6e6;

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<StepResult>` to ensure consistency between
/// step data and reported metrics. Rows before the warm-up boundary are
/// skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiReport {
    /// Ticks that entered the aggregates.
    pub measured_steps: usize,
    /// Energy generated (kWh).
    pub supply_energy_kwh: f64,
    /// Energy consumed (kWh).
    pub demand_energy_kwh: f64,
    /// Supply minus demand energy (kWh).
    pub net_surplus_kwh: f64,
    /// Energy moved through the track in either direction (kWh).
    pub storage_throughput_kwh: f64,
    /// Demand left uncovered after storage (kWh, positive difference).
    pub unmet_energy_kwh: f64,
    /// Generation left over after storage (kWh, negative difference).
    pub surplus_energy_kwh: f64,
    /// Root-mean-square grid difference (kW).
    pub rmse_difference_kw: f64,
    /// Mean absolute grid difference (kW).
    pub mae_difference_kw: f64,
    /// Mean of the per-tick satisfaction.
    pub mean_satisfaction: f64,
    /// Friction losses (kWh).
    pub friction_loss_kwh: f64,
    /// Generator losses (kWh).
    pub efficiency_loss_kwh: f64,
    /// Largest ensemble speed (m/s).
    pub peak_speed_mps: f64,
    pub min_carts_on_track: usize,
    pub max_carts_on_track: usize,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    /// * `dt_s` - Tick length in seconds
    /// * `warmup_s` - Rows with `time_s` below this are ignored
    ///
    /// # Returns
    ///
    /// A `KpiReport` with all fields populated, or all zeros when no row is
    /// past the warm-up.
    pub fn from_results(results: &[StepResult], dt_s: f64, warmup_s: f64) -> Self {
        let measured: Vec<&StepResult> = results.iter().filter(|r| r.time_s >= warmup_s).collect();
        if measured.is_empty() {
            return Self::default();
        }

        let n = measured.len() as f64;
        let hours = dt_s / 3600.0;
        let mut report = Self {
            measured_steps: measured.len(),
            min_carts_on_track: usize::MAX,
            ..Self::default()
        };
        let mut sq_sum = 0.0;
        let mut abs_sum = 0.0;
        let mut satisfaction_sum = 0.0;

        for r in &measured {
            let diff_kw = r.difference_w / 1e3;
            sq_sum += diff_kw * diff_kw;
            abs_sum += diff_kw.abs();
            satisfaction_sum += r.satisfaction;

            report.supply_energy_kwh += r.supply_w / 1e3 * hours;
            report.demand_energy_kwh += r.demand_w / 1e3 * hours;
            report.storage_throughput_kwh += r.storage_w.abs() / 1e3 * hours;
            if diff_kw > 0.0 {
                report.unmet_energy_kwh += diff_kw * hours;
            } else {
                report.surplus_energy_kwh += -diff_kw * hours;
            }

            report.friction_loss_kwh += r.friction_loss_j / J_PER_KWH;
            report.efficiency_loss_kwh += r.efficiency_loss_j / J_PER_KWH;
            report.peak_speed_mps = report.peak_speed_mps.max(r.velocity_mps.abs());
            report.min_carts_on_track = report.min_carts_on_track.min(r.carts_on_track);
            report.max_carts_on_track = report.max_carts_on_track.max(r.carts_on_track);
        }

        report.net_surplus_kwh = report.supply_energy_kwh - report.demand_energy_kwh;
        report.rmse_difference_kw = (sq_sum / n).sqrt();
        report.mae_difference_kw = abs_sum / n;
        report.mean_satisfaction = satisfaction_sum / n;
        report
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Measured ticks:        {}", self.measured_steps)?;
        writeln!(
            f,
            "Supply / demand:       {:.1} / {:.1} kWh (net {:+.1} kWh)",
            self.supply_energy_kwh, self.demand_energy_kwh, self.net_surplus_kwh
        )?;
        writeln!(f, "Storage throughput:    {:.1} kWh", self.storage_throughput_kwh)?;
        writeln!(
            f,
            "Unmet / surplus:       {:.1} / {:.1} kWh",
            self.unmet_energy_kwh, self.surplus_energy_kwh
        )?;
        writeln!(f, "RMSE difference:       {:.3} kW", self.rmse_difference_kw)?;
        writeln!(f, "MAE difference:        {:.3} kW", self.mae_difference_kw)?;
        writeln!(f, "Mean satisfaction:     {:.4}", self.mean_satisfaction)?;
        writeln!(
            f,
            "Losses:                {:.2} kWh friction, {:.2} kWh generator",
            self.friction_loss_kwh, self.efficiency_loss_kwh
        )?;
        writeln!(f, "Peak speed:            {:.2} m/s", self.peak_speed_mps)?;
        write!(
            f,
            "Carts on track:        {}..={}",
            self.min_carts_on_track, self.max_carts_on_track
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(time_s: f64, supply_w: f64, demand_w: f64, storage_w: f64) -> StepResult {
        StepResult {
            timestep: 0,
            time_s,
            supply_w,
            demand_w,
            storage_w,
            difference_w: demand_w - supply_w + storage_w,
            satisfaction: if demand_w > 0.0 {
                (supply_w - storage_w) / demand_w
            } else {
                1.0
            },
            velocity_mps: 0.0,
            generator_force_n: 0.0,
            friction_loss_j: 0.0,
            efficiency_loss_j: 0.0,
            carts_on_track: 1,
            reserve_top: 0,
            reserve_bottom: 0,
        }
    }

    #[test]
    fn rmse_computation() {
        // differences (kW): [1, -1, 2, -2]; mean square 2.5
        let results: Vec<StepResult> = [1.0e3_f64, -1.0e3, 2.0e3, -2.0e3]
            .iter()
            .map(|&d| make_result(0.0, 0.0, d.max(0.0), d.min(0.0)))
            .collect();
        let kpi = KpiReport::from_results(&results, 3600.0, 0.0);
        assert!((kpi.rmse_difference_kw - 2.5_f64.sqrt()).abs() < 1e-9);
        assert!((kpi.mae_difference_kw - 1.5).abs() < 1e-9);
        assert!((kpi.unmet_energy_kwh - 3.0).abs() < 1e-9);
        assert!((kpi.surplus_energy_kwh - 3.0).abs() < 1e-9);
    }

    #[test]
    fn energy_totals() {
        // One hour ticks of 2 kW supply and 1 kW demand, storage absorbing 1 kW.
        let results = vec![make_result(0.0, 2.0e3, 1.0e3, 1.0e3); 3];
        let kpi = KpiReport::from_results(&results, 3600.0, 0.0);
        assert!((kpi.supply_energy_kwh - 6.0).abs() < 1e-9);
        assert!((kpi.demand_energy_kwh - 3.0).abs() < 1e-9);
        assert!((kpi.net_surplus_kwh - 3.0).abs() < 1e-9);
        assert!((kpi.storage_throughput_kwh - 3.0).abs() < 1e-9);
        assert_eq!(kpi.rmse_difference_kw, 0.0);
        assert_eq!(kpi.mean_satisfaction, 1.0);
    }

    #[test]
    fn warmup_rows_are_skipped() {
        let mut results = vec![make_result(0.0, 0.0, 1.0e6, 0.0)];
        results.push(make_result(100.0, 1.0e3, 1.0e3, 0.0));
        let kpi = KpiReport::from_results(&results, 100.0, 50.0);
        assert_eq!(kpi.measured_steps, 1);
        assert_eq!(kpi.rmse_difference_kw, 0.0);
    }

    #[test]
    fn cart_range_and_speed() {
        let mut results = vec![make_result(0.0, 0.0, 0.0, 0.0); 3];
        results[0].carts_on_track = 4;
        results[1].carts_on_track = 0;
        results[2].velocity_mps = -7.5;
        let kpi = KpiReport::from_results(&results, 1.0, 0.0);
        assert_eq!(kpi.min_carts_on_track, 0);
        assert_eq!(kpi.max_carts_on_track, 4);
        assert_eq!(kpi.peak_speed_mps, 7.5);
    }

    #[test]
    fn empty_results() {
        let kpi = KpiReport::from_results(&[], 1.0, 0.0);
        assert_eq!(kpi.rmse_difference_kw, 0.0);
        assert_eq!(kpi.measured_steps, 0);
    }
}
