//! # Sweep モジュール
//!
//! 発射圧と発射角の組み合わせを一括評価するパラメータスイープを提供します。
//!
//! 各組み合わせは独立したジョブとして tokio のブロッキングスレッドプールで実行されます。
//! ジョブ間で共有されるのは較正済みの `ScenarioRunner`（不変）だけで、
//! 積分状態はジョブごとに生成されます。

use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::{Builder, Handle};
use tracing::{debug, info};

use crate::models::SimError;
use crate::simulation::{LaunchInputs, ScenarioRunner};

/// 投射物ごとのスイープ結果
#[derive(Debug, Clone, Serialize)]
pub struct SweepEntry {
    pub id: String,
    pub launch_speed: f64,
    pub final_range: f64,
    pub speed_at_sample: f64,
}

/// 1組の発射条件に対するスイープ結果
#[derive(Debug, Clone, Serialize)]
pub struct SweepRow {
    pub pressure_psi: f64,
    pub angle_deg: f64,
    pub entries: Vec<SweepEntry>,
}

/// スイープ実行エラー
#[derive(Debug)]
pub enum SweepError {
    Runtime(std::io::Error),
    /// 既存の tokio ランタイム内から同期版を呼び出した
    NestedRuntime,
    Join(String),
    Simulation(SimError),
}

impl std::fmt::Display for SweepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepError::Runtime(err) => write!(f, "ランタイム初期化エラー: {}", err),
            SweepError::NestedRuntime => {
                write!(f, "run_sweep はランタイム内から呼び出せません (sweep_async を使用してください)")
            }
            SweepError::Join(msg) => write!(f, "ジョブ実行エラー: {}", msg),
            SweepError::Simulation(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SweepError {}

impl From<SimError> for SweepError {
    fn from(err: SimError) -> Self {
        SweepError::Simulation(err)
    }
}

fn evaluate_row(runner: &ScenarioRunner, pressure_psi: f64, angle_deg: f64) -> Result<SweepRow, SimError> {
    let report = runner.run(&LaunchInputs::new(pressure_psi, angle_deg))?;
    let entries = report
        .projectiles
        .into_iter()
        .map(|outcome| SweepEntry {
            id: outcome.id,
            launch_speed: outcome.launch_speed,
            final_range: outcome.final_range,
            speed_at_sample: outcome.speed_at_sample,
        })
        .collect();

    Ok(SweepRow {
        pressure_psi,
        angle_deg,
        entries,
    })
}

/// 全組み合わせを並列に評価します
///
/// 専用のマルチスレッドランタイムを生成してブロックするため、
/// tokio ランタイム内からは呼び出せません（`SweepError::NestedRuntime` を返します）。
/// 非同期コンテキストでは [`sweep_async`] を使用してください。
/// 結果は入力順（発射圧ごとに発射角を並べた順）で返ります。
pub fn run_sweep(
    runner: Arc<ScenarioRunner>,
    pressures_psi: &[f64],
    angles_deg: &[f64],
) -> Result<Vec<SweepRow>, SweepError> {
    if Handle::try_current().is_ok() {
        return Err(SweepError::NestedRuntime);
    }

    let runtime = Builder::new_multi_thread()
        .build()
        .map_err(SweepError::Runtime)?;

    runtime.block_on(sweep_async(runner, pressures_psi, angles_deg))
}

/// 呼び出し側のランタイム上で全組み合わせを評価します
///
/// 各組み合わせはブロッキングスレッドプールで実行されます。
pub async fn sweep_async(
    runner: Arc<ScenarioRunner>,
    pressures_psi: &[f64],
    angles_deg: &[f64],
) -> Result<Vec<SweepRow>, SweepError> {
    let combinations: Vec<(f64, f64)> = pressures_psi
        .iter()
        .flat_map(|&p| angles_deg.iter().map(move |&a| (p, a)))
        .collect();

    info!("スイープ開始: {}条件", combinations.len());

    let handles: Vec<_> = combinations
        .iter()
        .map(|&(pressure, angle)| {
            let runner = Arc::clone(&runner);
            tokio::task::spawn_blocking(move || evaluate_row(&runner, pressure, angle))
        })
        .collect();

    let mut rows = Vec::with_capacity(handles.len());
    for handle in handles {
        let row = handle.await.map_err(|e| SweepError::Join(e.to_string()))??;
        debug!("スイープ条件完了: {:.0} psi, {:.1}°", row.pressure_psi, row.angle_deg);
        rows.push(row);
    }

    info!("スイープ完了: {}行", rows.len());
    Ok(rows)
}

/// スイープ結果を表形式で表示（ft 表記）
pub fn print_sweep(rows: &[SweepRow]) {
    println!("=== パラメータスイープ ===");
    for row in rows {
        let ranges: Vec<String> = row
            .entries
            .iter()
            .map(|e| format!("{}={:.1}ft", e.id, crate::models::units::m_to_feet(e.final_range)))
            .collect();
        println!("{:>5.0} psi {:>5.1}°  {}", row.pressure_psi, row.angle_deg, ranges.join("  "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioConfig;

    #[test]
    fn test_sweep_matches_sequential_runs() {
        let runner = Arc::new(ScenarioRunner::new(&ScenarioConfig::default(), 0).unwrap());
        let pressures = [40.0, 100.0, 120.0];
        let angles = [30.0, 45.0];

        let rows = run_sweep(Arc::clone(&runner), &pressures, &angles).unwrap();
        assert_eq!(rows.len(), 6);

        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.pressure_psi, pressures[i / angles.len()]);
            assert_eq!(row.angle_deg, angles[i % angles.len()]);

            let report = runner.run(&LaunchInputs::new(row.pressure_psi, row.angle_deg)).unwrap();
            for (entry, outcome) in row.entries.iter().zip(&report.projectiles) {
                assert_eq!(entry.id, outcome.id);
                assert_eq!(entry.final_range, outcome.final_range);
            }
        }

        // 40 psi, 30° の Tシャツ
        assert!((rows[0].entries[0].final_range - 26.40541355609847).abs() < 1e-6);
    }

    #[test]
    fn test_sweep_propagates_errors() {
        let runner = Arc::new(ScenarioRunner::new(&ScenarioConfig::default(), 0).unwrap());
        let result = run_sweep(runner, &[100.0], &[45.0, 95.0]);
        assert!(matches!(result, Err(SweepError::Simulation(_))));
    }

    #[test]
    fn test_sweep_inside_existing_runtime() {
        let runner = Arc::new(ScenarioRunner::new(&ScenarioConfig::default(), 0).unwrap());
        let runtime = Builder::new_multi_thread().build().unwrap();

        // 同期版はパニックせずエラーを返す
        let nested = runtime.block_on(async { run_sweep(Arc::clone(&runner), &[40.0], &[30.0]) });
        assert!(matches!(nested, Err(SweepError::NestedRuntime)));

        let rows = runtime
            .block_on(sweep_async(Arc::clone(&runner), &[40.0], &[30.0]))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].entries[0].final_range - 26.40541355609847).abs() < 1e-6);
    }
}
