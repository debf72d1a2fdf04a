//! # Simulation モジュール
//!
//! 空気砲シミュレーションの中核となるシナリオ実行器を提供します。
//!
//! 起動時に一度だけ基準投射物で摩擦係数を較正し、その後は発射圧・発射角を
//! 変えながら何度でも各投射物の弾道を評価できます。実行器が保持する状態は
//! 較正済みの摩擦係数のみで、評価のたびに新しい結果を生成します。
//!
//! ## 処理の流れ
//!
//! 1. **物理定数の構築**: シナリオ設定から `PhysicalConstants` を生成
//! 2. **摩擦係数の較正**: 基準投射物の飛距離が目標距離に一致するよう二分探索
//! 3. **シナリオ評価**: 投射物ごとに初速・経路・最終飛距離・指定距離での速さを計算
//!
//! ## 使用例
//!
//! ```rust
//! use cannonsim::scenario::ScenarioConfig;
//! use cannonsim::simulation::{LaunchInputs, ScenarioRunner};
//!
//! let config = ScenarioConfig::default();
//! let runner = ScenarioRunner::new(&config, 0).unwrap();
//!
//! let report = runner.run(&LaunchInputs::new(100.0, 45.0)).unwrap();
//! assert_eq!(report.projectiles.len(), 2);
//! ```

use serde::Serialize;
use tracing::{debug, info};

use crate::models::{
    common::units, CalibrationResult, FrictionCalibrator, FrictionFactor, IVelocityEstimator,
    MuzzleVelocityEstimator, ProjectileSpec, Saturation, SimError, TrajectoryIntegrator,
    TrajectorySample,
};
use crate::scenario::ScenarioConfig;

/// 実行器が保持する投射物
#[derive(Debug, Clone)]
struct LoadedProjectile {
    spec: ProjectileSpec,
    relative_friction: f64,
}

/// 利用者が選ぶ発射条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchInputs {
    pub pressure_psi: f64,
    pub angle_deg: f64,
    /// 基準以外の投射物に適用する相対摩擦倍率（未指定ならシナリオの値）
    pub relative_friction: Option<f64>,
}

impl LaunchInputs {
    pub fn new(pressure_psi: f64, angle_deg: f64) -> Self {
        Self {
            pressure_psi,
            angle_deg,
            relative_friction: None,
        }
    }

    pub fn with_relative_friction(mut self, relative_friction: f64) -> Self {
        self.relative_friction = Some(relative_friction);
        self
    }
}

/// 投射物ごとの評価結果
#[derive(Debug, Clone, Serialize)]
pub struct ProjectileOutcome {
    pub id: String,
    pub name: String,
    /// 適用した摩擦係数
    pub friction_factor: FrictionFactor,
    /// 発射速度（m/s）
    pub launch_speed: f64,
    /// 最終飛距離（経路の最終点の x, m）
    pub final_range: f64,
    /// 最高到達高度（m）
    pub apex: f64,
    /// 指定距離での速さ（m/s、未到達なら0）
    pub speed_at_sample: f64,
    pub trajectory: TrajectorySample,
}

/// シナリオ評価結果
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub pressure_psi: f64,
    pub angle_deg: f64,
    pub sample_distance: f64,
    pub calibration: CalibrationResult,
    pub projectiles: Vec<ProjectileOutcome>,
}

impl ScenarioReport {
    pub fn projectile(&self, id: &str) -> Option<&ProjectileOutcome> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    /// 評価結果を表示（ft / mph 表記）
    pub fn print(&self, reference_id: &str) {
        println!("=== 飛翔結果 ({:.0} PSI, {:.0}°) ===", self.pressure_psi, self.angle_deg);
        if let Some(reference) = self.projectile(reference_id) {
            println!(
                "{} 発射速度: {:.1} mph",
                reference.name,
                units::mps_to_mph(reference.launch_speed)
            );
        }
        for outcome in &self.projectiles {
            println!(
                "{} 最終飛距離: {:.1} ft",
                outcome.name,
                units::m_to_feet(outcome.final_range)
            );
        }
        if let Some(reference) = self.projectile(reference_id) {
            println!(
                "{} {:.0}ft 地点の速さ: {:.1} mph",
                reference.name,
                units::m_to_feet(self.sample_distance),
                units::mps_to_mph(reference.speed_at_sample)
            );
        }
    }
}

/// シナリオ実行器
///
/// 生成時に摩擦係数を一度だけ較正し、以後は不変です。
/// 評価メソッドは `&self` のみを取るため、複数スレッドから同時に呼び出せます。
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    estimator: MuzzleVelocityEstimator,
    integrator: TrajectoryIntegrator,
    projectiles: Vec<LoadedProjectile>,
    reference_id: String,
    calibration: CalibrationResult,
    sample_distance: f64,
    verbose_level: u8,
}

impl ScenarioRunner {
    /// シナリオ設定から実行器を作成し、摩擦係数を較正します
    pub fn new(scenario: &ScenarioConfig, verbose_level: u8) -> Result<Self, Box<dyn std::error::Error>> {
        scenario.validate()?;

        let constants = scenario.physical_constants()?;
        let estimator = MuzzleVelocityEstimator::new(constants);
        let integrator = TrajectoryIntegrator::new(constants, scenario.sim.dt_s, scenario.sim.max_steps)?;

        let mut projectiles = Vec::with_capacity(scenario.projectiles.len());
        for projectile in &scenario.projectiles {
            projectiles.push(LoadedProjectile {
                spec: projectile.to_spec()?,
                relative_friction: projectile.relative_friction,
            });
        }

        let reference_id = scenario.calibration.reference.clone();
        let reference = projectiles
            .iter()
            .find(|p| p.spec.id == reference_id)
            .ok_or_else(|| SimError::InvalidPhysicalInput(format!("unknown reference {}", reference_id)))?;

        if verbose_level > 0 {
            info!("摩擦係数を較正中 (基準: {})...", reference.spec.name);
        }
        let calibrator = FrictionCalibrator::new(&estimator, &integrator, scenario.calibration_config())?;
        let calibration = calibrator.calibrate(&reference.spec)?;

        if verbose_level > 1 {
            debug!(
                "較正結果: 係数={:.6} 理想初速={:.2}m/s 飛距離={:.2}m 飽和={:?}",
                calibration.factor.value(),
                calibration.ideal_velocity,
                calibration.achieved_range,
                calibration.saturation
            );
        }

        Ok(Self {
            estimator,
            integrator,
            projectiles,
            reference_id,
            calibration,
            sample_distance: scenario.launch.sample_distance_m,
            verbose_level,
        })
    }

    pub fn calibration(&self) -> &CalibrationResult {
        &self.calibration
    }

    pub fn friction_factor(&self) -> FrictionFactor {
        self.calibration.factor
    }

    pub fn is_saturated(&self) -> bool {
        self.calibration.saturation != Saturation::None
    }

    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    pub fn sample_distance(&self) -> f64 {
        self.sample_distance
    }

    /// 1つの投射物を指定の摩擦係数で評価します
    pub fn evaluate(
        &self,
        projectile: &ProjectileSpec,
        factor: FrictionFactor,
        pressure_psi: f64,
        angle_deg: f64,
    ) -> Result<ProjectileOutcome, SimError> {
        let ideal = self.estimator.ideal_velocity(projectile.mass(), pressure_psi)?;
        let launch_speed = factor.apply(ideal);

        let trajectory = self.integrator.trajectory(projectile, launch_speed, angle_deg)?;
        let speed_at_sample =
            self.integrator
                .speed_at_distance(projectile, launch_speed, angle_deg, self.sample_distance)?;

        Ok(ProjectileOutcome {
            id: projectile.id.clone(),
            name: projectile.name.clone(),
            friction_factor: factor,
            launch_speed,
            final_range: trajectory.final_range(),
            apex: trajectory.apex(),
            speed_at_sample,
            trajectory,
        })
    }

    /// 全投射物を評価します
    pub fn run(&self, inputs: &LaunchInputs) -> Result<ScenarioReport, SimError> {
        let mut outcomes = Vec::with_capacity(self.projectiles.len());

        for projectile in &self.projectiles {
            let relative = if projectile.spec.id == self.reference_id {
                1.0
            } else {
                inputs.relative_friction.unwrap_or(projectile.relative_friction)
            };
            let factor = self.calibration.factor.scaled(relative)?;
            let outcome = self.evaluate(&projectile.spec, factor, inputs.pressure_psi, inputs.angle_deg)?;

            if self.verbose_level > 1 {
                debug!(
                    "{}: 初速={:.2}m/s 飛距離={:.2}m 経路点数={}",
                    outcome.name,
                    outcome.launch_speed,
                    outcome.final_range,
                    outcome.trajectory.len()
                );
            }
            outcomes.push(outcome);
        }

        Ok(ScenarioReport {
            pressure_psi: inputs.pressure_psi,
            angle_deg: inputs.angle_deg,
            sample_distance: self.sample_distance,
            calibration: self.calibration,
            projectiles: outcomes,
        })
    }
}
