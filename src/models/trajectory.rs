use serde::Serialize;
use tracing::trace;

use crate::models::{
    common::{validation, Acceleration2D, Position2D, SimError, Velocity2D},
    physical::{PhysicalConstants, ProjectileSpec},
    traits::IRangeModel,
};

/// 既定の積分時間刻み（秒）
pub const DEFAULT_DT: f64 = 0.01;
/// 1回の飛翔で許容する最大ステップ数
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// 飛翔中の投射物の状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchState {
    pub position: Position2D,
    pub velocity: Velocity2D,
}

impl LaunchState {
    /// 原点から初速と仰角で発射された状態を作成
    pub fn launch(v0: f64, angle_deg: f64) -> Self {
        Self {
            position: Position2D::origin(),
            velocity: Velocity2D::from_polar(v0, angle_deg),
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }
}

/// 飛翔の終了理由
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightEnd {
    /// 発射高さより下に到達した
    Impact,
    /// 観測側の停止条件が成立した
    Observed,
    /// 速さが0になった（抗力方向が定義できないため終端扱い）
    Stalled,
}

/// 飛翔計算の結果
#[derive(Debug, Clone, Copy)]
pub struct FlightOutcome {
    /// 終了時点の状態
    pub state: LaunchState,
    /// 実行した積分ステップ数
    pub steps: u64,
    pub end: FlightEnd,
}

/// 飛翔経路（各ステップ更新前の位置の時系列）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectorySample {
    points: Vec<(f64, f64)>,
}

impl TrajectorySample {
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 最終記録点の水平距離（m）
    pub fn final_range(&self) -> f64 {
        self.points.last().map(|&(x, _)| x).unwrap_or(0.0)
    }

    /// 最高到達高度（m）
    pub fn apex(&self) -> f64 {
        self.points.iter().map(|&(_, y)| y).fold(0.0, f64::max)
    }
}

/// 弾道積分器
///
/// 二次抗力と重力のもとで、固定時間刻みの前進オイラー法により2次元の弾道を計算します。
/// 飛距離・経路・指定距離での速さの3種の計算はすべて同一のステップ計算を共有するため、
/// 較正結果とシナリオ出力は互いに整合します。
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryIntegrator {
    constants: PhysicalConstants,
    dt: f64,
    max_steps: u64,
}

impl TrajectoryIntegrator {
    /// 新しい積分器を作成します
    ///
    /// # 引数
    ///
    /// * `constants` - 物理定数
    /// * `dt` - 時間刻み（秒、正の値）
    /// * `max_steps` - 1回の飛翔の最大ステップ数（1以上）
    pub fn new(constants: PhysicalConstants, dt: f64, max_steps: u64) -> Result<Self, SimError> {
        validation::require_positive("dt", dt)?;
        if max_steps == 0 {
            return Err(SimError::InvalidPhysicalInput("max_steps must be at least 1".to_string()));
        }
        Ok(Self { constants, dt, max_steps })
    }

    pub fn with_defaults(constants: PhysicalConstants) -> Self {
        Self {
            constants,
            dt: DEFAULT_DT,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// 抗力係数項 `0.5·ρ·Cd·A`
    fn drag_factor(&self, projectile: &ProjectileSpec) -> f64 {
        0.5 * self.constants.air_density() * self.constants.drag_coefficient() * projectile.cross_section_area()
    }

    /// 1ステップ進める（速度を更新してから位置を更新）
    fn advance(&self, state: &mut LaunchState, drag_factor: f64, mass: f64, speed: f64) {
        let drag = drag_factor * speed.powi(2);
        let accel = Acceleration2D::new(
            -(drag / mass) * (state.velocity.x / speed),
            -(drag / mass) * (state.velocity.y / speed) - self.constants.gravity(),
        );

        state.velocity = state.velocity + accel * self.dt;
        state.position = state.position + state.velocity * self.dt;
    }

    /// 着弾するか `observe` が true を返すまで飛翔を計算します
    ///
    /// `observe` は各ステップの更新前の状態で呼ばれます。
    /// 速さが0の状態は終端として扱い、ステップは実行しません。
    pub fn fly<F>(
        &self,
        projectile: &ProjectileSpec,
        v0: f64,
        angle_deg: f64,
        mut observe: F,
    ) -> Result<FlightOutcome, SimError>
    where
        F: FnMut(&LaunchState) -> bool,
    {
        validation::require_non_negative("launch speed", v0)?;
        validation::require_launch_angle(angle_deg)?;

        let drag_factor = self.drag_factor(projectile);
        let mut state = LaunchState::launch(v0, angle_deg);
        let mut steps: u64 = 0;

        let end = loop {
            if state.position.is_below_ground() {
                break FlightEnd::Impact;
            }
            if observe(&state) {
                break FlightEnd::Observed;
            }

            let speed = state.speed();
            if speed == 0.0 {
                break FlightEnd::Stalled;
            }
            if steps >= self.max_steps {
                return Err(SimError::NumericDegeneracy(format!(
                    "{} did not land within {} steps (x={:.3}m, y={:.3}m)",
                    projectile.name, self.max_steps, state.position.x, state.position.y
                )));
            }

            self.advance(&mut state, drag_factor, projectile.mass(), speed);
            steps += 1;
        };

        trace!(
            "飛翔計算終了: {} v0={:.3}m/s 角度={:.1}° ステップ={} 終了={:?}",
            projectile.name, v0, angle_deg, steps, end
        );

        Ok(FlightOutcome { state, steps, end })
    }

    /// 飛翔経路を計算します
    ///
    /// 各ステップ更新前の位置を記録するため、経路は原点から始まり、
    /// すべての点で y ≥ 0 です。
    pub fn trajectory(
        &self,
        projectile: &ProjectileSpec,
        v0: f64,
        angle_deg: f64,
    ) -> Result<TrajectorySample, SimError> {
        let mut points = Vec::new();
        self.fly(projectile, v0, angle_deg, |state| {
            points.push((state.position.x, state.position.y));
            false
        })?;
        Ok(TrajectorySample { points })
    }

    /// 水平距離 `target` に到達した時点の速さ（m/s）
    ///
    /// 着弾までに到達しない場合は 0 を返します。
    pub fn speed_at_distance(
        &self,
        projectile: &ProjectileSpec,
        v0: f64,
        angle_deg: f64,
        target: f64,
    ) -> Result<f64, SimError> {
        validation::require_non_negative("target distance", target)?;

        let outcome = self.fly(projectile, v0, angle_deg, |state| state.position.x >= target)?;
        match outcome.end {
            FlightEnd::Observed => Ok(outcome.state.speed()),
            FlightEnd::Impact | FlightEnd::Stalled => Ok(0.0),
        }
    }
}

impl IRangeModel for TrajectoryIntegrator {
    fn range(&self, projectile: &ProjectileSpec, v0: f64, angle_deg: f64) -> Result<f64, SimError> {
        let outcome = self.fly(projectile, v0, angle_deg, |_| false)?;
        Ok(outcome.state.position.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrator() -> TrajectoryIntegrator {
        TrajectoryIntegrator::with_defaults(PhysicalConstants::default())
    }

    // 較正済み条件（100 psi, 45°）での Tシャツ初速
    const CALIBRATED_V0: f64 = 29.40752412630095;

    #[test]
    fn test_zero_speed_launch() {
        let integ = integrator();
        let shirt = ProjectileSpec::t_shirt();

        assert_eq!(integ.range(&shirt, 0.0, 45.0).unwrap(), 0.0);

        let path = integ.trajectory(&shirt, 0.0, 45.0).unwrap();
        assert_eq!(path.points(), &[(0.0, 0.0)]);

        assert_eq!(integ.speed_at_distance(&shirt, 0.0, 45.0, 10.0).unwrap(), 0.0);

        let outcome = integ.fly(&shirt, 0.0, 45.0, |_| false).unwrap();
        assert_eq!(outcome.end, FlightEnd::Stalled);
        assert_eq!(outcome.steps, 0);
    }

    #[test]
    fn test_zero_angle_terminates_after_one_step() {
        let integ = integrator();
        let shirt = ProjectileSpec::t_shirt();

        let outcome = integ.fly(&shirt, CALIBRATED_V0, 0.0, |_| false).unwrap();
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.end, FlightEnd::Impact);
        assert!(outcome.state.position.y < 0.0);

        let path = integ.trajectory(&shirt, CALIBRATED_V0, 0.0).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.final_range(), 0.0);

        let range = integ.range(&shirt, CALIBRATED_V0, 0.0).unwrap();
        assert!((range - 0.29347568483797787).abs() < 1e-9);
    }

    #[test]
    fn test_trajectory_shape() {
        let integ = integrator();
        let shirt = ProjectileSpec::t_shirt();
        let path = integ.trajectory(&shirt, CALIBRATED_V0, 45.0).unwrap();

        assert_eq!(path.points()[0], (0.0, 0.0));
        assert_eq!(path.len(), 380);
        assert!(path.points().iter().all(|&(_, y)| y >= 0.0));
        assert!(path.points().windows(2).all(|w| w[1].0 > w[0].0));
        assert!((path.final_range() - 60.83464246854988).abs() < 1e-6);
        assert!(path.apex() > 0.0);

        // 経路の最終点は着弾直前、飛距離は着弾直後の位置
        let range = integ.range(&shirt, CALIBRATED_V0, 45.0).unwrap();
        assert!(range > path.final_range());
    }

    #[test]
    fn test_range_strictly_increasing_in_speed() {
        let integ = integrator();
        let shirt = ProjectileSpec::t_shirt();
        let v_ideal = 137.65244954855598;

        let mut prev = -1.0;
        for i in 1..=100 {
            let r = integ.range(&shirt, v_ideal * i as f64 / 100.0, 45.0).unwrap();
            assert!(r > prev, "range not increasing at {}%: {} <= {}", i, r, prev);
            prev = r;
        }
    }

    #[test]
    fn test_speed_at_distance() {
        let integ = integrator();
        let shirt = ProjectileSpec::t_shirt();

        let speed = integ.speed_at_distance(&shirt, CALIBRATED_V0, 45.0, 15.24).unwrap();
        assert!((speed - 21.131294134890297).abs() < 1e-6);

        // 到達前に落下する場合は 0
        assert_eq!(integ.speed_at_distance(&shirt, CALIBRATED_V0, 45.0, 500.0).unwrap(), 0.0);

        // 距離0は発射直後の速さ
        let at_muzzle = integ.speed_at_distance(&shirt, CALIBRATED_V0, 45.0, 0.0).unwrap();
        assert!((at_muzzle - CALIBRATED_V0).abs() < 1e-9);
    }

    #[test]
    fn test_range_follows_projectile_diameter() {
        let integ = integrator();
        let shirt = ProjectileSpec::t_shirt();
        let wide = ProjectileSpec::new("wide", "Wide", shirt.mass(), 0.5).unwrap();

        assert!((wide.cross_section_area() - std::f64::consts::PI * 0.25 * 0.25).abs() < 1e-12);

        let shirt_range = integ.range(&shirt, 30.0, 45.0).unwrap();
        let wide_range = integ.range(&wide, 30.0, 45.0).unwrap();
        assert!(wide_range < shirt_range * 0.5, "{} vs {}", wide_range, shirt_range);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let integ = integrator();
        let shirt = ProjectileSpec::t_shirt();

        assert!(integ.range(&shirt, -1.0, 45.0).is_err());
        assert!(integ.range(&shirt, 10.0, 90.0).is_err());
        assert!(integ.range(&shirt, 10.0, -5.0).is_err());
        assert!(integ.speed_at_distance(&shirt, 10.0, 45.0, -1.0).is_err());
        assert!(TrajectoryIntegrator::new(PhysicalConstants::default(), 0.0, 10).is_err());
        assert!(TrajectoryIntegrator::new(PhysicalConstants::default(), 0.01, 0).is_err());
    }

    #[test]
    fn test_step_limit_is_reported() {
        let integ = TrajectoryIntegrator::new(PhysicalConstants::default(), 0.01, 10).unwrap();
        let shirt = ProjectileSpec::t_shirt();

        let result = integ.range(&shirt, CALIBRATED_V0, 45.0);
        assert!(matches!(result, Err(SimError::NumericDegeneracy(_))));
    }

    #[test]
    fn test_vacuum_matches_closed_form() {
        let constants = PhysicalConstants::new(0.0, 0.0, 9.81, 0.07, 0.6).unwrap();
        let integ = TrajectoryIntegrator::new(constants, 0.0005, DEFAULT_MAX_STEPS).unwrap();
        let shirt = ProjectileSpec::t_shirt();

        let range = integ.range(&shirt, 20.0, 45.0).unwrap();
        let expected = 20.0_f64.powi(2) / 9.81;
        assert!((range - expected).abs() / expected < 1e-2);
    }
}
