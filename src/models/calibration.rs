use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{
    common::{validation, SimError},
    physical::ProjectileSpec,
    traits::{IRangeModel, IVelocityEstimator},
};

/// 較正済み摩擦係数
///
/// 理想初速に掛ける無次元の倍率で、値は (0, 1] の範囲に収まります。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct FrictionFactor(f64);

impl FrictionFactor {
    pub fn new(value: f64) -> Result<Self, SimError> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(SimError::InvalidPhysicalInput(format!(
                "friction factor must be within (0, 1] (got {})",
                value
            )))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 相対倍率を掛けた摩擦係数（別の投射物用）
    pub fn scaled(&self, relative: f64) -> Result<Self, SimError> {
        Self::new(self.0 * relative)
    }

    /// 理想初速に摩擦係数を適用
    pub fn apply(&self, ideal_velocity: f64) -> f64 {
        ideal_velocity * self.0
    }
}

/// 探索範囲の飽和状態
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Saturation {
    /// 目標距離は探索範囲内で到達可能
    None,
    /// 上限でも目標距離に届かない（結果は上限に収束）
    Upper,
    /// 下限でも目標距離を超える（結果は下限に収束）
    Lower,
}

/// 較正条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    /// 目標飛距離（m）
    pub target_range: f64,
    /// 基準発射角（度）
    pub reference_angle_deg: f64,
    /// 基準発射圧（psi）
    pub reference_pressure_psi: f64,
    /// 摩擦係数の探索範囲 (下限, 上限)
    pub search_bounds: (f64, f64),
    /// 二分探索の反復回数
    pub iterations: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            target_range: 200.0 * crate::models::common::units::M_PER_FOOT,
            reference_angle_deg: 45.0,
            reference_pressure_psi: 100.0,
            search_bounds: (0.01, 1.0),
            iterations: 100,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        validation::require_positive("target_range", self.target_range)?;
        validation::require_launch_angle(self.reference_angle_deg)?;
        validation::require_non_negative("reference_pressure", self.reference_pressure_psi)?;

        let (lo, hi) = self.search_bounds;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo < hi && hi <= 1.0) {
            return Err(SimError::InvalidPhysicalInput(format!(
                "search bounds must satisfy 0 < lo < hi <= 1 (got [{}, {}])",
                lo, hi
            )));
        }
        if self.iterations == 0 {
            return Err(SimError::InvalidPhysicalInput("iterations must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// 較正結果
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalibrationResult {
    pub factor: FrictionFactor,
    /// 基準投射物の理想初速（m/s）
    pub ideal_velocity: f64,
    /// 較正後の初速で得られる飛距離（m）
    pub achieved_range: f64,
    pub saturation: Saturation,
}

impl CalibrationResult {
    pub fn is_saturated(&self) -> bool {
        self.saturation != Saturation::None
    }
}

/// 摩擦係数較正器
///
/// 基準投射物を基準角・基準圧で発射したときの飛距離が目標距離に一致するよう、
/// 理想初速に掛ける倍率を二分探索で求めます。収束判定は行わず、
/// 固定回数の反復後に最終区間の中点を返します。
pub struct FrictionCalibrator<'a, E: IVelocityEstimator, M: IRangeModel> {
    estimator: &'a E,
    model: &'a M,
    config: CalibrationConfig,
}

impl<'a, E: IVelocityEstimator, M: IRangeModel> FrictionCalibrator<'a, E, M> {
    pub fn new(estimator: &'a E, model: &'a M, config: CalibrationConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { estimator, model, config })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// 基準投射物に対して摩擦係数を較正します
    ///
    /// 目標距離が探索範囲内で到達不能な場合でもエラーにはせず、
    /// `CalibrationResult::saturation` で飽和を通知します。
    pub fn calibrate(&self, reference: &ProjectileSpec) -> Result<CalibrationResult, SimError> {
        let cfg = &self.config;
        let ideal_velocity = self
            .estimator
            .ideal_velocity(reference.mass(), cfg.reference_pressure_psi)?;

        let (mut low, mut high) = cfg.search_bounds;

        for _ in 0..cfg.iterations {
            let mid = (low + high) / 2.0;
            let range = self.model.range(reference, ideal_velocity * mid, cfg.reference_angle_deg)?;
            if range > cfg.target_range {
                high = mid;
            } else {
                low = mid;
            }
        }

        let factor = FrictionFactor::new((low + high) / 2.0)?;
        let achieved_range = self
            .model
            .range(reference, factor.apply(ideal_velocity), cfg.reference_angle_deg)?;

        let saturation = self.saturation(reference, ideal_velocity)?;

        debug!(
            "較正: {} 理想初速={:.3}m/s 係数={:.9} 飛距離={:.3}m (目標 {:.3}m)",
            reference.name, ideal_velocity, factor.value(), achieved_range, cfg.target_range
        );
        match saturation {
            Saturation::None => info!("摩擦係数を較正しました: {} = {:.6}", reference.name, factor.value()),
            Saturation::Upper => warn!(
                "目標距離 {:.2}m は探索上限でも到達できません。係数は上限 {:.3} に飽和しました",
                cfg.target_range, cfg.search_bounds.1
            ),
            Saturation::Lower => warn!(
                "目標距離 {:.2}m は探索下限でも超過します。係数は下限 {:.3} に飽和しました",
                cfg.target_range, cfg.search_bounds.0
            ),
        }

        Ok(CalibrationResult {
            factor,
            ideal_velocity,
            achieved_range,
            saturation,
        })
    }

    /// 探索範囲の両端で飛距離を評価し、目標距離が範囲外かどうかを判定します
    ///
    /// 反復回数に依存せず、上限でも目標以下なら `Upper`、下限でも目標を超えるなら `Lower`。
    fn saturation(&self, reference: &ProjectileSpec, ideal_velocity: f64) -> Result<Saturation, SimError> {
        let cfg = &self.config;
        let (lo, hi) = cfg.search_bounds;

        let range_at_hi = self.model.range(reference, ideal_velocity * hi, cfg.reference_angle_deg)?;
        if range_at_hi <= cfg.target_range {
            return Ok(Saturation::Upper);
        }
        let range_at_lo = self.model.range(reference, ideal_velocity * lo, cfg.reference_angle_deg)?;
        if range_at_lo > cfg.target_range {
            return Ok(Saturation::Lower);
        }
        Ok(Saturation::None)
    }
}
