use crate::models::{
    common::{units, validation, SimError},
    physical::PhysicalConstants,
    traits::IVelocityEstimator,
};

/// 砲口初速推定器
///
/// 蓄圧された空気の仕事がすべて運動エネルギーに変換されると仮定し（摩擦なし）、
/// 理想初速を求めます。
#[derive(Debug, Clone, Copy)]
pub struct MuzzleVelocityEstimator {
    constants: PhysicalConstants,
}

impl MuzzleVelocityEstimator {
    pub fn new(constants: PhysicalConstants) -> Self {
        Self { constants }
    }

    /// 発射圧による仕事（J）
    pub fn work(&self, pressure_psi: f64) -> f64 {
        let pressure_pa = units::psi_to_pa(pressure_psi);
        pressure_pa * self.constants.barrel_area() * self.constants.barrel_length()
    }
}

impl IVelocityEstimator for MuzzleVelocityEstimator {
    /// 理想初速（m/s）
    ///
    /// `v = sqrt(2·W / m)`、W = 圧力[Pa] × 砲身断面積 × 砲身長
    fn ideal_velocity(&self, mass: f64, pressure_psi: f64) -> Result<f64, SimError> {
        validation::require_positive("mass", mass)?;
        validation::require_non_negative("pressure", pressure_psi)?;

        let work = self.work(pressure_psi);
        Ok(((2.0 * work) / mass).sqrt())
    }
}
