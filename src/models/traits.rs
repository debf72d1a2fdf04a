use crate::models::{common::SimError, physical::ProjectileSpec};

/// 初速推定器のインターフェース
pub trait IVelocityEstimator {
    /// 摩擦を考慮しない理想初速（m/s）
    fn ideal_velocity(&self, mass: f64, pressure_psi: f64) -> Result<f64, SimError>;
}

/// 飛距離モデルのインターフェース
///
/// 摩擦係数の較正はこのインターフェースを介して飛距離を評価します。
/// 較正が正しく収束するには、飛距離が初速に対して単調増加である必要があります。
pub trait IRangeModel {
    /// 着弾までの水平飛距離（m）
    fn range(&self, projectile: &ProjectileSpec, v0: f64, angle_deg: f64) -> Result<f64, SimError>;
}
