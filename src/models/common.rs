use std::ops::{Add, Mul};

/// 鉛直面内の2次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position2D {
    pub x: f64, // m (水平距離)
    pub y: f64, // m (発射高さからの高度)
}

impl Position2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 原点（発射口）
    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 地面（発射高さ）より下にあるかどうか
    pub fn is_below_ground(&self) -> bool {
        self.y < 0.0
    }
}

// Position2D + Velocity2D*dt の演算を可能にする
impl Add<Velocity2D> for Position2D {
    type Output = Self;

    fn add(self, displacement: Velocity2D) -> Self::Output {
        Self::new(self.x + displacement.x, self.y + displacement.y)
    }
}

/// 2次元速度を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity2D {
    pub x: f64, // m/s
    pub y: f64, // m/s
}

impl Velocity2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 速さと仰角（度）から速度ベクトルを生成
    pub fn from_polar(speed: f64, angle_deg: f64) -> Self {
        let angle = math_utils::deg_to_rad(angle_deg);
        Self::new(speed * angle.cos(), speed * angle.sin())
    }

    /// 速度ベクトルの大きさ
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }
}

impl Mul<f64> for Velocity2D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

// Velocity2D + Acceleration2D*dt の演算を可能にする
impl Add<Acceleration2D> for Velocity2D {
    type Output = Self;

    fn add(self, acceleration: Acceleration2D) -> Self::Output {
        Self::new(self.x + acceleration.x, self.y + acceleration.y)
    }
}

/// 2次元加速度を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration2D {
    pub x: f64, // m/s²
    pub y: f64, // m/s²
}

impl Acceleration2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Mul<f64> for Acceleration2D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// 物理計算のエラー
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// 質量・直径・時間刻みが正でない、圧力が負、角度が範囲外など
    InvalidPhysicalInput(String),
    /// 数値的に継続できない状態（ステップ上限超過など）
    NumericDegeneracy(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidPhysicalInput(msg) => write!(f, "物理入力エラー: {}", msg),
            SimError::NumericDegeneracy(msg) => write!(f, "数値計算エラー: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

/// 入力値検証ユーティリティ
pub mod validation {
    use super::SimError;

    /// 有限かつ正の値であることを確認
    pub fn require_positive(name: &str, value: f64) -> Result<f64, SimError> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(SimError::InvalidPhysicalInput(format!(
                "{} must be a positive finite number (got {})",
                name, value
            )))
        }
    }

    /// 有限かつ0以上の値であることを確認
    pub fn require_non_negative(name: &str, value: f64) -> Result<f64, SimError> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(SimError::InvalidPhysicalInput(format!(
                "{} must be a non-negative finite number (got {})",
                name, value
            )))
        }
    }

    /// 発射角が [0°, 90°) の範囲内であることを確認
    pub fn require_launch_angle(angle_deg: f64) -> Result<f64, SimError> {
        if angle_deg.is_finite() && (0.0..90.0).contains(&angle_deg) {
            Ok(angle_deg)
        } else {
            Err(SimError::InvalidPhysicalInput(format!(
                "launch angle must be within [0, 90) degrees (got {})",
                angle_deg
            )))
        }
    }
}

/// 単位換算
pub mod units {
    /// 1 psi あたりのパスカル
    pub const PA_PER_PSI: f64 = 6894.76;
    /// 1 インチあたりのメートル
    pub const M_PER_INCH: f64 = 0.0254;
    /// 1 フィートあたりのメートル
    pub const M_PER_FOOT: f64 = 0.3048;
    /// 1 メートルあたりのフィート（表示用の丸め値）
    pub const FEET_PER_M: f64 = 3.281;
    /// 1 m/s あたりの mph（表示用の丸め値）
    pub const MPH_PER_MPS: f64 = 2.237;

    pub fn psi_to_pa(psi: f64) -> f64 {
        psi * PA_PER_PSI
    }

    pub fn inches_to_m(inches: f64) -> f64 {
        inches * M_PER_INCH
    }

    pub fn feet_to_m(feet: f64) -> f64 {
        feet * M_PER_FOOT
    }

    pub fn m_to_feet(meters: f64) -> f64 {
        meters * FEET_PER_M
    }

    pub fn mps_to_mph(speed: f64) -> f64 {
        speed * MPH_PER_MPS
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees.to_radians()
    }

    /// 直径から円の断面積を計算
    pub fn circle_area(diameter: f64) -> f64 {
        std::f64::consts::PI * (diameter / 2.0).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_from_polar() {
        let v = Velocity2D::from_polar(10.0, 0.0);
        assert!((v.x - 10.0).abs() < 1e-12);
        assert!(v.y.abs() < 1e-12);

        let v = Velocity2D::from_polar(10.0, 45.0);
        assert!((v.magnitude() - 10.0).abs() < 1e-12);
        assert!((v.x - v.y).abs() < 1e-12);
    }

    #[test]
    fn test_validation() {
        assert!(validation::require_positive("mass", 0.17).is_ok());
        assert!(validation::require_positive("mass", 0.0).is_err());
        assert!(validation::require_positive("mass", f64::NAN).is_err());
        assert!(validation::require_non_negative("pressure", 0.0).is_ok());
        assert!(validation::require_non_negative("pressure", -1.0).is_err());
        assert!(validation::require_launch_angle(0.0).is_ok());
        assert!(validation::require_launch_angle(89.9).is_ok());
        assert!(validation::require_launch_angle(90.0).is_err());
        assert!(validation::require_launch_angle(-1.0).is_err());
    }

    #[test]
    fn test_unit_conversions() {
        assert!((units::feet_to_m(200.0) - 60.96).abs() < 1e-9);
        assert!((units::inches_to_m(24.0) - 0.6096).abs() < 1e-12);
        assert!((units::psi_to_pa(100.0) - 689476.0).abs() < 1e-6);
    }

    #[test]
    fn test_circle_area() {
        let area = math_utils::circle_area(2.0);
        assert!((area - std::f64::consts::PI).abs() < 1e-12);
    }
}
