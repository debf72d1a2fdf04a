//! 環境・砲身の物理定数と投射物の諸元

use crate::models::common::{math_utils, units, validation, SimError};

/// 空気密度の既定値（kg/m³）
pub const DEFAULT_AIR_DENSITY: f64 = 1.225;
/// 抗力係数の既定値
pub const DEFAULT_DRAG_COEFFICIENT: f64 = 0.5;
/// 重力加速度の既定値（m/s²）
pub const DEFAULT_GRAVITY: f64 = 9.81;
/// 砲身内径の既定値（インチ）
pub const DEFAULT_BARREL_DIAMETER_IN: f64 = 2.75;
/// 砲身長の既定値（インチ）
pub const DEFAULT_BARREL_LENGTH_IN: f64 = 24.0;

/// 物理定数
///
/// プロセスの生存期間中は不変です。各コンポーネントの生成時に明示的に渡されます。
/// 値は `new` で検証された後は読み取り専用で、導出値（砲身断面積）と常に一致します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    air_density: f64,      // kg/m³
    drag_coefficient: f64, // 無次元
    gravity: f64,          // m/s²
    barrel_diameter: f64,  // m
    barrel_length: f64,    // m
    barrel_area: f64,      // m² (barrel_diameter から導出)
}

impl PhysicalConstants {
    /// 新しい物理定数を作成します
    ///
    /// # 引数
    ///
    /// * `air_density` - 空気密度（kg/m³）
    /// * `drag_coefficient` - 抗力係数
    /// * `gravity` - 重力加速度（m/s²）
    /// * `barrel_diameter` - 砲身内径（m）
    /// * `barrel_length` - 砲身長（m）
    ///
    /// # 戻り値
    ///
    /// 空気密度・抗力係数が負、またはその他の値が正の有限値でない場合は `SimError::InvalidPhysicalInput`
    pub fn new(
        air_density: f64,
        drag_coefficient: f64,
        gravity: f64,
        barrel_diameter: f64,
        barrel_length: f64,
    ) -> Result<Self, SimError> {
        validation::require_non_negative("air_density", air_density)?;
        validation::require_non_negative("drag_coefficient", drag_coefficient)?;
        validation::require_positive("gravity", gravity)?;
        validation::require_positive("barrel_diameter", barrel_diameter)?;
        validation::require_positive("barrel_length", barrel_length)?;

        Ok(Self {
            air_density,
            drag_coefficient,
            gravity,
            barrel_diameter,
            barrel_length,
            barrel_area: math_utils::circle_area(barrel_diameter),
        })
    }

    pub fn air_density(&self) -> f64 {
        self.air_density
    }

    pub fn drag_coefficient(&self) -> f64 {
        self.drag_coefficient
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn barrel_diameter(&self) -> f64 {
        self.barrel_diameter
    }

    pub fn barrel_length(&self) -> f64 {
        self.barrel_length
    }

    /// 砲身の断面積（m²）
    pub fn barrel_area(&self) -> f64 {
        self.barrel_area
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        let barrel_diameter = units::inches_to_m(DEFAULT_BARREL_DIAMETER_IN);
        Self {
            air_density: DEFAULT_AIR_DENSITY,
            drag_coefficient: DEFAULT_DRAG_COEFFICIENT,
            gravity: DEFAULT_GRAVITY,
            barrel_diameter,
            barrel_length: units::inches_to_m(DEFAULT_BARREL_LENGTH_IN),
            barrel_area: math_utils::circle_area(barrel_diameter),
        }
    }
}

/// 投射物の諸元
///
/// 質量・直径は生成後に変更できません（断面積は直径から導出済み）。
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpec {
    pub id: String,
    pub name: String,
    mass: f64,     // kg
    diameter: f64, // m (前面直径)
    area: f64,     // m² (diameter から導出)
}

impl ProjectileSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mass: f64, diameter: f64) -> Result<Self, SimError> {
        validation::require_positive("mass", mass)?;
        validation::require_positive("diameter", diameter)?;

        Ok(Self {
            id: id.into(),
            name: name.into(),
            mass,
            diameter,
            area: math_utils::circle_area(diameter),
        })
    }

    /// Tシャツ（170 g）
    pub fn t_shirt() -> Self {
        Self {
            id: "tshirt".to_string(),
            name: "T-shirt".to_string(),
            mass: 0.170,
            diameter: 0.07,
            area: math_utils::circle_area(0.07),
        }
    }

    /// ストレスボール（40 g）
    pub fn stress_ball() -> Self {
        Self {
            id: "stress_ball".to_string(),
            name: "Stress Ball".to_string(),
            mass: 0.040,
            diameter: 0.07,
            area: math_utils::circle_area(0.07),
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// 前面投影断面積（m²）
    pub fn cross_section_area(&self) -> f64 {
        self.area
    }
}
