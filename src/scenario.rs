use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::models::{
    common::units, CalibrationConfig, PhysicalConstants, ProjectileSpec, SimError,
};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// 環境・砲身の物理設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhysicsConfig {
    pub air_density_kg_m3: f64,
    pub drag_coefficient: f64,
    pub gravity_mps2: f64,
    pub barrel_diameter_m: f64,
    pub barrel_length_m: f64,
}

/// 積分設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub max_steps: u64,
}

/// 投射物設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectileConfig {
    pub id: String,
    pub name: String,
    pub mass_kg: f64,
    pub diameter_m: f64,
    /// 較正済み摩擦係数に掛ける相対倍率 (0, 1]
    #[serde(default = "default_relative_friction")]
    pub relative_friction: f64,
}

fn default_relative_friction() -> f64 {
    1.0
}

/// 摩擦係数較正設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationSettings {
    /// 基準投射物のID
    pub reference: String,
    pub target_range_m: f64,
    pub reference_angle_deg: f64,
    pub reference_pressure_psi: f64,
    pub search_bounds: [f64; 2],
    pub iterations: u32,
}

/// 発射条件
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LaunchConfig {
    pub pressure_psi: f64,
    pub angle_deg: f64,
    /// 速さを計測する水平距離（m）
    pub sample_distance_m: f64,
}

/// パラメータスイープ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    pub pressures_psi: Vec<f64>,
    pub angles_deg: Vec<f64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            pressures_psi: (0..=4).map(|i| 40.0 + 20.0 * i as f64).collect(),
            angles_deg: (1..=5).map(|i| 15.0 * i as f64).collect(),
        }
    }
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub physics: PhysicsConfig,
    pub sim: SimulationConfig,
    pub projectiles: Vec<ProjectileConfig>,
    pub calibration: CalibrationSettings,
    pub launch: LaunchConfig,
    #[serde(default)]
    pub sweep: Option<SweepConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let constants = PhysicalConstants::default();
        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "T-shirt cannon".to_string(),
                description: "2.75in x 24in 空気砲、Tシャツを基準に200ftで較正".to_string(),
            },
            physics: PhysicsConfig {
                air_density_kg_m3: constants.air_density(),
                drag_coefficient: constants.drag_coefficient(),
                gravity_mps2: constants.gravity(),
                barrel_diameter_m: constants.barrel_diameter(),
                barrel_length_m: constants.barrel_length(),
            },
            sim: SimulationConfig {
                dt_s: crate::models::trajectory::DEFAULT_DT,
                max_steps: crate::models::trajectory::DEFAULT_MAX_STEPS,
            },
            projectiles: vec![
                ProjectileConfig::from_spec(&ProjectileSpec::t_shirt(), 1.0),
                ProjectileConfig::from_spec(&ProjectileSpec::stress_ball(), 0.5),
            ],
            calibration: CalibrationSettings {
                reference: ProjectileSpec::t_shirt().id,
                target_range_m: units::feet_to_m(200.0),
                reference_angle_deg: 45.0,
                reference_pressure_psi: 100.0,
                search_bounds: [0.01, 1.0],
                iterations: 100,
            },
            launch: LaunchConfig {
                pressure_psi: 100.0,
                angle_deg: 45.0,
                sample_distance_m: units::feet_to_m(50.0),
            },
            sweep: None,
        }
    }
}

impl ProjectileConfig {
    fn from_spec(spec: &ProjectileSpec, relative_friction: f64) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            mass_kg: spec.mass(),
            diameter_m: spec.diameter(),
            relative_friction,
        }
    }

    pub fn to_spec(&self) -> Result<ProjectileSpec, SimError> {
        ProjectileSpec::new(self.id.clone(), self.name.clone(), self.mass_kg, self.diameter_m)
    }
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        // YAML解析
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        // 基本的な検証
        config.validate()?;

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 積分設定の検証
        if !(self.sim.dt_s > 0.0 && self.sim.dt_s.is_finite()) {
            return Err(ScenarioError::ValidationError("dt_s must be positive".to_string()));
        }
        if self.sim.max_steps == 0 {
            return Err(ScenarioError::ValidationError("max_steps must be positive".to_string()));
        }

        // 物理定数の検証
        self.physical_constants()?;

        // 投射物の検証
        if self.projectiles.is_empty() {
            return Err(ScenarioError::ValidationError("at least one projectile is required".to_string()));
        }
        let mut ids = HashSet::new();
        for projectile in &self.projectiles {
            if !ids.insert(projectile.id.as_str()) {
                return Err(ScenarioError::ValidationError(
                    format!("duplicate projectile id: {}", projectile.id)
                ));
            }
            projectile.to_spec().map_err(|e| {
                ScenarioError::ValidationError(format!("projectile {}: {}", projectile.id, e))
            })?;
            if !(projectile.relative_friction > 0.0 && projectile.relative_friction <= 1.0) {
                return Err(ScenarioError::ValidationError(format!(
                    "projectile {} relative_friction {} outside (0, 1]",
                    projectile.id, projectile.relative_friction
                )));
            }
        }

        // 較正設定の検証
        if !ids.contains(self.calibration.reference.as_str()) {
            return Err(ScenarioError::ValidationError(format!(
                "calibration reference {} is not a defined projectile",
                self.calibration.reference
            )));
        }
        if let Some(reference) = self.projectiles.iter().find(|p| p.id == self.calibration.reference) {
            if reference.relative_friction != 1.0 {
                return Err(ScenarioError::ValidationError(format!(
                    "calibration reference {} must have relative_friction 1.0 (got {})",
                    reference.id, reference.relative_friction
                )));
            }
        }
        self.calibration_config().validate()?;

        // 発射条件の検証
        self.validate_launch(self.launch.pressure_psi, self.launch.angle_deg)?;
        if !(self.launch.sample_distance_m >= 0.0 && self.launch.sample_distance_m.is_finite()) {
            return Err(ScenarioError::ValidationError(
                "sample_distance_m must be non-negative".to_string()
            ));
        }

        // スイープ条件の検証
        if let Some(sweep) = &self.sweep {
            if sweep.pressures_psi.is_empty() || sweep.angles_deg.is_empty() {
                return Err(ScenarioError::ValidationError("sweep lists must not be empty".to_string()));
            }
            for &pressure in &sweep.pressures_psi {
                for &angle in &sweep.angles_deg {
                    self.validate_launch(pressure, angle)?;
                }
            }
        }

        Ok(())
    }

    fn validate_launch(&self, pressure_psi: f64, angle_deg: f64) -> Result<(), ScenarioError> {
        crate::models::validation::require_non_negative("pressure", pressure_psi)?;
        crate::models::validation::require_launch_angle(angle_deg)?;
        Ok(())
    }

    /// 物理定数を生成
    pub fn physical_constants(&self) -> Result<PhysicalConstants, ScenarioError> {
        let p = &self.physics;
        Ok(PhysicalConstants::new(
            p.air_density_kg_m3,
            p.drag_coefficient,
            p.gravity_mps2,
            p.barrel_diameter_m,
            p.barrel_length_m,
        )?)
    }

    /// 較正条件を生成
    pub fn calibration_config(&self) -> CalibrationConfig {
        let c = &self.calibration;
        CalibrationConfig {
            target_range: c.target_range_m,
            reference_angle_deg: c.reference_angle_deg,
            reference_pressure_psi: c.reference_pressure_psi,
            search_bounds: (c.search_bounds[0], c.search_bounds[1]),
            iterations: c.iterations,
        }
    }

    /// 基準以外の投射物の相対摩擦倍率を上書き
    pub fn override_relative_friction(&mut self, relative_friction: f64) {
        let reference = self.calibration.reference.clone();
        for projectile in self.projectiles.iter_mut().filter(|p| p.id != reference) {
            projectile.relative_friction = relative_friction;
        }
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== 物理設定 ===");
        println!("空気密度: {:.3} kg/m³", self.physics.air_density_kg_m3);
        println!("抗力係数: {:.2}", self.physics.drag_coefficient);
        println!("重力加速度: {:.2} m/s²", self.physics.gravity_mps2);
        println!(
            "砲身: 内径 {:.4}m × 長さ {:.4}m",
            self.physics.barrel_diameter_m, self.physics.barrel_length_m
        );
        println!("時間刻み: {:.3}秒 (最大 {} ステップ)", self.sim.dt_s, self.sim.max_steps);
        println!();

        println!("=== 投射物 ===");
        for projectile in &self.projectiles {
            println!(
                "  {} ({}): {:.3}kg, 直径 {:.3}m, 相対摩擦 {:.2}",
                projectile.name, projectile.id, projectile.mass_kg, projectile.diameter_m,
                projectile.relative_friction
            );
        }
        println!();

        println!("=== 較正条件 ===");
        println!("基準投射物: {}", self.calibration.reference);
        println!(
            "目標飛距離: {:.2}m ({:.1}ft)",
            self.calibration.target_range_m,
            units::m_to_feet(self.calibration.target_range_m)
        );
        println!(
            "基準条件: {:.0} psi, {:.1}°",
            self.calibration.reference_pressure_psi, self.calibration.reference_angle_deg
        );
        println!(
            "探索範囲: [{}, {}] × {}回",
            self.calibration.search_bounds[0], self.calibration.search_bounds[1],
            self.calibration.iterations
        );
        println!();

        println!("=== 発射条件 ===");
        println!("発射圧: {:.0} psi", self.launch.pressure_psi);
        println!("発射角: {:.1}°", self.launch.angle_deg);
        if let Some(sweep) = &self.sweep {
            println!(
                "スイープ: {}圧力 × {}角度",
                sweep.pressures_psi.len(), sweep.angles_deg.len()
            );
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl From<SimError> for ScenarioError {
    fn from(err: SimError) -> Self {
        ScenarioError::ValidationError(err.to_string())
    }
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_YAML: &str = r#"
meta:
  version: "1.0"
  name: test
  description: test scenario
physics:
  air_density_kg_m3: 1.225
  drag_coefficient: 0.5
  gravity_mps2: 9.81
  barrel_diameter_m: 0.06985
  barrel_length_m: 0.6096
sim:
  dt_s: 0.01
  max_steps: 100000
projectiles:
  - id: tshirt
    name: T-shirt
    mass_kg: 0.170
    diameter_m: 0.07
  - id: stress_ball
    name: Stress Ball
    mass_kg: 0.040
    diameter_m: 0.07
    relative_friction: 0.5
calibration:
  reference: tshirt
  target_range_m: 60.96
  reference_angle_deg: 45.0
  reference_pressure_psi: 100.0
  search_bounds: [0.01, 1.0]
  iterations: 100
launch:
  pressure_psi: 80.0
  angle_deg: 30.0
  sample_distance_m: 15.24
sweep:
  pressures_psi: [40.0, 120.0]
  angles_deg: [30.0, 45.0]
"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScenarioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.projectiles.len(), 2);
        assert!((config.calibration.target_range_m - 60.96).abs() < 1e-9);
    }

    #[test]
    fn test_parse_yaml() {
        let config: ScenarioConfig = serde_yaml::from_str(SCENARIO_YAML).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.projectiles[0].relative_friction, 1.0);
        assert_eq!(config.projectiles[1].relative_friction, 0.5);
        assert_eq!(config.sweep.as_ref().map(|s| s.angles_deg.len()), Some(2));
        assert_eq!(config.launch.angle_deg, 30.0);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ScenarioConfig::default();
        config.sim.dt_s = 0.0;
        assert!(matches!(config.validate(), Err(ScenarioError::ValidationError(_))));

        let mut config = ScenarioConfig::default();
        config.projectiles[1].mass_kg = -0.04;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.projectiles[1].id = config.projectiles[0].id.clone();
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.calibration.reference = "missing".to_string();
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.calibration.search_bounds = [0.0, 1.0];
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.launch.angle_deg = 90.0;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.launch.pressure_psi = -10.0;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.projectiles[1].relative_friction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reference_relative_friction_must_be_one() {
        let mut config = ScenarioConfig::default();
        config.projectiles[0].relative_friction = 0.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ScenarioError::ValidationError(ref msg) if msg.contains("relative_friction")));

        // 基準投射物を入れ替えれば同じ値でも有効
        config.calibration.reference = config.projectiles[1].id.clone();
        config.projectiles[1].relative_friction = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_override_relative_friction() {
        let mut config = ScenarioConfig::default();
        config.override_relative_friction(0.3);
        assert_eq!(config.projectiles[0].relative_friction, 1.0);
        assert_eq!(config.projectiles[1].relative_friction, 0.3);
    }

    #[test]
    fn test_bundled_scenario_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/tshirt_cannon.yaml");
        let config = ScenarioConfig::from_file(path).unwrap();
        assert_eq!(config.calibration.reference, "tshirt");
        assert_eq!(config.sweep.map(|s| s.pressures_psi.len()), Some(5));
    }

    #[test]
    fn test_missing_file() {
        let result = ScenarioConfig::from_file("does/not/exist.yaml");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }
}
