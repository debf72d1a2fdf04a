// 基本的なデータ型・単位換算・入力検証
pub mod common;

// 計算コンポーネントのインターフェース（trait）定義
pub mod traits;

// 物理定数と投射物諸元
pub mod physical;

// 各計算コンポーネントの実装
pub mod muzzle;
pub mod trajectory;
pub mod calibration;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use physical::{PhysicalConstants, ProjectileSpec};
pub use muzzle::MuzzleVelocityEstimator;
pub use trajectory::{FlightEnd, FlightOutcome, LaunchState, TrajectoryIntegrator, TrajectorySample};
pub use calibration::{CalibrationConfig, CalibrationResult, FrictionCalibrator, FrictionFactor, Saturation};
