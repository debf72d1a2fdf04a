//! # cannonsim
//!
//! 空気砲（Tシャツキャノン）の弾道シミュレータ。
//!
//! 蓄圧空気の仕事から理想初速を求め、二次抗力と重力のもとで前進オイラー法により
//! 弾道を積分します。基準投射物の飛距離が実測値に一致するよう摩擦係数を
//! 二分探索で較正し、その係数で任意の発射条件を評価します。

pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
pub mod sweep;
