use std::fs;
use std::str::FromStr;
use std::sync::Arc;

use cannonsim::logging::{init_logging, level_for_verbosity, parse_log_level, LogConfig, LogOutput};
use cannonsim::scenario::{ScenarioConfig, SweepConfig};
use cannonsim::simulation::{LaunchInputs, ScenarioRunner};
use cannonsim::sweep::{print_sweep, run_sweep};
use clap::{Arg, ArgMatches, Command};
use tracing::{error, info};

fn main() {
    let matches = build_cli().get_matches();
    let code = execute(&matches);
    std::process::exit(code);
}

/// コマンドライン引数の定義
fn build_cli() -> Command {
    Command::new("cannonsim")
        .version("0.1.0")
        .about("空気砲 弾道シミュレータ (T-shirt cannon simulator)")
        .long_about("空気砲から発射される投射物の弾道を二次抗力モデルで計算します。\n\
                     起動時に基準投射物の飛距離で摩擦係数を較正してから評価します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("読み込むシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、組み込みの既定シナリオを使用します。")
        )
        .arg(
            Arg::new("pressure")
                .short('p')
                .long("pressure")
                .value_name("PSI")
                .value_parser(clap::value_parser!(f64))
                .help("発射圧 (psi)")
        )
        .arg(
            Arg::new("angle")
                .short('a')
                .long("angle")
                .value_name("DEG")
                .value_parser(clap::value_parser!(f64))
                .help("発射角 (度, 0以上90未満)")
        )
        .arg(
            Arg::new("relative-friction")
                .short('m')
                .long("relative-friction")
                .value_name("X")
                .value_parser(clap::value_parser!(f64))
                .help("基準以外の投射物に適用する相対摩擦倍率 (0より大きく1以下)")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("sweep")
        )
        .arg(
            Arg::new("sweep")
                .long("sweep")
                .action(clap::ArgAction::SetTrue)
                .help("発射圧×発射角のパラメータスイープを実行")
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("結果をYAMLファイルに書き出す")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
}

/// ログを初期化してシミュレーションを実行し、終了コードを返す
///
/// ファイルログのガードはこの関数の終わりで破棄されるため、
/// `process::exit` より前にバッファがフラッシュされます。
fn execute(matches: &ArgMatches) -> i32 {
    let verbose_level = matches.get_count("verbose");

    // ログ初期化
    let log_config = match build_log_config(matches, verbose_level) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("エラー: {}", e);
            return 2;
        }
    };
    let log_guard = match init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            return 1;
        }
    };

    let code = exit_code(run(matches, verbose_level));
    drop(log_guard);
    code
}

/// 実行結果を終了コードへ変換（失敗時はログとエラー出力に記録）
fn exit_code(result: Result<(), Box<dyn std::error::Error>>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            eprintln!("エラー: {}", e);
            1
        }
    }
}

fn build_log_config(matches: &ArgMatches, verbose_level: u8) -> Result<LogConfig, String> {
    let output = match matches.get_one::<String>("log-output") {
        Some(value) => LogOutput::from_str(value)?,
        None => LogOutput::Console,
    };
    let level = match matches.get_one::<String>("log-level") {
        Some(value) => parse_log_level(value),
        None => level_for_verbosity(verbose_level),
    };

    Ok(LogConfig {
        level,
        output,
        ..LogConfig::default()
    })
}

/// シナリオを読み込み、コマンドラインの上書きを適用
fn load_scenario(matches: &ArgMatches) -> Result<ScenarioConfig, Box<dyn std::error::Error>> {
    let mut scenario = match matches.get_one::<String>("scenario") {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            info!("シナリオファイル読み込み完了: {}", path);
            scenario
        }
        None => ScenarioConfig::default(),
    };

    if let Some(&pressure) = matches.get_one::<f64>("pressure") {
        scenario.launch.pressure_psi = pressure;
    }
    if let Some(&angle) = matches.get_one::<f64>("angle") {
        scenario.launch.angle_deg = angle;
    }
    if let Some(&relative) = matches.get_one::<f64>("relative-friction") {
        scenario.override_relative_friction(relative);
    }

    scenario.validate()?;
    Ok(scenario)
}

fn run(matches: &ArgMatches, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = load_scenario(matches)?;

    // 情報表示のみの場合
    if matches.get_flag("info") {
        scenario.print_summary();
        return Ok(());
    }

    if verbose_level > 0 {
        scenario.print_summary();
        println!();
    }

    // 摩擦係数の較正（一度だけ）
    let runner = ScenarioRunner::new(&scenario, verbose_level)?;
    let calibration = runner.calibration();
    println!(
        "較正済み摩擦係数: {:.6} (基準: {}, 飛距離 {:.2}m)",
        calibration.factor.value(),
        runner.reference_id(),
        calibration.achieved_range
    );
    if runner.is_saturated() {
        println!("注意: 目標飛距離が探索範囲内で到達できません ({:?})", calibration.saturation);
    }
    println!();

    let output_path = matches.get_one::<String>("output");

    if matches.get_flag("sweep") {
        let sweep = scenario.sweep.clone().unwrap_or_default();
        let SweepConfig { pressures_psi, angles_deg } = sweep;
        let rows = run_sweep(Arc::new(runner), &pressures_psi, &angles_deg)?;
        print_sweep(&rows);

        if let Some(path) = output_path {
            fs::write(path, serde_yaml::to_string(&rows)?)?;
            info!("スイープ結果を書き出しました: {}", path);
        }
        return Ok(());
    }

    let inputs = LaunchInputs::new(scenario.launch.pressure_psi, scenario.launch.angle_deg);
    let report = runner.run(&inputs)?;
    report.print(runner.reference_id());

    if let Some(path) = output_path {
        fs::write(path, serde_yaml::to_string(&report)?)?;
        info!("結果を書き出しました: {}", path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_from(args: &[&str]) -> ArgMatches {
        build_cli().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn test_failed_run_returns_exit_code() {
        let matches = matches_from(&["cannonsim", "--angle", "90"]);
        let verbose_level = matches.get_count("verbose");
        assert_eq!(exit_code(run(&matches, verbose_level)), 1);

        let matches = matches_from(&["cannonsim", "--scenario", "does/not/exist.yaml"]);
        assert_eq!(exit_code(run(&matches, 0)), 1);
    }

    #[test]
    fn test_info_run_returns_success() {
        let matches = matches_from(&["cannonsim", "--info"]);
        assert_eq!(exit_code(run(&matches, 0)), 0);
    }

    #[test]
    fn test_invalid_log_output_is_reported() {
        let matches = matches_from(&["cannonsim", "--log-output", "syslog"]);
        assert!(build_log_config(&matches, 0).is_err());
    }
}
