use iva_berry::bss::{pca, registry, AuxIva, BssResult};
use iva_berry::prelude::*;
use ndarray::{ArrayView3, Ix1, Ix2, OwnedRepr};
use ndarray_npy::NpzReader;
use rand::rngs::StdRng;
use std::fs::File;
use std::io;

fn small_config() -> ExperimentConfig {
    ExperimentConfig {
        master_seed: 2024,
        n_repeat: 3,
        params: vec![ScenarioParams {
            n_freq: 2,
            n_chan: 2,
            pca: false,
        }],
        n_frames: 200,
        distrib: Distribution::Laplace,
        algos: vec![AlgoSpec::new("auxiva", "auxiva", AlgoParams::with_n_iter(4))],
    }
}

#[test]
fn test_end_to_end_convergence() {
    let _ = simple_logger::init_with_level(log::Level::Warn);

    let config = small_config();
    let result = Experiment::new(config, &Bss)
        .workers(2)
        .run(io::sink())
        .unwrap();
    assert!(result.failed.is_empty());

    let isr = result.tables.isr(0, "auxiva").unwrap();
    assert_eq!(isr.dim(), (3, 5));
    assert!(isr.iter().all(|v| v.is_finite()));

    // 200 帧的 2x2 混合上 ISR 不一定单调, 只允许单步的小幅回升
    for row in isr.rows() {
        for (a, b) in row.iter().zip(row.iter().skip(1)) {
            assert!(*b <= *a + 3.0, "{row}");
        }
    }

    // 代价函数则必须不增
    let cost = result.tables.cost(0, "auxiva").unwrap();
    assert_eq!(cost.dim(), (3, 5));
    assert!(cost.iter().all(|v| v.is_finite()));
    for row in cost.rows() {
        for (a, b) in row.iter().zip(row.iter().skip(1)) {
            assert!(*b <= *a + 1e-9 * a.abs(), "{row}");
        }
    }
}

#[test]
fn test_tables_do_not_depend_on_workers() {
    let mut config = small_config();
    config.n_repeat = 6;
    config.params.push(ScenarioParams {
        n_freq: 3,
        n_chan: 3,
        pca: true,
    });
    config
        .algos
        .push(AlgoSpec::new("iss", "auxiva-iss", AlgoParams::with_n_iter(3)));

    let a = Experiment::new(config.clone(), &Bss)
        .workers(1)
        .run(io::sink())
        .unwrap();
    let b = Experiment::new(config, &Bss)
        .workers(4)
        .run(io::sink())
        .unwrap();

    for ((sa, na, ia, ca), (sb, nb, ib, cb)) in a.tables.cells().zip(b.tables.cells()) {
        assert_eq!((sa, na), (sb, nb));
        assert_eq!(ia, ib);
        assert_eq!(ca, cb);
    }
}

#[test]
fn test_invalid_config_is_rejected_before_dispatch() {
    let mut config = small_config();
    config.algos[0].algo = "fastiva".into();
    let mut out = Vec::new();
    let res = Experiment::new(config, &Bss).run(&mut out);
    assert!(matches!(
        res,
        Err(ExperimentError::Config(ConfigError::UnknownAlgorithm(..)))
    ));
    // 进度线程从未启动
    assert!(out.is_empty());
}

/// 白化总是失败的工具箱.
struct NoWhitening;

impl Toolbox for NoWhitening {
    fn rand_mixture(
        &self,
        n_freq: usize,
        n_chan: usize,
        n_frames: usize,
        distrib: Distribution,
        rng: &mut StdRng,
    ) -> RandMixture {
        Bss.rand_mixture(n_freq, n_chan, n_frames, distrib, rng)
    }

    fn whiten(&self, x: ArrayView3<C64>) -> Result<(Signals, Filters), BssError> {
        let _ = pca(x)?;
        Err(BssError::RankDeficient(0))
    }

    fn algorithm(&self, name: &str) -> Option<&dyn Separator> {
        registry::lookup(name)
    }
}

#[test]
fn test_failed_tasks_are_isolated() {
    let mut config = small_config();
    config.params.push(ScenarioParams {
        n_freq: 2,
        n_chan: 2,
        pca: true,
    });

    let mut out = Vec::new();
    let result = Experiment::new(config, &NoWhitening)
        .workers(3)
        .run(&mut out)
        .unwrap();

    // 失败的任务同样计入进度
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Remaining tasks: 0 / 6"));
    assert!(out.contains("All done."));

    let failed: Vec<_> = result
        .failed
        .iter()
        .map(|f| (f.scenario, f.repetition))
        .collect();
    assert_eq!(failed, [(1, 0), (1, 1), (1, 2)]);

    assert!(result.tables.isr(0, "auxiva").unwrap().iter().all(|v| v.is_finite()));
    assert!(result.tables.isr(1, "auxiva").unwrap().iter().all(|v| v.is_nan()));
}

#[test]
fn test_save_and_read_back() {
    let config = small_config();
    let result = Experiment::new(config.clone(), &Bss)
        .workers(2)
        .run(io::sink())
        .unwrap();

    let path = std::env::temp_dir().join(format!(
        "iva-berry-test-{}-{}",
        std::process::id(),
        default_filename(chrono::Local::now())
    ));
    save_npz(&path, &config, &result).unwrap();

    let mut npz = NpzReader::new(File::open(&path).unwrap()).unwrap();
    let raw = npz.names().unwrap();
    let entry = |stem: &str| {
        raw.iter()
            .find(|n| n.trim_end_matches(".npy") == stem)
            .cloned()
            .unwrap()
    };
    let mut names: Vec<_> = raw.iter().map(|n| n.trim_end_matches(".npy")).collect();
    names.sort_unstable();
    assert_eq!(names, ["config", "cost_0_auxiva", "failed", "isr_0_auxiva"]);

    let bytes = npz.by_name::<OwnedRepr<u8>, Ix1>(&entry("config")).unwrap();
    let json = std::str::from_utf8(bytes.as_slice().unwrap()).unwrap();
    let back = ExperimentConfig::from_json_str(json).unwrap();
    assert_eq!(back, config);

    let isr = npz.by_name::<OwnedRepr<f64>, Ix2>(&entry("isr_0_auxiva")).unwrap();
    assert_eq!(isr, result.tables.isr(0, "auxiva").unwrap());

    let failed = npz.by_name::<OwnedRepr<u64>, Ix2>(&entry("failed")).unwrap();
    assert_eq!(failed.dim(), (0, 2));

    std::fs::remove_file(path).unwrap();
}

/// 一次迭代更新一对通道, 只在偶数次迭代采样. 更新本身借用 IP.
struct Pairwise;

impl Separator for Pairwise {
    fn is_dual_update(&self) -> bool {
        true
    }

    fn separate(
        &self,
        x: ArrayView3<C64>,
        params: &AlgoParams,
        model: Distribution,
        checkpoints: &[usize],
        callback: &mut Checkpoint<'_>,
    ) -> BssResult<(Signals, Filters)> {
        AuxIva::Ip.separate(x, params, model, checkpoints, callback)
    }
}

/// 只运行一半的迭代便停止.
struct StopsHalfway;

impl Separator for StopsHalfway {
    fn separate(
        &self,
        x: ArrayView3<C64>,
        params: &AlgoParams,
        model: Distribution,
        checkpoints: &[usize],
        callback: &mut Checkpoint<'_>,
    ) -> BssResult<(Signals, Filters)> {
        let half = AlgoParams::with_n_iter(params.n_iter / 2);
        AuxIva::Ip.separate(x, &half, model, checkpoints, callback)
    }
}

/// 遇到三通道输入时 panic.
struct Fragile;

impl Separator for Fragile {
    fn separate(
        &self,
        x: ArrayView3<C64>,
        params: &AlgoParams,
        model: Distribution,
        checkpoints: &[usize],
        callback: &mut Checkpoint<'_>,
    ) -> BssResult<(Signals, Filters)> {
        if x.dim().1 == 3 {
            panic!("three channels are not supported");
        }
        AuxIva::Ip.separate(x, params, model, checkpoints, callback)
    }
}

/// 在内置算法之外注册了上面三个算法的工具箱.
struct Extended;

impl Toolbox for Extended {
    fn rand_mixture(
        &self,
        n_freq: usize,
        n_chan: usize,
        n_frames: usize,
        distrib: Distribution,
        rng: &mut StdRng,
    ) -> RandMixture {
        Bss.rand_mixture(n_freq, n_chan, n_frames, distrib, rng)
    }

    fn whiten(&self, x: ArrayView3<C64>) -> Result<(Signals, Filters), BssError> {
        Bss.whiten(x)
    }

    fn algorithm(&self, name: &str) -> Option<&dyn Separator> {
        let algo: &dyn Separator = match name {
            "pairwise" => &Pairwise,
            "halfway" => &StopsHalfway,
            "fragile" => &Fragile,
            _ => return registry::lookup(name),
        };
        Some(algo)
    }
}

#[test]
fn test_dual_update_table_width() {
    let mut config = small_config();
    config.algos = vec![
        AlgoSpec::new("even", "pairwise", AlgoParams::with_n_iter(4)),
        AlgoSpec::new("odd", "pairwise", AlgoParams::with_n_iter(5)),
        AlgoSpec::new("ip", "auxiva", AlgoParams::with_n_iter(5)),
    ];

    let scenario = config.scenarios().next().unwrap();
    let out = run_trial(&scenario, &config.algos, 11, &Extended).unwrap();
    let lengths: Vec<_> = out.iter().map(|(_, t)| t.len()).collect();
    assert_eq!(lengths, [3, 3, 6]);

    let result = Experiment::new(config, &Extended)
        .workers(2)
        .run(io::sink())
        .unwrap();
    assert!(result.failed.is_empty());
    // n_iter / 2 + 1 列
    assert_eq!(result.tables.isr(0, "even").unwrap().dim(), (3, 3));
    assert_eq!(result.tables.cost(0, "odd").unwrap().dim(), (3, 3));
    assert_eq!(result.tables.isr(0, "ip").unwrap().dim(), (3, 6));
    assert!(result.tables.isr(0, "odd").unwrap().iter().all(|v| v.is_finite()));
}

#[test]
fn test_early_stop_fails_only_its_task() {
    let mut config = small_config();
    config
        .algos
        .push(AlgoSpec::new("half", "halfway", AlgoParams::with_n_iter(4)));

    let scenario = config.scenarios().next().unwrap();
    assert_eq!(
        run_trial(&scenario, &config.algos, 3, &Extended),
        Err(TrialError::Truncated {
            algo: "half".into(),
            expected: 5,
            got: 3
        })
    );

    let mut out = Vec::new();
    let result = Experiment::new(config, &Extended)
        .workers(2)
        .run(&mut out)
        .unwrap();
    assert!(String::from_utf8(out).unwrap().contains("All done."));

    assert_eq!(result.failed.len(), 3);
    for f in result.failed.iter() {
        assert!(f.reason.contains("recorded 3 of 5"), "{}", f.reason);
    }
    assert!(result.tables.isr(0, "half").unwrap().iter().all(|v| v.is_nan()));
}

#[test]
fn test_panicking_algorithm_is_recorded() {
    let mut config = small_config();
    config.params.push(ScenarioParams {
        n_freq: 2,
        n_chan: 3,
        pca: false,
    });
    config.algos = vec![AlgoSpec::new("fragile", "fragile", AlgoParams::with_n_iter(3))];

    let mut out = Vec::new();
    let result = Experiment::new(config, &Extended)
        .workers(3)
        .run(&mut out)
        .unwrap();
    assert!(String::from_utf8(out).unwrap().contains("Remaining tasks: 0 / 6"));

    let failed: Vec<_> = result
        .failed
        .iter()
        .map(|f| (f.scenario, f.repetition))
        .collect();
    assert_eq!(failed, [(1, 0), (1, 1), (1, 2)]);
    assert!(result.failed[0].reason.contains("three channels are not supported"));

    assert!(result.tables.isr(0, "fragile").unwrap().iter().all(|v| v.is_finite()));
    assert!(result.tables.isr(1, "fragile").unwrap().iter().all(|v| v.is_nan()));
}
