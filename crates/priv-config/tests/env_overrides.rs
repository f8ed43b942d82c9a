//! Environment variable layering over TOML and defaults.

use figment::Jail;
use priv_config::PrivConfig;

#[test]
fn env_overrides_scalar_fields() {
    Jail::expect_with(|jail| {
        jail.set_env("PRIVBENCH_ANALYSIS__TRIALS", "12");
        jail.set_env("PRIVBENCH_ANALYSIS__SEED", "7");
        jail.set_env("PRIVBENCH_SINK__DIRECTORY", "/tmp/privbench-results");

        let config = PrivConfig::load().expect("config loads");
        assert_eq!(config.analysis.trials, 12);
        assert_eq!(config.analysis.seed, Some(7));
        assert_eq!(
            config.sink.directory.to_str(),
            Some("/tmp/privbench-results")
        );
        Ok(())
    });
}

#[test]
fn env_overrides_lists() {
    Jail::expect_with(|jail| {
        jail.set_env("PRIVBENCH_ANALYSIS__K_VALUES", "[3, 4]");
        jail.set_env("PRIVBENCH_ANALYSIS__EPSILONS", "[0.2, 2.0]");

        let config = PrivConfig::load().expect("config loads");
        assert_eq!(config.analysis.k_values, vec![3, 4]);
        assert_eq!(config.analysis.epsilons, vec![0.2, 2.0]);
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".privbench")?;
        jail.create_file(
            ".privbench/config.toml",
            "[datasets]\nmax_rows = 10\n[sink]\nenabled = true\n",
        )?;
        jail.set_env("PRIVBENCH_DATASETS__MAX_ROWS", "500");

        let config = PrivConfig::load().expect("config loads");
        assert_eq!(config.datasets.max_rows, Some(500));
        assert!(config.sink.enabled);
        Ok(())
    });
}

#[test]
fn log_filter_variable_is_ignored_by_config() {
    Jail::expect_with(|jail| {
        jail.set_env("PRIVBENCH_LOG", "debug");
        assert!(PrivConfig::load().is_ok());
        Ok(())
    });
}
