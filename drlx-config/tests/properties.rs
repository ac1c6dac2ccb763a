use std::path::PathBuf;

use drlx_config::{
    ConfigNode, DdpoConfig, DrlxConfig, LogBackend, LoggingConfig, Mapping, MethodConfig,
    ModelConfig, OptimizerConfig, PerPromptStatTrackerConfig, PredictionMode, RewardModelConfig,
    SamplerConfig, SchedulerConfig, TrainConfig, Value, merge,
};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6f64
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        finite().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

fn kwargs() -> impl Strategy<Value = Mapping> {
    prop::collection::btree_map("[a-z_]{1,8}", scalar(), 0..4)
        .prop_map(|entries| entries.into_iter().collect())
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn model() -> impl Strategy<Value = ModelConfig> {
    ("[A-Za-z/-]{1,24}", name(), kwargs()).prop_map(|(model_path, model_arch_type, peft_config)| {
        ModelConfig {
            model_path,
            model_arch_type,
            peft_config,
        }
    })
}

fn optimizer() -> impl Strategy<Value = OptimizerConfig> {
    (name(), kwargs()).prop_map(|(name, kwargs)| OptimizerConfig { name, kwargs })
}

fn scheduler() -> impl Strategy<Value = SchedulerConfig> {
    (name(), kwargs()).prop_map(|(name, kwargs)| SchedulerConfig { name, kwargs })
}

fn train() -> impl Strategy<Value = TrainConfig> {
    (
        any::<usize>(),
        any::<usize>(),
        any::<usize>(),
        finite(),
        any::<usize>(),
        "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
        any::<u64>(),
    )
        .prop_map(
            |(batch_size, num_epochs, num_samples_per_epoch, grad_clip, checkpoint_interval, path, seed)| {
                TrainConfig {
                    batch_size,
                    num_epochs,
                    num_samples_per_epoch,
                    grad_clip,
                    checkpoint_interval,
                    checkpoint_path: PathBuf::from(path),
                    seed,
                }
            },
        )
}

fn logging() -> impl Strategy<Value = LoggingConfig> {
    (
        prop_oneof![Just(LogBackend::Wandb), Just(LogBackend::Tensorboard)],
        any::<usize>(),
        prop::option::of(name()),
        prop::option::of(name()),
        prop::option::of(name()),
    )
        .prop_map(
            |(log_with, log_every, run_name, wandb_entity, wandb_project)| LoggingConfig {
                log_with,
                log_every,
                run_name,
                wandb_entity,
                wandb_project,
            },
        )
}

fn reward_model() -> impl Strategy<Value = RewardModelConfig> {
    (name(), kwargs(), prop::option::of(name())).prop_map(|(name, kwargs, model_path)| {
        RewardModelConfig {
            name,
            kwargs,
            model_path,
        }
    })
}

fn tracker() -> impl Strategy<Value = PerPromptStatTrackerConfig> {
    (any::<usize>(), any::<usize>()).prop_map(|(buffer_size, min_count)| {
        PerPromptStatTrackerConfig {
            buffer_size,
            min_count,
        }
    })
}

fn sampler() -> impl Strategy<Value = SamplerConfig> {
    (
        prop_oneof![
            Just(PredictionMode::X),
            Just(PredictionMode::V),
            Just(PredictionMode::Eps)
        ],
        finite(),
        finite(),
        any::<usize>(),
        finite(),
        "[a-z:0-9]{1,8}",
        any::<bool>(),
    )
        .prop_map(
            |(mode, guidance_scale, sigma_data, num_inference_steps, eta, device, postprocess)| {
                SamplerConfig {
                    mode,
                    guidance_scale,
                    sigma_data,
                    num_inference_steps,
                    eta,
                    device,
                    postprocess,
                }
            },
        )
}

fn ddpo() -> impl Strategy<Value = DdpoConfig> {
    (
        prop_oneof![Just("ddpo".to_owned()), Just("DDPO".to_owned())],
        finite(),
        finite(),
        any::<usize>(),
        any::<usize>(),
    )
        .prop_map(
            |(name, clip_advantages, clip_ratio, num_inner_epochs, sample_batch_size)| DdpoConfig {
                name,
                clip_advantages,
                clip_ratio,
                num_inner_epochs,
                sample_batch_size,
            },
        )
}

fn config() -> impl Strategy<Value = DrlxConfig> {
    (
        model(),
        optimizer(),
        scheduler(),
        train(),
        logging(),
        reward_model(),
        ddpo(),
        prop::option::of(tracker()),
    )
        .prop_map(
            |(model, optimizer, scheduler, train, logging, reward_model, ddpo, tracker)| {
                DrlxConfig {
                    model,
                    optimizer,
                    scheduler,
                    train,
                    logging,
                    reward_model,
                    method: MethodConfig::Ddpo(ddpo),
                    per_prompt_stat_tracker: tracker,
                }
            },
        )
}

fn nested() -> impl Strategy<Value = Mapping> {
    let value = scalar().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-d]", inner, 0..4)
            .prop_map(|entries| Value::Object(entries.into_iter().collect()))
    });
    prop::collection::btree_map("[a-d]", value, 0..5)
        .prop_map(|entries| entries.into_iter().collect())
}

fn assert_round_trip<T>(record: &T) -> Result<(), TestCaseError>
where
    T: ConfigNode + PartialEq + std::fmt::Debug,
{
    let fail = |err: drlx_config::ConfigError| TestCaseError::fail(err.to_string());
    let mapping = record.to_mapping().map_err(fail)?;
    let rebuilt = T::from_mapping(mapping.clone()).map_err(fail)?;
    prop_assert_eq!(&rebuilt, record);
    prop_assert_eq!(rebuilt.to_mapping().map_err(fail)?, mapping);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn leaf_records_round_trip(
        model in model(),
        optimizer in optimizer(),
        scheduler in scheduler(),
        train in train(),
        logging in logging(),
        reward_model in reward_model(),
        tracker in tracker(),
        sampler in sampler(),
        ddpo in ddpo(),
    ) {
        assert_round_trip(&model)?;
        assert_round_trip(&optimizer)?;
        assert_round_trip(&scheduler)?;
        assert_round_trip(&train)?;
        assert_round_trip(&logging)?;
        assert_round_trip(&reward_model)?;
        assert_round_trip(&tracker)?;
        assert_round_trip(&sampler)?;
        assert_round_trip(&ddpo)?;
    }

    #[test]
    fn whole_tree_round_trips(config in config()) {
        let mapping = config.to_mapping().unwrap();
        let rebuilt = DrlxConfig::from_mapping(mapping.clone()).unwrap();
        prop_assert_eq!(&rebuilt, &config);
        prop_assert_eq!(rebuilt.to_mapping().unwrap(), mapping);
    }

    #[test]
    fn merge_is_idempotent_and_pure(base in nested(), update in nested()) {
        let snapshot = base.clone();
        let once = merge(&base, &update);
        let twice = merge(&once.merged, &update);

        prop_assert_eq!(&base, &snapshot);
        prop_assert_eq!(&twice.merged, &once.merged);
        prop_assert_eq!(&twice.touched, &once.touched);
        prop_assert_eq!(&twice.unmatched, &once.unmatched);
    }

    #[test]
    fn overriding_existing_fields_only_changes_those_fields(
        config in config(),
        batch_size in any::<usize>(),
        seed in any::<u64>(),
    ) {
        let mut overrides = Mapping::new();
        overrides.insert("train.batch_size".into(), batch_size.into());
        overrides.insert("train.seed".into(), seed.into());

        let updated = config.update(&overrides).unwrap();
        let mut expected = config.clone();
        expected.train.batch_size = batch_size;
        expected.train.seed = seed;
        prop_assert_eq!(updated, expected);
    }
}
