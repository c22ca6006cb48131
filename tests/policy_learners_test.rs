use approx::assert_abs_diff_eq;
use policylab::action_space::DiscreteActionSpace;
use policylab::environment::Environment;
use policylab::environments::LinearSyntheticBandit;
use policylab::exploration::{GreedyExploration, UcbExploration};
use policylab::policy_learners::{
    DeepBandit, DeepBanditConfig, DeepQLearning, DeepQLearningConfig, DisjointLinearBandit,
    DisjointLinearBanditConfig, PolicyGradient, PolicyGradientConfig, PolicyLearner,
};
use policylab::replay_buffer::{
    FifoOffPolicyReplayBuffer, ReplayBuffer, Transition, TransitionBatch,
};
use tch::{Device, Kind, Tensor};

fn actions(tensor: &Tensor) -> Vec<i64> {
    Vec::<i64>::try_from(tensor).unwrap()
}

#[test]
fn deep_bandit_regresses_rewards() {
    tch::manual_seed(0);
    let space = DiscreteActionSpace::one_hot(3).unwrap();
    let mut learner = DeepBandit::new(
        5,
        space.clone(),
        Box::new(GreedyExploration),
        DeepBanditConfig::default(),
        Device::Cpu,
    )
    .unwrap();

    let state = Tensor::rand([64, 2], (Kind::Float, Device::Cpu));
    let action = Tensor::randint(3, [64], (Kind::Int64, Device::Cpu));
    // reward = x0 + action index
    let reward = state.select(1, 0) + action.to_kind(Kind::Float);
    let batch = TransitionBatch::from_tensors(&state, &action, &reward);

    let first = learner.learn_batch(&batch).unwrap()["loss"];
    let mut last = first;
    for _ in 0..300 {
        last = learner.learn_batch(&batch).unwrap()["loss"];
    }
    assert!(last < first * 0.1, "loss {last} vs {first}");

    // the highest index pays most
    let chosen = learner.act(&state.narrow(0, 0, 8), &space, false).unwrap();
    assert_eq!(actions(&chosen), vec![2; 8]);

    let scores = learner.get_scores(&state.narrow(0, 0, 4), Some(&space)).unwrap();
    assert_eq!(scores.size(), vec![4, 3]);
}

#[test]
fn deep_bandit_rejects_bad_dims() {
    let space = DiscreteActionSpace::one_hot(3).unwrap();
    let build = |feature_dim| {
        DeepBandit::new(
            feature_dim,
            space.clone(),
            Box::new(GreedyExploration),
            DeepBanditConfig::default(),
            Device::Cpu,
        )
    };
    assert!(build(3).is_err());

    let mut learner = build(5).unwrap();
    let state = Tensor::zeros([1, 3], (Kind::Float, Device::Cpu));
    assert!(learner.act(&state, &space, false).is_err());
}

#[test]
fn disjoint_linear_bandit_finds_the_best_arm() {
    let space = DiscreteActionSpace::one_hot(3).unwrap();
    let mut env =
        LinearSyntheticBandit::new(2, space.clone(), vec![1.0, -1.0, 0.1, 0.5, 0.9], 0.0, 11)
            .unwrap();
    let mut learner = DisjointLinearBandit::new(
        5,
        space.clone(),
        Box::new(UcbExploration::new(0.0)),
        DisjointLinearBanditConfig {
            l2_reg_lambda: 1e-2,
            ..Default::default()
        },
        Device::Cpu,
    )
    .unwrap();

    let (mut context, _) = env.reset().unwrap();
    for step in 0..300i64 {
        let action = step % 3;
        let result = env.step(action).unwrap();
        let batch = TransitionBatch::from_tensors(
            &context,
            &Tensor::from_slice(&[action]),
            &Tensor::from_slice(&[result.reward]),
        );
        let report = learner.learn_batch(&batch).unwrap();
        assert!(report.is_empty());
        context = result.observation;
    }

    for _ in 0..10 {
        let chosen = learner.act(&context, &space, true).unwrap();
        assert_eq!(actions(&chosen), vec![env.best_action()]);
        let scores = learner.get_scores(&context).unwrap();
        let expected = env.expected_rewards().unsqueeze(0);
        assert!(scores.allclose(&expected, 5e-2, 5e-2, false));
        context = env.step(0).unwrap().observation;
    }
    assert_eq!(learner.linear_regressions().len(), 3);
}

#[test]
fn disjoint_linear_bandit_uses_weights_and_checks_actions() {
    let space = DiscreteActionSpace::one_hot(2).unwrap();
    let mut learner = DisjointLinearBandit::new(
        3,
        space.clone(),
        Box::new(GreedyExploration),
        DisjointLinearBanditConfig::default(),
        Device::Cpu,
    )
    .unwrap();
    let state = Tensor::ones([2, 1], (Kind::Float, Device::Cpu));

    // zero weight: nothing is learned for action 0
    let batch = TransitionBatch::from_tensors(
        &state,
        &Tensor::from_slice(&[0i64, 1]),
        &Tensor::from_slice(&[5.0f32, 5.0]),
    )
    .with_weight(&Tensor::from_slice(&[0.0f32, 1.0]));
    learner.learn_batch(&batch).unwrap();
    let models = learner.linear_regressions().models();
    assert_abs_diff_eq!(models[0].coefs().abs().sum(Kind::Float).double_value(&[]), 0.0);
    assert!(models[1].coefs().abs().sum(Kind::Float).double_value(&[]) > 0.0);

    let bad = TransitionBatch::from_tensors(
        &state,
        &Tensor::from_slice(&[0i64, 2]),
        &Tensor::from_slice(&[1.0f32, 1.0]),
    );
    assert!(learner.learn_batch(&bad).is_err());

    let other_space = DiscreteActionSpace::one_hot(3).unwrap();
    assert!(learner.act(&state, &other_space, false).is_err());
}

#[test]
fn policy_gradient_reinforces_rewarded_actions() {
    tch::manual_seed(1);
    let space = DiscreteActionSpace::one_hot(2).unwrap();
    let config = PolicyGradientConfig {
        learning_rate: 1e-2,
        ..Default::default()
    };
    let mut learner = PolicyGradient::new(4, space.clone(), None, config, Device::Cpu).unwrap();
    assert!(learner.on_policy());
    assert_abs_diff_eq!(learner.discount_factor(), 0.99);

    let state = Tensor::randn([16, 4], (Kind::Float, Device::Cpu));
    let action = Tensor::zeros([16], (Kind::Int64, Device::Cpu));
    let returns = Tensor::ones([16], (Kind::Float, Device::Cpu));
    let batch = TransitionBatch::from_tensors(&state, &action, &returns);

    let first_action_probability = |learner: &PolicyGradient| {
        learner
            .action_probabilities(&state)
            .select(1, 0)
            .mean(Kind::Float)
            .double_value(&[])
    };
    let before = first_action_probability(&learner);
    for _ in 0..50 {
        learner.learn_batch(&batch).unwrap();
    }
    let after = first_action_probability(&learner);
    assert!(after > before, "{after} <= {before}");
    assert!(after > 0.9);

    let chosen = learner.act(&state, &space, true).unwrap();
    assert_eq!(actions(&chosen), vec![0; 16]);
    let explored = learner.act(&state.get(0), &space, false).unwrap();
    assert_eq!(explored.size(), vec![1]);

    let out_of_range = Tensor::full([16], 5i64, (Kind::Int64, Device::Cpu));
    let bad = TransitionBatch::from_tensors(&state, &out_of_range, &returns);
    assert!(learner.learn_batch(&bad).is_err());
}

#[test]
fn deep_q_learning_updates_target_softly() {
    tch::manual_seed(2);
    let space = DiscreteActionSpace::one_hot(2).unwrap();
    let config = DeepQLearningConfig {
        batch_size: 8,
        training_rounds: 2,
        ..Default::default()
    };
    let mut learner = DeepQLearning::new(3, space.clone(), None, config, Device::Cpu).unwrap();

    let online = learner.var_store().variables();
    for (name, value) in learner.target_var_store().variables() {
        assert!(value.equal(&online[&name]), "{name} differs after construction");
    }

    let mut buffer = FifoOffPolicyReplayBuffer::with_seed(100, 0);
    for i in 0..4 {
        let state = Tensor::randn([3], (Kind::Float, Device::Cpu));
        buffer.push(Transition::new(&state, i % 2, 1.0, &state, i == 3));
    }
    // not enough data yet
    assert!(learner.learn(&mut buffer).unwrap().is_empty());
    for i in 0..12 {
        let state = Tensor::randn([3], (Kind::Float, Device::Cpu));
        buffer.push(Transition::new(&state, i % 2, 1.0, &state, false));
    }
    let before: Vec<(String, Tensor)> = learner
        .target_var_store()
        .variables()
        .into_iter()
        .map(|(name, value)| (name, value.copy()))
        .collect();
    let reports = learner.learn(&mut buffer).unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r["loss"].is_finite()));

    let target = learner.target_var_store().variables();
    let online = learner.var_store().variables();
    let moved = before.iter().any(|(name, value)| !value.equal(&target[name]));
    assert!(moved);
    let identical = target.iter().all(|(name, value)| value.equal(&online[name]));
    assert!(!identical);

    let q = learner.q_values(&Tensor::randn([5, 3], (Kind::Float, Device::Cpu)));
    assert_eq!(q.size(), vec![5, 2]);
    let single_state = Tensor::randn([3], (Kind::Float, Device::Cpu));
    let chosen = learner.act(&single_state, &space, false).unwrap();
    assert_eq!(chosen.size(), vec![1]);
}

#[test]
fn dueling_deep_q_learning_learns() {
    tch::manual_seed(3);
    let space = DiscreteActionSpace::one_hot(3).unwrap();
    let config = DeepQLearningConfig {
        dueling: true,
        hidden_dims: vec![16],
        ..Default::default()
    };
    let mut learner = DeepQLearning::new(4, space.clone(), None, config, Device::Cpu).unwrap();
    let state = Tensor::randn([8, 4], (Kind::Float, Device::Cpu));
    let batch = TransitionBatch::from_tensors(
        &state,
        &Tensor::from_slice(&[0i64, 1, 2, 0, 1, 2, 0, 1]),
        &Tensor::ones([8], (Kind::Float, Device::Cpu)),
    );
    let report = learner.learn_batch(&batch).unwrap();
    assert!(report["loss"].is_finite());
    assert_eq!(learner.q_values(&state).size(), vec![8, 3]);

    // a different action count is refused
    learner.reset(&DiscreteActionSpace::one_hot(4).unwrap());
    assert_eq!(learner.act(&state, &space, true).unwrap().size(), vec![8]);
}
