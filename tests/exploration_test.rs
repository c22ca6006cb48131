use approx::assert_abs_diff_eq;
use policylab::action_space::DiscreteActionSpace;
use policylab::exploration::{
    EGreedyExploration, ExplorationContext, ExplorationModule, GreedyExploration,
    PropensityExploration, ThompsonSamplingExploration, UcbExploration, argmax,
};
use policylab::linear_regression::LinearRegressionEnsemble;
use tch::{Device, Kind, Tensor};

fn actions(tensor: Tensor) -> Vec<i64> {
    Vec::<i64>::try_from(&tensor).unwrap()
}

#[test]
fn greedy_picks_the_best_value_per_row() {
    let space = DiscreteActionSpace::one_hot(3).unwrap();
    let state = Tensor::zeros([2, 1], (Kind::Float, Device::Cpu));
    let values = Tensor::from_slice(&[0.1f32, 0.9, 0.3, 2.0, -1.0, 0.0]).view([2, 3]);
    let chosen = GreedyExploration
        .act(ExplorationContext::new(&state, &space, &values))
        .unwrap();
    assert_eq!(actions(chosen), vec![1, 0]);
}

#[test]
fn argmax_breaks_ties_low() {
    let values = Tensor::from_slice(&[1.0f32, 1.0, 0.0]);
    assert_eq!(argmax(&values).int64_value(&[]), 0);
}

#[test]
fn egreedy_extremes() {
    let space = DiscreteActionSpace::one_hot(4).unwrap();
    let state = Tensor::zeros([1, 1], (Kind::Float, Device::Cpu));
    let values = Tensor::from_slice(&[0.0f32, 0.0, 5.0, 0.0]).view([1, 4]);

    let mut never = EGreedyExploration::with_seed(0.0, 7).unwrap();
    for _ in 0..20 {
        let chosen = never.act(ExplorationContext::new(&state, &space, &values)).unwrap();
        assert_eq!(actions(chosen), vec![2]);
    }

    let mut always = EGreedyExploration::with_seed(1.0, 7).unwrap();
    let mut seen = [false; 4];
    for _ in 0..200 {
        let chosen = always.act(ExplorationContext::new(&state, &space, &values)).unwrap();
        seen[actions(chosen)[0] as usize] = true;
    }
    assert!(seen.iter().all(|&s| s));

    assert!(EGreedyExploration::new(1.5).is_err());
}

#[test]
fn egreedy_prefers_the_exploit_action_and_decays() {
    let space = DiscreteActionSpace::one_hot(2).unwrap();
    let state = Tensor::zeros([1, 1], (Kind::Float, Device::Cpu));
    let values = Tensor::from_slice(&[1.0f32, 0.0]).view([1, 2]);
    let exploit = Tensor::from_slice(&[1i64]);
    let mut module = EGreedyExploration::with_seed(0.0, 0).unwrap();
    let chosen = module
        .act(ExplorationContext::new(&state, &space, &values).with_exploit_action(&exploit))
        .unwrap();
    assert_eq!(actions(chosen), vec![1]);

    let mut module = EGreedyExploration::with_seed(0.5, 0).unwrap();
    module.decay(0.5, 0.2);
    assert_abs_diff_eq!(module.epsilon(), 0.25);
    module.decay(0.5, 0.2);
    assert_abs_diff_eq!(module.epsilon(), 0.2);
}

#[test]
fn propensity_samples_by_probability() {
    tch::manual_seed(0);
    let space = DiscreteActionSpace::one_hot(3).unwrap();
    let state = Tensor::zeros([1, 1], (Kind::Float, Device::Cpu));
    let values = Tensor::from_slice(&[0.0f32, 0.0, 1.0]).view([1, 3]);
    for _ in 0..20 {
        let chosen = PropensityExploration
            .act(ExplorationContext::new(&state, &space, &values))
            .unwrap();
        assert_eq!(actions(chosen), vec![2]);
    }

    // degenerate rows fall back to uniform
    let zeros = Tensor::zeros([50, 3], (Kind::Float, Device::Cpu));
    let states = Tensor::zeros([50, 1], (Kind::Float, Device::Cpu));
    let chosen = PropensityExploration
        .act(ExplorationContext::new(&states, &space, &zeros))
        .unwrap();
    let chosen = actions(chosen);
    assert_eq!(chosen.len(), 50);
    assert!(chosen.iter().all(|&a| (0..3).contains(&a)));
}

#[test]
fn ucb_adds_the_confidence_bonus() {
    let space = DiscreteActionSpace::one_hot(2).unwrap();
    let mut ensemble = LinearRegressionEnsemble::new(2, 3, 1.0, Device::Cpu).unwrap();
    // action 0 is well known, action 1 is not
    let features = space.cat_state_tensor(&Tensor::from_slice(&[1.0f32]));
    let seen = features.select(1, 0).repeat([50, 1]);
    let rewards = Tensor::zeros([50], (Kind::Float, Device::Cpu));
    let weights = Tensor::ones([50], (Kind::Float, Device::Cpu));
    ensemble.models_mut()[0].learn_batch(&seen, &rewards, &weights).unwrap();

    let values = Tensor::from_slice(&[0.5f32, 0.0]).view([1, 2]);
    let mut optimistic = UcbExploration::new(10.0);
    let chosen = optimistic
        .act(ExplorationContext::new(&features, &space, &values).with_representation(&ensemble))
        .unwrap();
    assert_eq!(actions(chosen), vec![1]);

    let mut greedy = UcbExploration::new(0.0);
    let chosen = greedy
        .act(ExplorationContext::new(&features, &space, &values).with_representation(&ensemble))
        .unwrap();
    assert_eq!(actions(chosen), vec![0]);

    assert!(optimistic.act(ExplorationContext::new(&features, &space, &values)).is_err());
}

#[test]
fn thompson_sampling_needs_a_representation() {
    tch::manual_seed(1);
    let space = DiscreteActionSpace::one_hot(2).unwrap();
    let ensemble = LinearRegressionEnsemble::new(2, 3, 1.0, Device::Cpu).unwrap();
    let features = space.cat_state_tensor(&Tensor::from_slice(&[1.0f32]));
    let values = Tensor::from_slice(&[0.0f32, 0.0]).view([1, 2]);

    let chosen = ThompsonSamplingExploration
        .act(ExplorationContext::new(&features, &space, &values).with_representation(&ensemble))
        .unwrap();
    assert_eq!(chosen.size(), vec![1]);
    assert!(ThompsonSamplingExploration
        .act(ExplorationContext::new(&features, &space, &values))
        .is_err());
}

/// Two arms over a constant state; the listed arms get 50 observations each.
fn thompson_arms(trained: &[usize]) -> (DiscreteActionSpace, LinearRegressionEnsemble) {
    let space = DiscreteActionSpace::one_hot(2).unwrap();
    let mut ensemble = LinearRegressionEnsemble::new(2, 3, 1.0, Device::Cpu).unwrap();
    let features = space.cat_state_tensor(&Tensor::from_slice(&[1.0f32]));
    let rewards = Tensor::zeros([50], (Kind::Float, Device::Cpu));
    let weights = Tensor::ones([50], (Kind::Float, Device::Cpu));
    for &arm in trained {
        let seen = features.select(1, arm as i64).repeat([50, 1]);
        ensemble.models_mut()[arm].learn_batch(&seen, &rewards, &weights).unwrap();
    }
    (space, ensemble)
}

fn thompson_wins_of_arm_one(
    space: &DiscreteActionSpace,
    ensemble: &LinearRegressionEnsemble,
) -> usize {
    let features = space.cat_state_tensor(&Tensor::ones([200, 1], (Kind::Float, Device::Cpu)));
    let values = Tensor::from_slice(&[0.5f32, 0.0]).repeat([200, 1]);
    let chosen = ThompsonSamplingExploration
        .act(ExplorationContext::new(&features, space, &values).with_representation(ensemble))
        .unwrap();
    let chosen = actions(chosen);
    assert_eq!(chosen.len(), 200);
    chosen.iter().filter(|&&a| a == 1).count()
}

#[test]
fn thompson_sampling_follows_the_mean_when_both_arms_are_known() {
    tch::manual_seed(21);
    // sigma is about 0.14 for both arms, so the 0.5 gap is 2.5 standard deviations
    let (space, ensemble) = thompson_arms(&[0, 1]);
    let wins = thompson_wins_of_arm_one(&space, &ensemble);
    assert!(wins <= 10, "known worse arm won {wins} of 200 draws");
}

#[test]
fn thompson_sampling_explores_the_uncertain_arm() {
    tch::manual_seed(22);
    // the untrained arm keeps sigma = sqrt(3) and wins about 40% of the draws
    let (space, ensemble) = thompson_arms(&[0]);
    let wins = thompson_wins_of_arm_one(&space, &ensemble);
    assert!((40..=120).contains(&wins), "uncertain arm won {wins} of 200 draws");
}
