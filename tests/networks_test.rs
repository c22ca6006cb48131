use approx::assert_abs_diff_eq;
use policylab::action_space::DiscreteActionSpace;
use policylab::networks::{
    Activation, ConvBlockConfig, DuelingValueNetwork, MlpConfig, TwinCritic, ValueNetwork,
    VanillaActorNetwork, VanillaValueNetwork, conv_block, ensemble_forward, init_weights, mlp_block,
    uniform_init_weights, update_target_network, update_target_networks,
};
use tch::nn::{self, ModuleT};
use tch::{Device, Kind, Tensor};

#[test]
fn activations_parse_from_names() {
    for (name, activation) in [
        ("tanh", Activation::Tanh),
        ("relu", Activation::Relu),
        ("leaky_relu", Activation::LeakyRelu),
        ("linear", Activation::Linear),
        ("sigmoid", Activation::Sigmoid),
        ("softplus", Activation::Softplus),
        ("softmax", Activation::Softmax),
    ] {
        assert_eq!(name.parse::<Activation>().unwrap(), activation);
    }
    assert!("gelu".parse::<Activation>().is_err());
}

#[test]
fn softplus_and_leaky_relu_values() {
    let xs = Tensor::from_slice(&[-100.0f32, 0.0, 100.0]);
    let softplus = Vec::<f32>::try_from(&Activation::Softplus.apply(&xs)).unwrap();
    assert_abs_diff_eq!(softplus[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(softplus[1], 2f32.ln(), epsilon = 1e-6);
    assert_abs_diff_eq!(softplus[2], 100.0, epsilon = 1e-4);

    let leaky = Vec::<f32>::try_from(&Activation::LeakyRelu.apply(&xs)).unwrap();
    assert_abs_diff_eq!(leaky[0], -1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(leaky[2], 100.0, epsilon = 1e-5);
}

#[test]
fn mlp_block_output_shape_and_names() {
    tch::manual_seed(0);
    let vs = nn::VarStore::new(Device::Cpu);
    let mut config = MlpConfig::new(6, &[16, 16], 3);
    config.use_layer_norm = true;
    config.use_batch_norm = true;
    config.dropout_ratio = 0.1;
    let block = mlp_block(&(vs.root() / "mlp"), &config);
    let ys = block.forward_t(&Tensor::randn([8, 6], (Kind::Float, Device::Cpu)), true);
    assert_eq!(ys.size(), vec![8, 3]);

    let variables = vs.variables();
    assert!(variables.contains_key("mlp.layer_0.linear.weight"));
    assert!(variables.contains_key("mlp.layer_1.layer_norm.weight"));
    assert!(variables.contains_key("mlp.layer_1.batch_norm.weight"));
    assert!(variables.contains_key("mlp.last_layer.linear.bias"));
}

#[test]
fn mlp_block_with_softmax_output_sums_to_one() {
    tch::manual_seed(1);
    let vs = nn::VarStore::new(Device::Cpu);
    let config = MlpConfig::new(4, &[8], 5).with_last_activation(Activation::Softmax);
    let block = mlp_block(&vs.root(), &config);
    let probs = block.forward_t(&Tensor::randn([3, 4], (Kind::Float, Device::Cpu)), false);
    let sums = probs.sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float);
    let sums = Vec::<f32>::try_from(&sums).unwrap();
    for sum in sums {
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
    }
}

#[test]
fn skip_connections_only_when_dims_match() {
    tch::manual_seed(2);
    let vs = nn::VarStore::new(Device::Cpu);
    let mut config = MlpConfig::new(4, &[4, 4], 4);
    config.use_skip_connections = true;
    config.hidden_activation = Activation::Relu;
    let block = mlp_block(&vs.root(), &config);
    // zero every weight and bias: each residual layer is then the identity
    tch::no_grad(|| {
        for (_, mut var) in vs.variables() {
            let _ = var.zero_();
        }
    });
    let xs = Tensor::randn([5, 4], (Kind::Float, Device::Cpu));
    let ys = block.forward_t(&xs, false);
    assert!(ys.allclose(&xs, 1e-6, 1e-6, false));

    // mismatched dims still build, without residuals
    let vs = nn::VarStore::new(Device::Cpu);
    let mut config = MlpConfig::new(4, &[8], 2);
    config.use_skip_connections = true;
    let block = mlp_block(&vs.root(), &config);
    assert_eq!(block.forward_t(&xs, false).size(), vec![5, 2]);
}

#[test]
fn conv_block_shapes_and_validation() {
    tch::manual_seed(3);
    let vs = nn::VarStore::new(Device::Cpu);
    let config = ConvBlockConfig {
        input_channels_count: 3,
        output_channels_list: vec![8, 16],
        kernel_sizes: vec![3, 3],
        strides: vec![1, 2],
        paddings: vec![1, 1],
        use_batch_norm: true,
    };
    let block = conv_block(&vs.root(), &config).unwrap();
    let ys = block.forward_t(&Tensor::randn([2, 3, 8, 8], (Kind::Float, Device::Cpu)), true);
    assert_eq!(ys.size(), vec![2, 16, 4, 4]);

    let broken = ConvBlockConfig {
        kernel_sizes: vec![3],
        ..config
    };
    assert!(conv_block(&vs.root(), &broken).is_err());
}

#[test]
fn soft_update_blends_parameters() {
    tch::manual_seed(4);
    let source = nn::VarStore::new(Device::Cpu);
    let mut target = nn::VarStore::new(Device::Cpu);
    let _src_net = VanillaValueNetwork::new(&(source.root() / "q"), 3, &[4], 1).unwrap();
    let _tgt_net = VanillaValueNetwork::new(&(target.root() / "q"), 3, &[4], 1).unwrap();

    let before_source = source.variables();
    let before_target: Vec<(String, Tensor)> = target
        .variables()
        .into_iter()
        .map(|(name, value)| (name, value.copy()))
        .collect();

    update_target_network(&mut target, &source, 0.25).unwrap();

    let after = target.variables();
    for (name, old_target) in before_target {
        let expected = &before_source[&name] * 0.25 + old_target * 0.75;
        assert!(after[&name].allclose(&expected, 1e-6, 1e-6, false), "{name}");
    }
}

#[test]
fn hard_update_copies_and_bad_tau_fails() {
    tch::manual_seed(5);
    let source = nn::VarStore::new(Device::Cpu);
    let mut target = nn::VarStore::new(Device::Cpu);
    let _src_net = VanillaValueNetwork::new(&(source.root() / "q"), 3, &[4], 1).unwrap();
    let _tgt_net = VanillaValueNetwork::new(&(target.root() / "q"), 3, &[4], 1).unwrap();

    assert!(update_target_network(&mut target, &source, 1.5).is_err());
    update_target_network(&mut target, &source, 1.0).unwrap();
    let source_variables = source.variables();
    for (name, value) in target.variables() {
        assert!(value.equal(&source_variables[&name]));
    }

    let mut targets = vec![target];
    assert!(update_target_networks(&mut targets, &[], 0.5).is_err());
}

#[test]
fn soft_update_with_missing_parameter_fails() {
    let source = nn::VarStore::new(Device::Cpu);
    let mut target = nn::VarStore::new(Device::Cpu);
    let _src_net = VanillaValueNetwork::new(&(source.root() / "q"), 3, &[4], 1).unwrap();
    let _tgt_net = VanillaValueNetwork::new(&(target.root() / "other"), 3, &[4], 1).unwrap();
    assert!(update_target_network(&mut target, &source, 0.5).is_err());
}

#[test]
fn ensemble_forward_evaluates_each_slice_with_its_model() {
    tch::manual_seed(6);
    let vs = nn::VarStore::new(Device::Cpu);
    let models: Vec<VanillaValueNetwork> = (0..3)
        .map(|i| VanillaValueNetwork::new(&(vs.root() / format!("m{i}")), 4, &[8], 1).unwrap())
        .collect();
    let features = Tensor::randn([5, 3, 4], (Kind::Float, Device::Cpu));
    let values = ensemble_forward(&models, &features).unwrap();
    assert_eq!(values.size(), vec![5, 3]);

    let second = models[1].forward_t(&features.select(1, 1), false).view([-1]);
    assert!(values.select(1, 1).allclose(&second, 1e-6, 1e-6, false));

    let wrong_width = Tensor::randn([5, 2, 4], (Kind::Float, Device::Cpu));
    assert!(ensemble_forward(&models, &wrong_width).is_err());
}

#[test]
fn vanilla_value_network_batch_action_value() {
    tch::manual_seed(7);
    let vs = nn::VarStore::new(Device::Cpu);
    let net = VanillaValueNetwork::new(&vs.root(), 5, &[16, 8], 1).unwrap();
    net.xavier_init();
    let space = DiscreteActionSpace::one_hot(3).unwrap();
    let states = Tensor::randn([4, 2], (Kind::Float, Device::Cpu));
    let actions = Tensor::from_slice(&[0i64, 2, 1, 2]);

    let chosen = net.get_batch_action_value(&states, &actions, &space).unwrap();
    assert_eq!(chosen.size(), vec![4]);
    let all = net.get_all_action_values(&states, &space);
    assert_eq!(all.size(), vec![4, 3]);
    let gathered = all.gather(1, &actions.view([-1, 1]), false).view([-1]);
    assert!(chosen.allclose(&gathered, 1e-5, 1e-5, false));
}

#[test]
fn value_network_needs_a_hidden_layer() {
    let vs = nn::VarStore::new(Device::Cpu);
    assert!(VanillaValueNetwork::new(&vs.root(), 5, &[], 1).is_err());
}

#[test]
fn dueling_network_gathers_chosen_actions() {
    tch::manual_seed(8);
    let vs = nn::VarStore::new(Device::Cpu);
    let (state_dim, n) = (6, 4);
    let net = DuelingValueNetwork::new(&vs.root(), state_dim, n, &[16], 1, None, None).unwrap();
    let space = DiscreteActionSpace::one_hot(n as usize).unwrap();
    let states = Tensor::randn([3, state_dim], (Kind::Float, Device::Cpu));

    let q = net.get_all_action_values(&states, &space);
    assert_eq!(q.size(), vec![3, 4]);

    let actions = Tensor::from_slice(&[3i64, 0, 1]);
    let chosen = net.get_batch_action_value(&states, &actions, &space).unwrap();
    let gathered = q.gather(1, &actions.view([-1, 1]), false).view([-1]);
    assert!(chosen.allclose(&gathered, 1e-5, 1e-5, false));

    // mean_a Q(s, a) is V(s), whatever the action vectors are
    let other_space = DiscreteActionSpace::new(&[
        vec![0.5, 0.5, 0.0, 0.0],
        vec![2.0, 0.0, 1.0, 0.0],
        vec![0.0, 0.0, 0.0, 3.0],
    ])
    .unwrap();
    let other_q = net.get_all_action_values(&states, &other_space);
    let mean_q = q.mean_dim(Some(&[1i64][..]), false, Kind::Float);
    let other_mean_q = other_q.mean_dim(Some(&[1i64][..]), false, Kind::Float);
    assert!(mean_q.allclose(&other_mean_q, 1e-5, 1e-5, false));

    let wrong_space = DiscreteActionSpace::one_hot(3).unwrap();
    assert!(net.get_batch_action_value(&states, &actions, &wrong_space).is_err());
}

#[test]
fn dueling_network_accepts_a_scalar_state() {
    tch::manual_seed(12);
    let vs = nn::VarStore::new(Device::Cpu);
    let net = DuelingValueNetwork::new(&vs.root(), 1, 2, &[8], 1, None, None).unwrap();
    let space = DiscreteActionSpace::one_hot(2).unwrap();

    let state = Tensor::from(0.5f32);
    let chosen = net
        .get_batch_action_value(&state, &Tensor::from_slice(&[1i64]), &space)
        .unwrap();
    assert_eq!(chosen.size(), vec![1]);
    let q = net.get_all_action_values(&state, &space);
    assert_abs_diff_eq!(chosen.double_value(&[0]), q.double_value(&[0, 1]), epsilon = 1e-6);
}

#[test]
fn actor_network_outputs_distributions() {
    tch::manual_seed(9);
    let vs = nn::VarStore::new(Device::Cpu);
    let actor = VanillaActorNetwork::new(&vs.root(), 4, &[32, 32], 2);
    init_weights(&vs);
    let probs = actor.forward_t(&Tensor::randn([10, 4], (Kind::Float, Device::Cpu)), false);
    assert_eq!(probs.size(), vec![10, 2]);
    assert!(probs.min().double_value(&[]) >= 0.0);
    let total = probs.sum(Kind::Float).double_value(&[]);
    assert_abs_diff_eq!(total, 10.0, epsilon = 1e-4);
}

#[test]
fn init_functions_set_bias_and_bounds() {
    let vs = nn::VarStore::new(Device::Cpu);
    let _net = VanillaValueNetwork::new(&vs.root(), 10, &[20], 1).unwrap();
    init_weights(&vs);
    let variables = vs.variables();
    let bias = &variables["fc1.bias"];
    assert_abs_diff_eq!((bias - 0.01).abs().max().double_value(&[]), 0.0, epsilon = 1e-7);
    let bound = (6.0f64 / 30.0).sqrt();
    assert!(variables["fc1.weight"].abs().max().double_value(&[]) <= bound + 1e-6);

    uniform_init_weights(&vs);
    for (_, value) in vs.variables() {
        assert!(value.abs().max().double_value(&[]) <= 0.001 + 1e-9);
    }
}

#[test]
fn twin_critics_move_towards_target() {
    tch::manual_seed(10);
    let (state_dim, action_dim, batch_size) = (20, 10, 128);
    let mut twin_critics =
        TwinCritic::new(state_dim, action_dim, &[10, 10], 1e-3, init_weights, Device::Cpu)
            .unwrap();

    let state_batch = Tensor::randn([batch_size, state_dim], (Kind::Float, Device::Cpu));
    let action_batch = Tensor::randn([batch_size, action_dim], (Kind::Float, Device::Cpu));
    let target = Tensor::randn([batch_size], (Kind::Float, Device::Cpu));

    let (q1, q2) = twin_critics.get_twin_critic_values(&state_batch, &action_batch);
    assert_eq!(q1.size(), vec![batch_size]);
    assert_eq!(q2.size(), vec![batch_size]);

    let first = twin_critics
        .optimize_twin_critics_towards_target(&state_batch, &action_batch, &target)
        .unwrap();
    let mut last = first;
    for _ in 0..200 {
        last = twin_critics
            .optimize_twin_critics_towards_target(&state_batch, &action_batch, &target)
            .unwrap();
    }
    assert!(last < first, "loss {last} did not drop below {first}");
}
