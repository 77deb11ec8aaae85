use lcr_config::{Durations, IntegratorMode, Profile, load_toml};
use rstest::rstest;

const RIG: &str = r#"
[lcr]
port = "/dev/ttyUSB1"
baud = 9600

[chamber]
sample_period_s = 0.7368

[pid]
kp = 0.06
ki = 0.0008
kd = 0.0
dt_s = 0.7368
integrator = "conditional"

[setpoint]
profile = "linear"
values = [25, 25, 75, 75]
durations_s = [900, 3000, 900]

[runner]
iterations = 2
poll_ms = 20

[output]
directory = "runs"

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_rig_config() {
    let cfg = load_toml(RIG).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.lcr.port.as_deref(), Some("/dev/ttyUSB1"));
    assert_eq!(cfg.pid.integrator, IntegratorMode::Conditional);
    assert_eq!(cfg.setpoint.profile, Profile::Linear);
    assert_eq!(
        cfg.setpoint.durations_s,
        Durations::PerSegment(vec![900.0, 3000.0, 900.0])
    );
    assert_eq!(cfg.runner.iterations, 2);
    // Untouched fields keep their defaults.
    assert_eq!(cfg.lcr.stale_timeout_s, 5.0);
}

#[rstest]
#[case("[lcr]\nbaud = 0\n", "lcr.baud must be > 0")]
#[case("[lcr]\nport = \"  \"\n", "lcr.port must not be empty")]
#[case("[lcr]\nstale_timeout_s = 0.0\n", "lcr.stale_timeout_s must be > 0")]
#[case("[lcr]\nbyte_time_s = 0.1\n", "lcr.byte_time_s is too long")]
#[case("[pid]\ndt_s = 0.0\n", "pid.dt_s must be > 0")]
#[case("[pid]\nintegral_band = -1.0\n", "pid.integral_band must be >= 0")]
#[case("[chamber]\ntime_constant_s = -5.0\n", "chamber.time_constant_s must be > 0")]
#[case("[setpoint]\nvalues = []\n", "setpoint.values must not be empty")]
#[case(
    "[setpoint]\nprofile = \"linear\"\nvalues = [25]\ndurations_s = 60\n",
    "at least two entries"
)]
#[case(
    "[setpoint]\nprofile = \"step\"\nvalues = [25, 30]\ndurations_s = [60]\n",
    "setpoint.durations_s must have 2 entries"
)]
#[case(
    "[setpoint]\nvalues = [25, 30]\ndurations_s = [0]\n",
    "setpoint.durations_s entries must be > 0"
)]
#[case("[runner]\niterations = 0\n", "runner.iterations must be >= 1")]
#[case("[runner]\npoll_ms = 0\n", "runner.poll_ms must be >= 1")]
#[case("[output]\ndirectory = \"\"\n", "output.directory must not be empty")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn rejects_invalid_fields(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "got: {msg}");
}

#[test]
fn unknown_profile_is_a_parse_error() {
    assert!(load_toml("[setpoint]\nprofile = \"sine\"\n").is_err());
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/lcr_config.toml")).expect("parse sample");
    cfg.validate().expect("sample config should pass");
    assert!(cfg.lcr.port.is_none());
    assert_eq!(cfg.setpoint, lcr_config::SetpointCfg::default());
    assert_eq!(cfg.pid, lcr_config::PidCfg::default());
}
