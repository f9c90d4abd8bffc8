//! Reusable check bodies. Most built-in checks are one of a few shapes
//! (a config key must equal a value, a version must be recent, and so
//! on); the catalog wires descriptors to these.

use semver::{Version, VersionReq};

use crate::core::{Issue, Outcome};
use crate::engine::MessageSink;
use crate::environment::Environment;

/// Fails when the config key holds anything but the expected value.
/// A missing key counts as a mismatch.
pub fn config_equals(
    env: &Environment,
    messages: &mut MessageSink,
    key: &str,
    expected: &str,
    failure_reason: &str,
) -> Outcome {
    let actual = env.config_value(key);
    messages.write(format!(
        "config {key} = {}",
        actual.unwrap_or("(not set)")
    ));
    if actual == Some(expected) {
        Outcome::pass()
    } else {
        Outcome::fail(failure_reason)
            .with_argument("key", key)
            .with_argument("expected", expected)
            .with_argument("actual", actual.unwrap_or_default())
    }
}

/// Fails when the config key is absent entirely.
pub fn config_present(
    env: &Environment,
    messages: &mut MessageSink,
    key: &str,
    failure_reason: &str,
) -> Outcome {
    if env.has_config(key) {
        messages.write(format!("config {key} is set"));
        Outcome::pass()
    } else {
        Outcome::fail(failure_reason).with_argument("key", key)
    }
}

/// Fails when the runtime is older than `minimum`. An environment that
/// does not report its runtime version cannot be judged and skips.
pub fn runtime_at_least(env: &Environment, messages: &mut MessageSink, minimum: &str) -> Outcome {
    let Some(installed) = &env.runtime_version else {
        return Outcome::skip("runtime version is not recorded in the environment snapshot");
    };
    messages.write(format!("runtime version {installed}"));
    let Ok(required) = VersionReq::parse(&format!(">={minimum}")) else {
        return Outcome::fail(format!("invalid minimum runtime version: {minimum}"));
    };
    if required.matches(installed) {
        Outcome::pass()
    } else {
        Outcome::fail(format!(
            "runtime {installed} is older than the supported minimum {minimum}"
        ))
        .with_argument("installed", installed.to_string())
        .with_argument("minimum", minimum)
    }
}

/// Compares every installed module against the latest-known version
/// recorded in config as `latest.<module>`. Each stale module becomes
/// one issue; modules whose versions do not parse are reported as a
/// message and otherwise ignored.
pub fn modules_up_to_date(env: &Environment, messages: &mut MessageSink) -> Outcome {
    let mut outcome = Outcome::pass();
    let mut stale = 0usize;

    for (name, installed) in &env.modules {
        let Some(latest) = env.config_value(&format!("latest.{name}")) else {
            continue;
        };
        let (Ok(installed_v), Ok(latest_v)) = (Version::parse(installed), Version::parse(latest))
        else {
            messages.write(format!(
                "module {name}: cannot compare {installed} against {latest}"
            ));
            continue;
        };
        if installed_v < latest_v {
            stale += 1;
            outcome = outcome.with_issue(
                Issue::new(
                    "module_outdated",
                    "module {name} is at {installed}, latest is {latest}",
                )
                .with_param("name", name.clone())
                .with_param("installed", installed.clone())
                .with_param("latest", latest.to_string()),
            );
        }
    }

    messages.write(format!(
        "{} of {} modules are behind their latest version",
        stale,
        env.modules.len()
    ));
    if stale > 0 {
        outcome.status = crate::core::Status::Fail;
        outcome.reason = Some(format!("{stale} installed modules are outdated"));
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Status;

    fn env() -> Environment {
        toml::from_str(
            r#"
runtime_version = "8.1.0"

[modules]
forum = "3.9.0"
quiz = "3.0.2"

[config]
debug = "1"
"latest.forum" = "4.1.0"
"latest.quiz" = "3.0.2"
"#,
        )
        .expect("env")
    }

    #[test]
    fn config_equals_fails_on_mismatch_with_arguments() {
        let mut sink = MessageSink::default();
        let outcome = config_equals(&env(), &mut sink, "debug", "0", "debug mode is enabled");
        assert_eq!(outcome.status, Status::Fail);
        assert_eq!(
            outcome.arguments.get("actual"),
            Some(&serde_json::Value::from("1"))
        );
    }

    #[test]
    fn config_present_fails_on_missing_key() {
        let mut sink = MessageSink::default();
        let outcome = config_present(&env(), &mut sink, "login_https", "HTTPS login is off");
        assert_eq!(outcome.status, Status::Fail);
    }

    #[test]
    fn runtime_check_skips_without_a_recorded_version() {
        let mut sink = MessageSink::default();
        let outcome = runtime_at_least(&Environment::default(), &mut sink, "8.0.0");
        assert_eq!(outcome.status, Status::Skip);
    }

    #[test]
    fn runtime_check_fails_below_minimum() {
        let mut sink = MessageSink::default();
        let outcome = runtime_at_least(&env(), &mut sink, "8.2.0");
        assert_eq!(outcome.status, Status::Fail);
        assert_eq!(
            runtime_at_least(&env(), &mut sink, "8.0.0").status,
            Status::Pass
        );
    }

    #[test]
    fn stale_modules_become_one_issue_each() {
        let mut sink = MessageSink::default();
        let outcome = modules_up_to_date(&env(), &mut sink);
        assert_eq!(outcome.status, Status::Fail);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(
            outcome.issues[0].render(),
            "module forum is at 3.9.0, latest is 4.1.0"
        );
    }
}
