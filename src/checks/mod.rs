//! The built-in check catalog.

mod strategies;

use anyhow::Result;

use crate::core::{CheckDescriptor, ModuleRequirement, Outcome, Requirements, Severity};
use crate::engine::{MessageSink, RunContext};
use crate::environment::Environment;
use crate::registry::{Check, CheckRegistry};

type CheckFn = fn(&RunContext, &Environment, &mut MessageSink) -> Result<Outcome>;

/// A catalog check: a descriptor plus a plain function body. Checks
/// with their own state implement `Check` directly instead.
pub struct BuiltinCheck {
    descriptor: CheckDescriptor,
    run: CheckFn,
}

impl BuiltinCheck {
    pub fn new(descriptor: CheckDescriptor, run: CheckFn) -> Self {
        Self { descriptor, run }
    }
}

impl Check for BuiltinCheck {
    fn descriptor(&self) -> &CheckDescriptor {
        &self.descriptor
    }

    fn perform(
        &self,
        ctx: &RunContext,
        env: &Environment,
        messages: &mut MessageSink,
    ) -> Result<Outcome> {
        (self.run)(ctx, env, messages)
    }
}

/// Registry with every built-in check, in run order.
pub fn builtin_registry() -> Result<CheckRegistry> {
    let mut registry = CheckRegistry::new();
    for check in catalog() {
        registry.register(Box::new(check))?;
    }
    Ok(registry)
}

fn catalog() -> Vec<BuiltinCheck> {
    vec![
        BuiltinCheck::new(
            CheckDescriptor::new(
                "runtime-version",
                "Supported runtime version",
                "core",
                Severity::High,
            ),
            |_ctx, env, messages| Ok(strategies::runtime_at_least(env, messages, "8.0.0")),
        ),
        BuiltinCheck::new(
            CheckDescriptor::new("core-debug-mode", "Debug mode off", "core", Severity::High),
            |_ctx, env, messages| {
                Ok(strategies::config_equals(
                    env,
                    messages,
                    "debug",
                    "0",
                    "debug mode is enabled on a production site",
                ))
            },
        ),
        BuiltinCheck::new(
            CheckDescriptor::new(
                "core-cron-recent",
                "Scheduled tasks running",
                "core",
                Severity::Normal,
            ),
            |_ctx, env, messages| {
                Ok(strategies::config_present(
                    env,
                    messages,
                    "lastcron",
                    "scheduled tasks have never run",
                ))
            },
        ),
        BuiltinCheck::new(
            CheckDescriptor::new(
                "security-https-login",
                "Login over HTTPS",
                "security",
                Severity::Critical,
            )
            .with_requirements(Requirements {
                config_keys: vec!["wwwroot".to_string()],
                ..Requirements::default()
            }),
            |_ctx, env, messages| {
                let wwwroot = env.config_value("wwwroot").unwrap_or_default();
                messages.write(format!("site root: {wwwroot}"));
                if wwwroot.starts_with("https://") {
                    Ok(Outcome::pass())
                } else {
                    Ok(Outcome::fail("site root does not use HTTPS")
                        .with_argument("wwwroot", wwwroot))
                }
            },
        ),
        BuiltinCheck::new(
            CheckDescriptor::new(
                "security-password-policy",
                "Password policy enforced",
                "security",
                Severity::High,
            ),
            |_ctx, env, messages| {
                Ok(strategies::config_equals(
                    env,
                    messages,
                    "passwordpolicy",
                    "1",
                    "password policy is not enforced",
                ))
            },
        ),
        BuiltinCheck::new(
            CheckDescriptor::new(
                "security-guest-access",
                "Guest access disabled",
                "security",
                Severity::Normal,
            ),
            |_ctx, env, messages| {
                Ok(strategies::config_equals(
                    env,
                    messages,
                    "guestloginbutton",
                    "0",
                    "anonymous guest login is enabled",
                ))
            },
        ),
        BuiltinCheck::new(
            CheckDescriptor::new(
                "modules-up-to-date",
                "Installed modules current",
                "modules",
                Severity::Normal,
            )
            .with_requirements(Requirements {
                modules: vec![ModuleRequirement::new("forum")],
                ..Requirements::default()
            }),
            |_ctx, env, messages| Ok(strategies::modules_up_to_date(env, messages)),
        ),
    ]
}
