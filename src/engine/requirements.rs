use semver::Version;
use thiserror::Error;

use crate::core::Requirements;
use crate::environment::Environment;

/// A check precondition that does not hold. The message names the exact
/// missing capability so it can be rendered as a single actionable skip
/// reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementsFailure {
    #[error("required module is not installed: {name}")]
    MissingModule { name: String },
    #[error("module {name} is at {installed}, which does not satisfy {required}")]
    ModuleVersion {
        name: String,
        installed: String,
        required: String,
    },
    #[error("module {name} reports an unparseable version: {installed}")]
    UnparseableModuleVersion { name: String, installed: String },
    #[error("required config key is not set: {key}")]
    MissingConfig { key: String },
    #[error("runtime version {installed} does not satisfy {required}")]
    RuntimeVersion { installed: String, required: String },
    #[error("runtime version is unknown; {required} is required")]
    UnknownRuntimeVersion { required: String },
}

/// Pure precondition gate: no side effects, first unmet requirement
/// wins. Callers convert the failure into a SKIP verdict.
pub fn validate(requirements: &Requirements, env: &Environment) -> Result<(), RequirementsFailure> {
    if let Some(required) = &requirements.min_runtime {
        match &env.runtime_version {
            None => {
                return Err(RequirementsFailure::UnknownRuntimeVersion {
                    required: required.to_string(),
                });
            }
            Some(installed) if !required.matches(installed) => {
                return Err(RequirementsFailure::RuntimeVersion {
                    installed: installed.to_string(),
                    required: required.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    for module in &requirements.modules {
        let Some(installed) = env.module_version(&module.name) else {
            return Err(RequirementsFailure::MissingModule {
                name: module.name.clone(),
            });
        };
        if let Some(required) = &module.version {
            let Ok(parsed) = Version::parse(installed) else {
                return Err(RequirementsFailure::UnparseableModuleVersion {
                    name: module.name.clone(),
                    installed: installed.to_string(),
                });
            };
            if !required.matches(&parsed) {
                return Err(RequirementsFailure::ModuleVersion {
                    name: module.name.clone(),
                    installed: installed.to_string(),
                    required: required.to_string(),
                });
            }
        }
    }

    for key in &requirements.config_keys {
        if !env.has_config(key) {
            return Err(RequirementsFailure::MissingConfig { key: key.clone() });
        }
    }

    Ok(())
}
