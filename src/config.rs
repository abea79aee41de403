use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use value::ConstValue;

use graphward_authz::{Gate, GuardSet, JwtGuard, Principal, TokenGuard, Verdict};
use graphward_handler::CredentialConfig;

#[derive(Debug, Default, Deserialize, Parser)]
pub struct Config {
    /// Path of the config file
    #[clap(long, env = "CONFIG_FILE", default_value = "config.toml")]
    #[serde(skip)]
    pub file: PathBuf,

    #[clap(long, env, default_value = "127.0.0.1:8000")]
    #[serde(default = "default_bind")]
    pub bind: String,

    /// URL path the GraphQL endpoint is served under.
    #[clap(long, env, default_value = "graphql")]
    #[serde(default = "default_path")]
    pub path: String,

    /// Path of the SDL schema document.
    #[clap(long, env, default_value = "schema.graphql")]
    #[serde(default = "default_schema")]
    pub schema: PathBuf,

    /// Optional JSON seed document for the in-memory store.
    #[clap(long, env)]
    pub seed: Option<PathBuf>,

    /// Include diagnostic detail in error extensions.
    #[clap(long, env)]
    #[serde(default)]
    pub debug: bool,

    #[clap(long, env, default_value = "web")]
    #[serde(default = "default_guard_name")]
    pub default_guard: String,

    #[clap(skip)]
    #[serde(default)]
    pub guards: Vec<GuardConfig>,

    #[clap(skip)]
    #[serde(default)]
    pub abilities: Vec<AbilityRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    pub name: String,

    #[serde(default = "default_header_name")]
    pub header_name: String,

    #[serde(default)]
    pub header_prefix: String,

    #[serde(flatten)]
    pub source: GuardSource,
}

/// Where a guard's principals come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GuardSource {
    /// Validate JWTs against a JWKS document.
    Jwks { jwks: String },
    /// A static token map.
    Tokens { tokens: HashMap<String, TokenPrincipal> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPrincipal {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A declaratively configured ability.
#[derive(Debug, Clone, Deserialize)]
pub struct AbilityRule {
    pub name: String,
    #[serde(flatten)]
    pub kind: RuleKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleKind {
    /// The target row's `key` column must equal the principal's id.
    Owner {
        #[serde(default = "default_owner_key")]
        key: String,
    },
    /// Any authenticated principal passes.
    Authenticated,
    /// The principal's `claim` must equal `value`.
    Role { claim: String, value: String },
    Allow,
    Deny {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
}

impl Config {
    /// Parse the config file and environment variables.
    /// If the config file exists, it will be parsed first and ignore
    /// environment variables.
    pub fn try_parse() -> anyhow::Result<Self> {
        let env_config = Config::parse();

        if Path::exists(&env_config.file) {
            let file_config = std::fs::read_to_string(&env_config.file).with_context(|| {
                format!(
                    "Failed to read config file '{}'.",
                    &env_config.file.display()
                )
            })?;
            let config: Config = toml::from_str(&file_config).with_context(|| {
                format!(
                    "Failed to parse config file '{}'.",
                    &env_config.file.display()
                )
            })?;
            Ok(config)
        } else {
            Ok(env_config)
        }
    }

    /// Build the gate from the configured ability rules.
    pub fn create_gate(&self) -> Gate {
        let mut gate = Gate::new();
        for ability in &self.abilities {
            let kind = ability.kind.clone();
            gate.define(ability.name.clone(), move |principal, target, _extra| {
                match &kind {
                    RuleKind::Allow => Verdict::allow(),
                    RuleKind::Deny { message, code } => match message {
                        Some(message) => Verdict::deny_with(message.clone(), code.clone()),
                        None => Verdict::deny(),
                    },
                    RuleKind::Authenticated => Verdict::allow_if(principal.is_some()),
                    RuleKind::Owner { key } => {
                        let Some(principal) = principal else {
                            return Verdict::deny();
                        };
                        let owner = target.record().and_then(|row| match row {
                            ConstValue::Object(object) => object.get(key.as_str()),
                            _ => None,
                        });
                        match owner {
                            Some(ConstValue::String(id)) => {
                                Verdict::allow_if(*id == principal.id)
                            }
                            Some(ConstValue::Number(id)) => {
                                Verdict::allow_if(id.to_string() == principal.id)
                            }
                            _ => Verdict::deny(),
                        }
                    }
                    RuleKind::Role { claim, value } => {
                        let Some(principal) = principal else {
                            return Verdict::deny();
                        };
                        match &principal.claims {
                            ConstValue::Object(claims) => Verdict::allow_if(
                                claims.get(claim.as_str())
                                    == Some(&ConstValue::String(value.clone())),
                            ),
                            _ => Verdict::deny(),
                        }
                    }
                }
            });
        }
        gate
    }

    /// Build the guard set, fetching JWKS documents where configured.
    pub async fn create_guards(&self) -> anyhow::Result<GuardSet> {
        let mut guards = GuardSet::new(self.default_guard.clone());
        for guard in &self.guards {
            match &guard.source {
                GuardSource::Jwks { jwks } => {
                    tracing::info!(guard = %guard.name, jwks = %jwks, "Initializing JWT guard");
                    guards.register(Arc::new(JwtGuard::try_new(guard.name.clone(), jwks).await?));
                }
                GuardSource::Tokens { tokens } => {
                    let mut token_guard = TokenGuard::new(guard.name.clone());
                    for (token, principal) in tokens {
                        let mut principal_value =
                            Principal::new(principal.id.clone(), guard.name.clone());
                        principal_value.name = principal.name.clone();
                        token_guard = token_guard.token(token.clone(), principal_value);
                    }
                    guards.register(Arc::new(token_guard));
                }
            }
        }
        Ok(guards)
    }

    /// Credential extraction settings for the handler.
    pub fn credential_configs(&self) -> Vec<CredentialConfig> {
        self.guards
            .iter()
            .map(|guard| CredentialConfig {
                guard: guard.name.clone(),
                header_name: guard.header_name.clone(),
                header_prefix: guard.header_prefix.clone(),
            })
            .collect()
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_path() -> String {
    "graphql".to_string()
}

fn default_schema() -> PathBuf {
    PathBuf::from("schema.graphql")
}

fn default_guard_name() -> String {
    "web".to_string()
}

fn default_header_name() -> String {
    "authorization".to_string()
}

fn default_owner_key() -> String {
    "user_id".to_string()
}
